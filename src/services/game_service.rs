//! Game controller: opens sessions and applies player commands with compare-and-set writes.

use tracing::{debug, info, warn};

use crate::{
    dao::{models::StoredGame, storage::StorageError},
    dto::game::{GameSnapshot, SessionResponse},
    error::ServiceError,
    services::sse_events::broadcast_game_updated,
    state::{
        SharedState,
        game::{CommandError, Decks, GameId, GameRecord},
        state_machine::{GamePhase, PlayerSlot},
    },
};

const MAX_ID_ATTEMPTS: usize = 5;

/// Mount a browser on a game.
///
/// Without an identifier a new game is created and the caller hosts it as player 1. With an
/// identifier the existing game is loaded and the caller joins as player 2.
pub async fn open_session(
    state: &SharedState,
    game_id: Option<&str>,
) -> Result<SessionResponse, ServiceError> {
    let (id, player, stored, record) = match game_id {
        None => {
            let (id, stored) = create_game(state).await?;
            let record = GameRecord::from(stored.game.clone());
            (id, PlayerSlot::One, stored, record)
        }
        Some(raw) => {
            let id = parse_game_id(raw)?;
            let (stored, record) = read_game(state, &id).await?;
            info!(game_id = %id, phase = ?record.phase, "guest joined game");
            (id, PlayerSlot::Two, stored, record)
        }
    };

    Ok(SessionResponse {
        share_link: state.config().share_link(&id),
        game_id: id.to_string(),
        player,
        revision: stored.revision.0,
        game: record.into(),
    })
}

/// Return the current record of a game.
pub async fn get_game(state: &SharedState, raw_id: &str) -> Result<GameSnapshot, ServiceError> {
    let id = parse_game_id(raw_id)?;
    let (stored, record) = read_game(state, &id).await?;
    Ok(GameSnapshot::new(&id, stored, record))
}

/// Record the three decks of `player`.
pub async fn submit_decks(
    state: &SharedState,
    raw_id: &str,
    player: PlayerSlot,
    decks: Decks,
) -> Result<GameSnapshot, ServiceError> {
    let id = parse_game_id(raw_id)?;
    update_game(state, &id, |record| {
        record.submit_decks(player, decks.clone())
    })
    .await
}

/// Ban one of the opponent's decks on behalf of `player`.
pub async fn ban_deck(
    state: &SharedState,
    raw_id: &str,
    player: PlayerSlot,
    deck: &str,
) -> Result<GameSnapshot, ServiceError> {
    let id = parse_game_id(raw_id)?;
    update_game(state, &id, |record| record.ban_deck(player, deck)).await
}

/// Load a game from storage.
///
/// Records holding both bans while still in the ban phase are reported as finished.
pub async fn read_game(
    state: &SharedState,
    id: &GameId,
) -> Result<(StoredGame, GameRecord), ServiceError> {
    let store = state.require_game_store().await?;
    let Some(stored) = store.find_game(id).await? else {
        return Err(ServiceError::NotFound(format!("game `{id}` not found")));
    };

    let mut record = GameRecord::from(stored.game.clone());
    if record.settle() {
        debug!(game_id = %id, "both bans present; reporting results");
    }
    Ok((stored, record))
}

/// Validate an identifier supplied by a client.
pub fn parse_game_id(raw: &str) -> Result<GameId, ServiceError> {
    GameId::parse(raw).ok_or_else(|| ServiceError::InvalidInput(format!("invalid game id `{raw}`")))
}

async fn create_game(state: &SharedState) -> Result<(GameId, StoredGame), ServiceError> {
    let store = state.require_game_store().await?;
    let record = GameRecord::default();

    for _ in 0..MAX_ID_ATTEMPTS {
        let id = GameId::generate();
        match store.insert_game(&id, record.clone().into()).await {
            Ok(revision) => {
                info!(game_id = %id, "created game");
                return Ok((
                    id,
                    StoredGame {
                        revision,
                        game: record.into(),
                    },
                ));
            }
            Err(StorageError::Conflict { .. }) => {
                warn!(game_id = %id, "generated game id already taken; drawing another");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Conflict(
        "could not allocate a free game id".into(),
    ))
}

/// Apply `command` to the stored record and write it back if nobody wrote in between.
///
/// On a write conflict the record is reloaded and the command applied again, up to the
/// configured number of attempts.
async fn update_game<F>(
    state: &SharedState,
    id: &GameId,
    command: F,
) -> Result<GameSnapshot, ServiceError>
where
    F: Fn(&mut GameRecord) -> Result<GamePhase, CommandError>,
{
    let store = state.require_game_store().await?;
    let attempts = state.config().max_update_attempts();

    for attempt in 1..=attempts {
        let (stored, mut record) = read_game(state, id).await?;
        let from = record.phase;
        let next = command(&mut record)?;

        match store
            .compare_and_set(id, &stored.revision, record.clone().into())
            .await
        {
            Ok(revision) => {
                info!(game_id = %id, ?from, to = ?next, "game updated");
                let snapshot = GameSnapshot::new(
                    id,
                    StoredGame {
                        revision: revision.clone(),
                        game: record.clone().into(),
                    },
                    record,
                );
                broadcast_game_updated(state, id, &revision, snapshot.clone());
                return Ok(snapshot);
            }
            Err(StorageError::Conflict { .. }) => {
                debug!(game_id = %id, attempt, "write conflict; reloading game");
            }
            Err(err) => return Err(err.into()),
        }
    }

    warn!(game_id = %id, attempts, "giving up after repeated write conflicts");
    Err(ServiceError::Conflict(format!(
        "game `{id}` kept changing; try again"
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::{GameStore, memory::MemoryGameStore},
            models::{GameEntity, Revision},
            storage::StorageResult,
        },
        state::AppState,
    };

    fn decks(prefix: &str) -> Decks {
        [
            format!("{prefix} aggro"),
            format!("{prefix} control"),
            format!("{prefix} midrange"),
        ]
    }

    async fn memory_state() -> (SharedState, MemoryGameStore) {
        let store = MemoryGameStore::new();
        let state = AppState::with_store(
            AppConfig::default().with_public_url("https://bans.test/"),
            Arc::new(store.clone()),
        )
        .await;
        (state, store)
    }

    async fn game_in_ban_phase(state: &SharedState) -> String {
        let session = open_session(state, None).await.unwrap();
        submit_decks(state, &session.game_id, PlayerSlot::One, decks("red"))
            .await
            .unwrap();
        submit_decks(state, &session.game_id, PlayerSlot::Two, decks("blue"))
            .await
            .unwrap();
        session.game_id
    }

    #[tokio::test]
    async fn host_session_creates_game() {
        let (state, store) = memory_state().await;
        let session = open_session(&state, None).await.unwrap();

        assert_eq!(session.player, PlayerSlot::One);
        assert_eq!(session.game.state, GamePhase::Player1Submit);
        assert_eq!(
            session.share_link,
            format!("https://bans.test/?gameId={}", session.game_id)
        );
        let id = GameId::parse(&session.game_id).unwrap();
        assert!(store.read_raw(&id).is_some());
    }

    #[tokio::test]
    async fn guest_session_joins_existing_game() {
        let (state, _) = memory_state().await;
        let host = open_session(&state, None).await.unwrap();
        let guest = open_session(&state, Some(&host.game_id)).await.unwrap();

        assert_eq!(guest.player, PlayerSlot::Two);
        assert_eq!(guest.game_id, host.game_id);
        assert_eq!(guest.share_link, host.share_link);
    }

    #[tokio::test]
    async fn guest_session_for_unknown_game_is_not_found() {
        let (state, _) = memory_state().await;
        let err = open_session(&state, Some("nope")).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn player1_submit_moves_to_player2_submit() {
        let (state, _) = memory_state().await;
        let session = open_session(&state, None).await.unwrap();
        let snapshot = submit_decks(&state, &session.game_id, PlayerSlot::One, decks("red"))
            .await
            .unwrap();

        assert_eq!(snapshot.game.state, GamePhase::Player2Submit);
        assert_eq!(snapshot.game.player1_decks, decks("red"));
        assert_ne!(snapshot.revision, session.revision);
    }

    #[tokio::test]
    async fn player2_submit_moves_to_both_ban() {
        let (state, _) = memory_state().await;
        let id = game_in_ban_phase(&state).await;
        let snapshot = get_game(&state, &id).await.unwrap();
        assert_eq!(snapshot.game.state, GamePhase::BothBan);
        assert_eq!(snapshot.game.player2_decks, decks("blue"));
    }

    #[tokio::test]
    async fn empty_deck_is_rejected() {
        let (state, _) = memory_state().await;
        let session = open_session(&state, None).await.unwrap();
        let err = submit_decks(
            &state,
            &session.game_id,
            PlayerSlot::One,
            ["a".into(), "".into(), "c".into()],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn out_of_turn_submit_is_rejected() {
        let (state, _) = memory_state().await;
        let session = open_session(&state, None).await.unwrap();
        let err = submit_decks(&state, &session.game_id, PlayerSlot::Two, decks("blue"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn single_ban_keeps_ban_phase() {
        let (state, _) = memory_state().await;
        let id = game_in_ban_phase(&state).await;
        let snapshot = ban_deck(&state, &id, PlayerSlot::One, "blue control")
            .await
            .unwrap();

        assert_eq!(snapshot.game.state, GamePhase::BothBan);
        assert_eq!(snapshot.game.player1_banned_deck, "blue control");
        assert_eq!(snapshot.game.player2_banned_deck, "");
    }

    #[tokio::test]
    async fn both_bans_move_to_results() {
        let (state, _) = memory_state().await;
        let id = game_in_ban_phase(&state).await;
        ban_deck(&state, &id, PlayerSlot::One, "blue control")
            .await
            .unwrap();
        let snapshot = ban_deck(&state, &id, PlayerSlot::Two, "red aggro")
            .await
            .unwrap();

        assert_eq!(snapshot.game.state, GamePhase::Results);
        assert_eq!(snapshot.game.player1_banned_deck, "blue control");
        assert_eq!(snapshot.game.player2_banned_deck, "red aggro");
    }

    #[tokio::test]
    async fn simultaneous_bans_both_land() {
        let (state, _) = memory_state().await;
        let id = game_in_ban_phase(&state).await;

        let (first, second) = tokio::join!(
            ban_deck(&state, &id, PlayerSlot::One, "blue midrange"),
            ban_deck(&state, &id, PlayerSlot::Two, "red control"),
        );
        first.unwrap();
        second.unwrap();

        let snapshot = get_game(&state, &id).await.unwrap();
        assert_eq!(snapshot.game.state, GamePhase::Results);
        assert_eq!(snapshot.game.player1_banned_deck, "blue midrange");
        assert_eq!(snapshot.game.player2_banned_deck, "red control");
    }

    #[tokio::test]
    async fn ban_merges_with_ban_written_elsewhere() {
        let (state, store) = memory_state().await;
        let id = game_in_ban_phase(&state).await;
        let game_id = GameId::parse(&id).unwrap();

        // Another writer records player 2's ban behind the controller's back.
        let mut entity: GameEntity = serde_json::from_str(&store.read_raw(&game_id).unwrap())
            .unwrap();
        entity.player2_banned_deck = "red aggro".into();
        store.write_raw(&game_id, serde_json::to_string(&entity).unwrap());

        let snapshot = ban_deck(&state, &id, PlayerSlot::One, "blue aggro")
            .await
            .unwrap();
        assert_eq!(snapshot.game.state, GamePhase::Results);
        assert_eq!(snapshot.game.player2_banned_deck, "red aggro");
    }

    #[tokio::test]
    async fn malformed_record_is_reported_as_corrupted() {
        let (state, store) = memory_state().await;
        let id = GameId::parse("broken").unwrap();
        store.write_raw(&id, "{\"state\":");
        let err = get_game(&state, "broken").await.unwrap_err();
        assert!(matches!(err, ServiceError::Corrupted(_)));
    }

    #[tokio::test]
    async fn degraded_state_refuses_commands() {
        let state = AppState::new(AppConfig::default());
        let err = open_session(&state, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }

    /// Store whose conditional writes always lose the race.
    struct AlwaysConflicting(MemoryGameStore);

    impl GameStore for AlwaysConflicting {
        fn find_game(&self, id: &GameId) -> BoxFuture<'static, StorageResult<Option<StoredGame>>> {
            self.0.find_game(id)
        }

        fn insert_game(
            &self,
            id: &GameId,
            game: GameEntity,
        ) -> BoxFuture<'static, StorageResult<Revision>> {
            self.0.insert_game(id, game)
        }

        fn compare_and_set(
            &self,
            id: &GameId,
            _expected: &Revision,
            _game: GameEntity,
        ) -> BoxFuture<'static, StorageResult<Revision>> {
            let key = crate::dao::game_store::game_key(id);
            Box::pin(async move { Err(StorageError::Conflict { key }) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.try_reconnect()
        }
    }

    #[tokio::test]
    async fn exhausted_retries_surface_conflict() {
        let state = AppState::with_store(
            AppConfig::default(),
            Arc::new(AlwaysConflicting(MemoryGameStore::new())),
        )
        .await;
        let session = open_session(&state, None).await.unwrap();
        let err = submit_decks(&state, &session.game_id, PlayerSlot::One, decks("red"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
