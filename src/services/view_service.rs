//! Projections deciding which panel each player sees.

use crate::{
    dto::view::{PhaseView, ViewResponse},
    error::ServiceError,
    services::game_service::{parse_game_id, read_game},
    state::{
        SharedState,
        game::GameRecord,
        state_machine::{GamePhase, PlayerSlot},
    },
};

/// Render the panel `player` should see for `record`.
pub fn render_view(record: &GameRecord, player: PlayerSlot, share_link: &str) -> PhaseView {
    match (record.phase, player) {
        (GamePhase::Player1Submit, PlayerSlot::One) | (GamePhase::Player2Submit, PlayerSlot::Two) => {
            PhaseView::SubmitForm {
                player: player.number(),
            }
        }
        (GamePhase::Player1Submit, PlayerSlot::Two) => PhaseView::Waiting {
            for_player: PlayerSlot::One.number(),
        },
        (GamePhase::Player2Submit, PlayerSlot::One) => PhaseView::WaitingRoom {
            player: PlayerSlot::Two.number(),
            link: share_link.to_string(),
        },
        (GamePhase::BothBan, player) => PhaseView::BanPhase {
            decks: record.decks(player.opponent()).to_vec(),
            banned_deck: record.banned_deck(player).map(str::to_string),
            is_waiting: record.is_waiting(player),
        },
        (GamePhase::Results, _) => PhaseView::Results {
            player1_decks: record.player1_decks.to_vec(),
            player2_decks: record.player2_decks.to_vec(),
            player1_banned_deck: record.player1_banned_deck.clone().unwrap_or_default(),
            player2_banned_deck: record.player2_banned_deck.clone().unwrap_or_default(),
        },
    }
}

/// Load a game and render the panel for `player`.
pub async fn get_view(
    state: &SharedState,
    raw_id: &str,
    player: PlayerSlot,
) -> Result<ViewResponse, ServiceError> {
    let id = parse_game_id(raw_id)?;
    let (stored, record) = read_game(state, &id).await?;
    let link = state.config().share_link(&id);

    Ok(ViewResponse {
        game_id: id.to_string(),
        revision: stored.revision.0,
        view: render_view(&record, player, &link),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://bans.test/?gameId=abc";

    fn record_in(phase: GamePhase) -> GameRecord {
        GameRecord {
            phase,
            player1_decks: ["a1", "a2", "a3"].map(String::from),
            player2_decks: ["b1", "b2", "b3"].map(String::from),
            ..GameRecord::default()
        }
    }

    #[test]
    fn submission_phase_views() {
        let record = GameRecord::default();
        assert_eq!(
            render_view(&record, PlayerSlot::One, LINK),
            PhaseView::SubmitForm { player: 1 }
        );
        assert_eq!(
            render_view(&record, PlayerSlot::Two, LINK),
            PhaseView::Waiting { for_player: 1 }
        );

        let record = record_in(GamePhase::Player2Submit);
        assert_eq!(
            render_view(&record, PlayerSlot::One, LINK),
            PhaseView::WaitingRoom {
                player: 2,
                link: LINK.into()
            }
        );
        assert_eq!(
            render_view(&record, PlayerSlot::Two, LINK),
            PhaseView::SubmitForm { player: 2 }
        );
    }

    #[test]
    fn ban_phase_shows_opponent_decks() {
        let mut record = record_in(GamePhase::BothBan);
        record.player1_banned_deck = Some("b2".into());

        assert_eq!(
            render_view(&record, PlayerSlot::One, LINK),
            PhaseView::BanPhase {
                decks: vec!["b1".into(), "b2".into(), "b3".into()],
                banned_deck: Some("b2".into()),
                is_waiting: true,
            }
        );
        assert_eq!(
            render_view(&record, PlayerSlot::Two, LINK),
            PhaseView::BanPhase {
                decks: vec!["a1".into(), "a2".into(), "a3".into()],
                banned_deck: None,
                is_waiting: false,
            }
        );
    }

    #[test]
    fn panel_fields_are_camel_case() {
        let mut record = record_in(GamePhase::BothBan);
        record.player1_banned_deck = Some("b1".into());
        let json = serde_json::to_value(render_view(&record, PlayerSlot::One, LINK)).unwrap();
        assert_eq!(json["view"], "ban_phase");
        assert_eq!(json["isWaiting"], true);
        assert_eq!(json["bannedDeck"], "b1");
        assert!(json.get("is_waiting").is_none());

        let json =
            serde_json::to_value(render_view(&GameRecord::default(), PlayerSlot::Two, LINK))
                .unwrap();
        assert_eq!(json["forPlayer"], 1);
    }

    #[test]
    fn results_are_the_same_for_both_players() {
        let mut record = record_in(GamePhase::Results);
        record.player1_banned_deck = Some("b3".into());
        record.player2_banned_deck = Some("a1".into());

        let host = render_view(&record, PlayerSlot::One, LINK);
        assert_eq!(host, render_view(&record, PlayerSlot::Two, LINK));
        let json = serde_json::to_value(&host).unwrap();
        assert_eq!(json["view"], "results");
        assert_eq!(json["player1BannedDeck"], "b3");
        assert_eq!(json["player2Decks"][0], "b1");
    }
}
