use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        game::{BanDeckRequest, GameSnapshot, PlayerQuery, SubmitDecksRequest},
        view::ViewResponse,
    },
    error::AppError,
    services::{game_service, view_service},
    state::{SharedState, state_machine::PlayerSlot},
};

/// Routes reading a game and applying player commands.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/view", get(get_view))
        .route("/games/{id}/players/{player}/decks", post(submit_decks))
        .route("/games/{id}/players/{player}/ban", post(ban_deck))
}

/// Fetch the stored record of a game.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Current game", body = GameSnapshot),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(game_service::get_game(&state, &id).await?))
}

/// Render the panel one player should see.
#[utoipa::path(
    get,
    path = "/games/{id}/view",
    tag = "game",
    params(
        ("id" = String, Path, description = "Identifier of the game"),
        PlayerQuery
    ),
    responses(
        (status = 200, description = "Player view", body = ViewResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_view(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<ViewResponse>, AppError> {
    Ok(Json(view_service::get_view(&state, &id, query.player).await?))
}

/// Submit the three decks of a player.
#[utoipa::path(
    post,
    path = "/games/{id}/players/{player}/decks",
    tag = "game",
    params(
        ("id" = String, Path, description = "Identifier of the game"),
        ("player" = u8, Path, description = "1 for the host, 2 for the guest")
    ),
    request_body = SubmitDecksRequest,
    responses(
        (status = 200, description = "Decks stored", body = GameSnapshot),
        (status = 400, description = "Invalid decks"),
        (status = 409, description = "Not this player's turn")
    )
)]
pub async fn submit_decks(
    State(state): State<SharedState>,
    Path((id, player)): Path<(String, u8)>,
    Valid(Json(payload)): Valid<Json<SubmitDecksRequest>>,
) -> Result<Json<GameSnapshot>, AppError> {
    let player = player_slot(player)?;
    let snapshot = game_service::submit_decks(&state, &id, player, payload.decks).await?;
    Ok(Json(snapshot))
}

/// Ban one of the opponent's decks.
#[utoipa::path(
    post,
    path = "/games/{id}/players/{player}/ban",
    tag = "game",
    params(
        ("id" = String, Path, description = "Identifier of the game"),
        ("player" = u8, Path, description = "1 for the host, 2 for the guest")
    ),
    request_body = BanDeckRequest,
    responses(
        (status = 200, description = "Ban recorded", body = GameSnapshot),
        (status = 400, description = "Deck does not belong to the opponent"),
        (status = 409, description = "Ban not allowed in the current phase")
    )
)]
pub async fn ban_deck(
    State(state): State<SharedState>,
    Path((id, player)): Path<(String, u8)>,
    Valid(Json(payload)): Valid<Json<BanDeckRequest>>,
) -> Result<Json<GameSnapshot>, AppError> {
    let player = player_slot(player)?;
    let snapshot = game_service::ban_deck(&state, &id, player, &payload.deck).await?;
    Ok(Json(snapshot))
}

fn player_slot(number: u8) -> Result<PlayerSlot, AppError> {
    PlayerSlot::from_number(number)
        .ok_or_else(|| AppError::BadRequest(format!("player must be 1 or 2, got {number}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::memory::MemoryGameStore,
        state::{AppState, game::Decks, state_machine::GamePhase},
    };

    async fn state() -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::new())).await
    }

    fn decks(prefix: &str) -> Decks {
        [1, 2, 3].map(|n| format!("{prefix}{n}"))
    }

    #[test]
    fn unknown_player_number_is_rejected() {
        assert_eq!(player_slot(2).unwrap(), PlayerSlot::Two);
        let response = player_slot(3).unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn full_game_through_handlers() {
        let state = state().await;
        let session = game_service::open_session(&state, None).await.unwrap();
        let id = session.game_id.clone();

        submit_decks(
            State(state.clone()),
            Path((id.clone(), 1)),
            Valid(Json(SubmitDecksRequest { decks: decks("a") })),
        )
        .await
        .unwrap();
        submit_decks(
            State(state.clone()),
            Path((id.clone(), 2)),
            Valid(Json(SubmitDecksRequest { decks: decks("b") })),
        )
        .await
        .unwrap();

        ban_deck(
            State(state.clone()),
            Path((id.clone(), 1)),
            Valid(Json(BanDeckRequest { deck: "b2".into() })),
        )
        .await
        .unwrap();
        let Json(snapshot) = ban_deck(
            State(state.clone()),
            Path((id.clone(), 2)),
            Valid(Json(BanDeckRequest { deck: "a3".into() })),
        )
        .await
        .unwrap();
        assert_eq!(snapshot.game.state, GamePhase::Results);

        let Json(view) = get_view(
            State(state.clone()),
            Path(id.clone()),
            Query(PlayerQuery {
                player: PlayerSlot::Two,
            }),
        )
        .await
        .unwrap();
        assert_eq!(view.game_id, id);
    }

    #[tokio::test]
    async fn out_of_turn_submission_is_a_conflict() {
        let state = state().await;
        let session = game_service::open_session(&state, None).await.unwrap();

        let err = submit_decks(
            State(state),
            Path((session.game_id, 2)),
            Valid(Json(SubmitDecksRequest { decks: decks("b") })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
