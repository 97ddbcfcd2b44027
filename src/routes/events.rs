use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;

use crate::{
    error::AppError,
    services::{sse_service, sync_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/games/{id}/events",
    tag = "sse",
    params(("id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game SSE stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown game")
    )
)]
/// Stream `game.updated` events for one game, starting with its current record.
pub async fn game_stream(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let watch = sync_service::watch_game(&state, &id).await?;
    Ok(sse_service::to_sse_stream(state, watch))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/games/{id}/events", get(game_stream))
}
