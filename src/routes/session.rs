use axum::{Json, Router, extract::{Query, State}, routing::post};
use axum_valid::Valid;

use crate::{
    dto::game::{SessionQuery, SessionResponse},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes opening a session for the host or the guest.
pub fn router() -> Router<SharedState> {
    Router::new().route("/session", post(open_session))
}

/// Host a fresh game, or join the one named by `gameId` as the second player.
#[utoipa::path(
    post,
    path = "/session",
    tag = "session",
    params(SessionQuery),
    responses(
        (status = 200, description = "Session opened", body = SessionResponse),
        (status = 400, description = "Malformed game id"),
        (status = 404, description = "Unknown game"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn open_session(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<SessionQuery>>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = game_service::open_session(&state, query.game_id.as_deref()).await?;
    Ok(Json(session))
}
