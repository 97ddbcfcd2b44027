use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Deck Ban Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::open_session,
        crate::routes::game::get_game,
        crate::routes::game::get_view,
        crate::routes::game::submit_decks,
        crate::routes::game::ban_deck,
        crate::routes::events::game_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::GameStateResponse,
            crate::dto::game::GameSnapshot,
            crate::dto::game::SessionResponse,
            crate::dto::game::SubmitDecksRequest,
            crate::dto::game::BanDeckRequest,
            crate::dto::view::PhaseView,
            crate::dto::view::ViewResponse,
            crate::dto::sse::GameUpdatedEvent,
            crate::dto::sse::SystemStatus,
            crate::state::state_machine::GamePhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Host or join a game"),
        (name = "game", description = "Deck submission, bans and views"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
