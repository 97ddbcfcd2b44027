/// OpenAPI documentation generation.
pub mod documentation;
/// Game controller: sessions, deck submission and bans.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Storage connection supervisor with backoff.
pub mod storage_supervisor;
/// Per-game polling and watcher bookkeeping.
pub mod sync_service;
/// Per-player phase views.
pub mod view_service;
