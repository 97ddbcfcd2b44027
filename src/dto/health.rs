use serde::Serialize;
use utoipa::ToSchema;

/// Body of `/healthcheck`: whether game storage can currently be reached.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while the game store is missing or failing.
    pub status: String,
}

impl HealthResponse {
    /// Game storage answered.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// Game storage is unreachable; session and move requests answer 503.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}
