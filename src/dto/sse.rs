use std::time::SystemTime;

use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{format_system_time, game::GameSnapshot};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast whenever a new revision of a watched game is observed.
pub struct GameUpdatedEvent {
    #[serde(flatten)]
    pub snapshot: GameSnapshot,
    /// RFC 3339 time the backend observed this revision.
    pub observed_at: String,
}

impl From<GameSnapshot> for GameUpdatedEvent {
    fn from(snapshot: GameSnapshot) -> Self {
        Self {
            snapshot,
            observed_at: format_system_time(SystemTime::now()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}
