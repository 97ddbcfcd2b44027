use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dao::models::Revision,
    dto::{
        game::GameSnapshot,
        sse::{GameUpdatedEvent, ServerEvent, SystemStatus},
    },
    state::{SharedState, game::GameId},
};

pub const EVENT_GAME_UPDATED: &str = "game.updated";
pub const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast a new revision of a game to its watchers, once per revision.
pub fn broadcast_game_updated(
    state: &SharedState,
    id: &GameId,
    revision: &Revision,
    snapshot: GameSnapshot,
) -> bool {
    let payload = GameUpdatedEvent::from(snapshot);
    match game_event(&payload) {
        Some(event) => {
            let sent = state.channels().publish(id, revision, event);
            if sent {
                debug!(game_id = %id, revision = revision.as_str(), "broadcast game update");
            }
            sent
        }
        None => false,
    }
}

/// Build the `game.updated` event sent first on a fresh stream.
pub fn game_updated_event(snapshot: GameSnapshot) -> Option<ServerEvent> {
    game_event(&GameUpdatedEvent::from(snapshot))
}

/// Build the `system.status` event announcing degraded mode changes.
pub fn system_status_event(degraded: bool) -> Option<ServerEvent> {
    serialize_event(EVENT_SYSTEM_STATUS, &SystemStatus { degraded })
}

fn game_event(payload: &GameUpdatedEvent) -> Option<ServerEvent> {
    serialize_event(EVENT_GAME_UPDATED, payload)
}

fn serialize_event(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}
