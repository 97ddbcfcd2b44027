//! Keeps watchers of a game in sync with the stored record.
//!
//! Writes made through this process are pushed directly. Writes made elsewhere against the
//! same store (another backend instance, a browser client) are picked up by a poller that
//! reloads the game on an interval while at least one client watches it.

use tokio::{
    sync::broadcast,
    task::AbortHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, info, warn};

use crate::{
    dto::{game::GameSnapshot, sse::ServerEvent},
    error::ServiceError,
    services::{
        game_service::{parse_game_id, read_game},
        sse_events::{broadcast_game_updated, game_updated_event},
    },
    state::{SharedState, game::GameId},
};

/// Subscription handed to a new watcher.
pub struct GameWatch {
    /// Game being watched.
    pub id: GameId,
    /// Current record, sent before any update.
    pub initial: Option<ServerEvent>,
    /// Subsequent updates.
    pub receiver: broadcast::Receiver<ServerEvent>,
}

/// Start watching a game, starting its poller if this is the first watcher.
pub async fn watch_game(state: &SharedState, raw_id: &str) -> Result<GameWatch, ServiceError> {
    let id = parse_game_id(raw_id)?;

    // Subscribe before reading so a write landing in between reaches this watcher.
    let receiver = state
        .channels()
        .attach(&id, || spawn_poller(state.clone(), id.clone()));
    let (stored, record) = match read_game(state, &id).await {
        Ok(found) => found,
        Err(err) => {
            state.channels().detach(&id);
            return Err(err);
        }
    };
    state.channels().seed_revision(&id, &stored.revision);
    info!(game_id = %id, watchers = state.channels().watchers(&id), "watching game");

    let initial = game_updated_event(GameSnapshot::new(&id, stored, record));
    Ok(GameWatch {
        id,
        initial,
        receiver,
    })
}

/// Release a watcher; the poller stops with the last one.
pub fn unwatch_game(state: &SharedState, id: &GameId) {
    state.channels().detach(id);
    debug!(game_id = %id, watchers = state.channels().watchers(id), "stopped watching game");
}

/// Reload a game once and broadcast it when its revision changed.
pub async fn poll_once(state: &SharedState, id: &GameId) -> bool {
    match read_game(state, id).await {
        Ok((stored, record)) => {
            let revision = stored.revision.clone();
            broadcast_game_updated(state, id, &revision, GameSnapshot::new(id, stored, record))
        }
        Err(ServiceError::Degraded) => false,
        Err(err) => {
            warn!(game_id = %id, error = %err, "failed to poll game");
            false
        }
    }
}

fn spawn_poller(state: SharedState, id: GameId) -> AbortHandle {
    let period = state.config().poll_interval();
    tokio::spawn(async move {
        // The watcher was just handed the current record; first reload one period later.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            poll_once(&state, &id).await;
        }
    })
    .abort_handle()
}
