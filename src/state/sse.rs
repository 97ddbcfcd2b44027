use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::{sync::broadcast, task::AbortHandle};

use crate::{dao::models::Revision, dto::sse::ServerEvent, state::game::GameId};

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

struct GameChannel {
    hub: Arc<SseHub>,
    watchers: usize,
    last_revision: Option<Revision>,
    poller: Option<AbortHandle>,
}

/// Per-game broadcast hubs, created when a first client watches a game and dropped with the last.
pub struct GameChannels {
    channels: DashMap<GameId, GameChannel>,
    capacity: usize,
}

impl GameChannels {
    /// Create an empty registry whose hubs use the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Register a watcher for `id` and subscribe it to the game's hub.
    ///
    /// `start_poller` runs only for the first watcher; its handle is aborted when the last
    /// watcher leaves.
    pub fn attach<F>(&self, id: &GameId, start_poller: F) -> broadcast::Receiver<ServerEvent>
    where
        F: FnOnce() -> AbortHandle,
    {
        match self.channels.entry(id.clone()) {
            Entry::Occupied(mut slot) => {
                let channel = slot.get_mut();
                channel.watchers += 1;
                channel.hub.subscribe()
            }
            Entry::Vacant(slot) => {
                let hub = Arc::new(SseHub::new(self.capacity));
                let receiver = hub.subscribe();
                slot.insert(GameChannel {
                    hub,
                    watchers: 1,
                    last_revision: None,
                    poller: Some(start_poller()),
                });
                receiver
            }
        }
    }

    /// Record `revision` as already delivered unless an update was published since attaching.
    pub fn seed_revision(&self, id: &GameId, revision: &Revision) {
        if let Some(mut channel) = self.channels.get_mut(id) {
            if channel.last_revision.is_none() {
                channel.last_revision = Some(revision.clone());
            }
        }
    }

    /// Drop one watcher of `id`, tearing the channel down with its poller when none remain.
    pub fn detach(&self, id: &GameId) {
        let removed = self
            .channels
            .remove_if_mut(id, |_, channel| {
                channel.watchers = channel.watchers.saturating_sub(1);
                channel.watchers == 0
            });

        if let Some((_, channel)) = removed {
            if let Some(poller) = channel.poller {
                poller.abort();
            }
        }
    }

    /// Broadcast `event` for `id` unless `revision` was already published.
    ///
    /// Returns whether the event was sent. Games nobody watches are skipped.
    pub fn publish(&self, id: &GameId, revision: &Revision, event: ServerEvent) -> bool {
        let Some(mut channel) = self.channels.get_mut(id) else {
            return false;
        };
        if channel.last_revision.as_ref() == Some(revision) {
            return false;
        }
        channel.last_revision = Some(revision.clone());
        let hub = channel.hub.clone();
        drop(channel);

        hub.broadcast(event);
        true
    }

    /// Number of clients currently watching `id`.
    pub fn watchers(&self, id: &GameId) -> usize {
        self.channels
            .get(id)
            .map(|channel| channel.watchers)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_task() -> AbortHandle {
        tokio::spawn(std::future::pending::<()>()).abort_handle()
    }

    fn event(data: &str) -> ServerEvent {
        ServerEvent {
            event: Some("game.updated".into()),
            data: data.into(),
        }
    }

    #[tokio::test]
    async fn publish_skips_already_sent_revision() {
        let channels = GameChannels::new(4);
        let id = GameId::parse("g1").unwrap();
        let mut rx = channels.attach(&id, idle_task);
        channels.seed_revision(&id, &Revision("0-a".into()));

        let rev = Revision("1-a".into());
        assert!(!channels.publish(&id, &Revision("0-a".into()), event("known")));
        assert!(channels.publish(&id, &rev, event("first")));
        assert!(!channels.publish(&id, &rev, event("again")));
        assert!(channels.publish(&id, &Revision("2-b".into()), event("second")));

        assert_eq!(rx.recv().await.unwrap().data, "first");
        assert_eq!(rx.recv().await.unwrap().data, "second");
    }

    #[tokio::test]
    async fn last_detach_aborts_poller() {
        let channels = GameChannels::new(4);
        let id = GameId::parse("g2").unwrap();
        let handle = tokio::spawn(std::future::pending::<()>());
        let abort = handle.abort_handle();

        let _first = channels.attach(&id, move || abort);
        let _second = channels.attach(&id, || panic!("poller must start once"));
        assert_eq!(channels.watchers(&id), 2);

        channels.detach(&id);
        assert_eq!(channels.watchers(&id), 1);
        channels.detach(&id);
        assert_eq!(channels.watchers(&id), 0);

        assert!(handle.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn seeding_keeps_a_newer_published_revision() {
        let channels = GameChannels::new(4);
        let id = GameId::parse("g4").unwrap();
        let mut rx = channels.attach(&id, idle_task);

        assert!(channels.publish(&id, &Revision("2-b".into()), event("newer")));
        channels.seed_revision(&id, &Revision("1-a".into()));
        assert!(!channels.publish(&id, &Revision("2-b".into()), event("again")));
        assert_eq!(rx.recv().await.unwrap().data, "newer");
    }

    #[tokio::test]
    async fn unwatched_games_are_not_published() {
        let channels = GameChannels::new(4);
        let id = GameId::parse("g3").unwrap();
        assert!(!channels.publish(&id, &Revision("1".into()), event("x")));
    }
}
