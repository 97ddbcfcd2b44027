//! Process-local game store keeping JSON documents in a concurrent map.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;

use crate::{
    dao::{
        game_store::{GameStore, game_key},
        models::{GameEntity, Revision, StoredGame},
        storage::{StorageError, StorageResult},
    },
    state::game::GameId,
};

#[derive(Debug, Clone)]
struct MemoryDocument {
    revision: u64,
    body: String,
}

impl MemoryDocument {
    fn revision(&self) -> Revision {
        Revision(format!("{}-mem", self.revision))
    }
}

/// In-memory [`GameStore`] storing each game as a JSON string under `gameState_<id>`.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    documents: Arc<DashMap<String, MemoryDocument>>,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the raw JSON stored for a game without any revision check.
    ///
    /// Mirrors what a browser client sharing the store does.
    pub fn write_raw(&self, id: &GameId, body: impl Into<String>) -> Revision {
        let body = body.into();
        let mut entry = self
            .documents
            .entry(game_key(id))
            .or_insert_with(|| MemoryDocument {
                revision: 0,
                body: String::new(),
            });
        entry.revision += 1;
        entry.body = body;
        entry.revision()
    }

    /// Raw JSON stored for a game.
    pub fn read_raw(&self, id: &GameId) -> Option<String> {
        self.documents
            .get(&game_key(id))
            .map(|document| document.body.clone())
    }
}

fn encode(key: &str, game: &GameEntity) -> StorageResult<String> {
    serde_json::to_string(game).map_err(|source| StorageError::Corrupted {
        key: key.to_string(),
        source,
    })
}

impl GameStore for MemoryGameStore {
    fn find_game(&self, id: &GameId) -> BoxFuture<'static, StorageResult<Option<StoredGame>>> {
        let key = game_key(id);
        let document = self.documents.get(&key).map(|doc| doc.value().clone());
        Box::pin(async move {
            let Some(document) = document else {
                return Ok(None);
            };
            let game = serde_json::from_str::<GameEntity>(&document.body)
                .map_err(|source| StorageError::Corrupted { key, source })?;
            Ok(Some(StoredGame {
                revision: document.revision(),
                game,
            }))
        })
    }

    fn insert_game(
        &self,
        id: &GameId,
        game: GameEntity,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let key = game_key(id);
        let result = encode(&key, &game).and_then(|body| match self.documents.entry(key.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict { key }),
            Entry::Vacant(slot) => {
                let document = MemoryDocument { revision: 1, body };
                let revision = document.revision();
                slot.insert(document);
                Ok(revision)
            }
        });
        Box::pin(async move { result })
    }

    fn compare_and_set(
        &self,
        id: &GameId,
        expected: &Revision,
        game: GameEntity,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let key = game_key(id);
        let result = encode(&key, &game).and_then(|body| {
            let Some(mut document) = self.documents.get_mut(&key) else {
                return Err(StorageError::Conflict { key });
            };
            if document.revision() != *expected {
                return Err(StorageError::Conflict { key });
            }
            document.revision += 1;
            document.body = body;
            Ok(document.revision())
        });
        Box::pin(async move { result })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
