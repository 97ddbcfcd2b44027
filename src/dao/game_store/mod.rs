#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::models::{GameEntity, Revision, StoredGame};
use crate::dao::storage::StorageResult;
use crate::state::game::GameId;

/// Prefix of the key every game is stored under.
pub const GAME_KEY_PREFIX: &str = "gameState_";

/// Storage key of a game (`gameState_<id>`).
pub fn game_key(id: &GameId) -> String {
    format!("{GAME_KEY_PREFIX}{id}")
}

/// Abstraction over the string-keyed store holding game records.
///
/// Writes are conditional: `insert_game` fails when the key exists and `compare_and_set` fails
/// when the stored revision differs from `expected`, both with [`StorageError::Conflict`].
///
/// [`StorageError::Conflict`]: crate::dao::storage::StorageError::Conflict
pub trait GameStore: Send + Sync {
    fn find_game(&self, id: &GameId) -> BoxFuture<'static, StorageResult<Option<StoredGame>>>;
    fn insert_game(
        &self,
        id: &GameId,
        game: GameEntity,
    ) -> BoxFuture<'static, StorageResult<Revision>>;
    fn compare_and_set(
        &self,
        id: &GameId,
        expected: &Revision,
        game: GameEntity,
    ) -> BoxFuture<'static, StorageResult<Revision>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
