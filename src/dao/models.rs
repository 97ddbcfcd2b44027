use serde::{Deserialize, Serialize};

use crate::state::{
    game::{Decks, GameRecord},
    state_machine::GamePhase,
};

/// Persisted representation of a game, shared with browser clients.
///
/// Absent bans are stored as empty strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameEntity {
    /// Phase tag (`player1Submit`, `player2Submit`, `bothBan`, `results`).
    pub state: GamePhase,
    /// Decks of player 1.
    pub player1_decks: Decks,
    /// Decks of player 2.
    pub player2_decks: Decks,
    /// Deck banned by player 1, empty when none.
    #[serde(default)]
    pub player1_banned_deck: String,
    /// Deck banned by player 2, empty when none.
    #[serde(default)]
    pub player2_banned_deck: String,
}

/// Opaque token that changes on every write of a stored game.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(pub String);

impl Revision {
    /// Borrow the raw revision token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A stored game along with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredGame {
    /// Revision of the stored document.
    pub revision: Revision,
    /// Stored game content.
    pub game: GameEntity,
}

impl From<GameRecord> for GameEntity {
    fn from(value: GameRecord) -> Self {
        Self {
            state: value.phase,
            player1_decks: value.player1_decks,
            player2_decks: value.player2_decks,
            player1_banned_deck: value.player1_banned_deck.unwrap_or_default(),
            player2_banned_deck: value.player2_banned_deck.unwrap_or_default(),
        }
    }
}

impl From<GameEntity> for GameRecord {
    fn from(value: GameEntity) -> Self {
        Self {
            phase: value.state,
            player1_decks: value.player1_decks,
            player2_decks: value.player2_decks,
            player1_banned_deck: non_empty(value.player1_banned_deck),
            player2_banned_deck: non_empty(value.player2_banned_deck),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_game_matches_browser_shape() {
        let entity = GameEntity::from(GameRecord::default());
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "state": "player1Submit",
                "player1Decks": ["", "", ""],
                "player2Decks": ["", "", ""],
                "player1BannedDeck": "",
                "player2BannedDeck": "",
            })
        );
    }

    #[test]
    fn empty_ban_strings_become_absent() {
        let entity: GameEntity = serde_json::from_str(
            r#"{"state":"bothBan","player1Decks":["a","b","c"],"player2Decks":["d","e","f"],"player1BannedDeck":"e","player2BannedDeck":""}"#,
        )
        .unwrap();
        let record = GameRecord::from(entity);
        assert_eq!(record.phase, GamePhase::BothBan);
        assert_eq!(record.player1_banned_deck.as_deref(), Some("e"));
        assert_eq!(record.player2_banned_deck, None);
    }
}
