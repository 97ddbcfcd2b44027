use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::StoredGame,
    dto::validation::{MAX_DECK_NAME_LENGTH, validate_deck_names, validate_game_id},
    state::{
        game::{Decks, GameId, GameRecord},
        state_machine::{GamePhase, PlayerSlot},
    },
};

/// Game record as exchanged with clients; bans are empty strings until made.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameStateResponse {
    pub state: GamePhase,
    #[schema(value_type = Vec<String>)]
    pub player1_decks: Decks,
    #[schema(value_type = Vec<String>)]
    pub player2_decks: Decks,
    pub player1_banned_deck: String,
    pub player2_banned_deck: String,
}

impl From<GameRecord> for GameStateResponse {
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

/// Current record of a game together with the revision it was read at.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub game_id: String,
    /// Changes on every write; clients can skip redraws when it is unchanged.
    pub revision: String,
    pub game: GameStateResponse,
}

impl GameSnapshot {
    /// Build the snapshot of `game` read from storage.
    pub fn new(id: &GameId, stored: StoredGame, record: GameRecord) -> Self {
        Self {
            game_id: id.to_string(),
            revision: stored.revision.0,
            game: record.into(),
        }
    }
}

/// Query string of the page a browser opened; `gameId` is present for the second player.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SessionQuery {
    #[validate(custom(function = "validate_game_id"))]
    pub game_id: Option<String>,
}

/// Outcome of opening a session: which seat this browser holds and where the game lives.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub game_id: String,
    /// Seat of this browser: 1 for the host, 2 for the guest.
    #[schema(value_type = u8)]
    pub player: PlayerSlot,
    /// Link the host sends to the second player.
    pub share_link: String,
    pub revision: String,
    pub game: GameStateResponse,
}

/// Query selecting which player a view is rendered for.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PlayerQuery {
    /// 1 for the host, 2 for the guest.
    #[param(value_type = u8)]
    pub player: PlayerSlot,
}

/// Three decks submitted by a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitDecksRequest {
    #[schema(value_type = Vec<String>, min_items = 3, max_items = 3)]
    #[validate(custom(function = "validate_submitted_decks"))]
    pub decks: Decks,
}

fn validate_submitted_decks(decks: &Decks) -> Result<(), validator::ValidationError> {
    validate_deck_names(decks)
}

/// Opponent deck a player bans.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BanDeckRequest {
    #[validate(length(min = 1, max = MAX_DECK_NAME_LENGTH))]
    pub deck: String,
}
