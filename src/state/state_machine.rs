use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// The four phases a deck ban game goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    /// Player 1 (host) is choosing decks.
    #[default]
    Player1Submit,
    /// Player 1 is done; player 2 (guest) is choosing decks.
    Player2Submit,
    /// Both players pick one of the opponent's decks to ban.
    BothBan,
    /// Both bans are in; decks and bans are displayed.
    Results,
}

/// Which seat a participant occupies in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerSlot {
    /// Host, the browser that opened the game.
    One,
    /// Guest, the browser that joined through the share link.
    Two,
}

impl PlayerSlot {
    /// Seat of the other participant.
    pub fn opponent(self) -> Self {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }

    /// Numeric seat (1 or 2) as used on the wire.
    pub fn number(self) -> u8 {
        match self {
            PlayerSlot::One => 1,
            PlayerSlot::Two => 2,
        }
    }

    /// Parse a wire seat number.
    pub fn from_number(value: u8) -> Option<Self> {
        match value {
            1 => Some(PlayerSlot::One),
            2 => Some(PlayerSlot::Two),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.number())
    }
}

impl Serialize for PlayerSlot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

impl<'de> Deserialize<'de> for PlayerSlot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        PlayerSlot::from_number(value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown player `{value}`")))
    }
}

/// Events that move a game between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A player submitted their three decks.
    DecksSubmitted(PlayerSlot),
    /// A player banned a deck. `opponent_banned` tells whether the other ban is already in.
    DeckBanned {
        /// Player who banned.
        player: PlayerSlot,
        /// Whether the opponent had already banned before this event.
        opponent_banned: bool,
    },
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the game was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: GameEvent,
}

impl GamePhase {
    /// Compute the phase reached after `event`, if the event is allowed here.
    pub fn next(self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = match (self, event) {
            (GamePhase::Player1Submit, GameEvent::DecksSubmitted(PlayerSlot::One)) => {
                GamePhase::Player2Submit
            }
            (GamePhase::Player2Submit, GameEvent::DecksSubmitted(PlayerSlot::Two)) => {
                GamePhase::BothBan
            }
            (
                GamePhase::BothBan,
                GameEvent::DeckBanned {
                    opponent_banned: true,
                    ..
                },
            ) => GamePhase::Results,
            (
                GamePhase::BothBan,
                GameEvent::DeckBanned {
                    opponent_banned: false,
                    ..
                },
            ) => GamePhase::BothBan,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
