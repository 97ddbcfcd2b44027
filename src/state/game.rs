use std::fmt;

use rand::Rng;
use thiserror::Error;

use crate::state::state_machine::{GameEvent, GamePhase, InvalidTransition, PlayerSlot};

/// Number of decks each player brings to a game.
pub const DECKS_PER_PLAYER: usize = 3;
/// Length of freshly generated game identifiers.
pub const GAME_ID_LENGTH: usize = 9;
/// Upper bound accepted for identifiers supplied by clients.
pub const MAX_GAME_ID_LENGTH: usize = 64;

const GAME_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// The three deck names a player submits.
pub type Decks = [String; DECKS_PER_PLAYER];

/// Random token identifying a game shared between two browsers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameId(String);

impl GameId {
    /// Generate a fresh lowercase base-36 identifier.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..GAME_ID_LENGTH)
            .map(|_| GAME_ID_ALPHABET[rng.random_range(0..GAME_ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    /// Accept an identifier coming from a share link.
    ///
    /// Identifiers are ASCII alphanumerics, `-` or `_`, at most [`MAX_GAME_ID_LENGTH`] long.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw.len() <= MAX_GAME_ID_LENGTH
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(raw.to_string()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reasons a player command is refused by the game rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Submitted decks are unusable (blank names).
    #[error("invalid decks: {0}")]
    InvalidDecks(String),
    /// The banned deck is not one of the opponent's decks.
    #[error("deck `{deck}` is not one of the opponent's decks")]
    UnknownDeck {
        /// Deck name supplied by the player.
        deck: String,
    },
    /// The player already banned a deck.
    #[error("{0} already banned a deck")]
    AlreadyBanned(PlayerSlot),
    /// The command is not allowed in the current phase.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// Complete state of one game, as shared by both players.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameRecord {
    /// Current phase.
    pub phase: GamePhase,
    /// Decks submitted by player 1 (blank until submitted).
    pub player1_decks: Decks,
    /// Decks submitted by player 2 (blank until submitted).
    pub player2_decks: Decks,
    /// Deck of player 2 banned by player 1.
    pub player1_banned_deck: Option<String>,
    /// Deck of player 1 banned by player 2.
    pub player2_banned_deck: Option<String>,
}

impl GameRecord {
    /// Decks owned by `player`.
    pub fn decks(&self, player: PlayerSlot) -> &Decks {
        match player {
            PlayerSlot::One => &self.player1_decks,
            PlayerSlot::Two => &self.player2_decks,
        }
    }

    /// Deck banned by `player`, if any.
    pub fn banned_deck(&self, player: PlayerSlot) -> Option<&str> {
        match player {
            PlayerSlot::One => self.player1_banned_deck.as_deref(),
            PlayerSlot::Two => self.player2_banned_deck.as_deref(),
        }
    }

    /// True when `player` has banned and is waiting on the opponent.
    pub fn is_waiting(&self, player: PlayerSlot) -> bool {
        self.banned_deck(player).is_some() && self.banned_deck(player.opponent()).is_none()
    }

    /// Record the decks of `player` and advance to the next phase.
    pub fn submit_decks(
        &mut self,
        player: PlayerSlot,
        decks: Decks,
    ) -> Result<GamePhase, CommandError> {
        let decks = decks.map(|deck| deck.trim().to_string());
        if let Some(position) = decks.iter().position(String::is_empty) {
            return Err(CommandError::InvalidDecks(format!(
                "deck {} must not be empty",
                position + 1
            )));
        }

        let next = self.phase.next(GameEvent::DecksSubmitted(player))?;
        match player {
            PlayerSlot::One => self.player1_decks = decks,
            PlayerSlot::Two => self.player2_decks = decks,
        }
        self.phase = next;

        Ok(next)
    }

    /// Ban one of the opponent's decks on behalf of `player`.
    ///
    /// The phase moves to [`GamePhase::Results`] in the same step when the opponent already
    /// banned, so the outcome never depends on a later read.
    pub fn ban_deck(&mut self, player: PlayerSlot, deck: &str) -> Result<GamePhase, CommandError> {
        let opponent = player.opponent();
        let next = self.phase.next(GameEvent::DeckBanned {
            player,
            opponent_banned: self.banned_deck(opponent).is_some(),
        })?;

        if self.banned_deck(player).is_some() {
            return Err(CommandError::AlreadyBanned(player));
        }

        let deck = deck.trim();
        if !self.decks(opponent).iter().any(|candidate| candidate == deck) {
            return Err(CommandError::UnknownDeck {
                deck: deck.to_string(),
            });
        }

        let banned = Some(deck.to_string());
        match player {
            PlayerSlot::One => self.player1_banned_deck = banned,
            PlayerSlot::Two => self.player2_banned_deck = banned,
        }
        self.phase = next;

        Ok(next)
    }

    /// Move a ban phase that already holds both bans to the results.
    ///
    /// Records written by clients that merged bans without finishing the phase end up here.
    /// Returns whether the phase changed.
    pub fn settle(&mut self) -> bool {
        if self.phase == GamePhase::BothBan
            && self.player1_banned_deck.is_some()
            && self.player2_banned_deck.is_some()
        {
            self.phase = GamePhase::Results;
            return true;
        }
        false
    }
}
