//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::game::GameId;

/// Longest deck name accepted from clients.
pub const MAX_DECK_NAME_LENGTH: u64 = 100;

/// Validates that a game identifier from a share link is well formed.
///
/// # Examples
///
/// ```ignore
/// validate_game_id("k3j9x0abc") // Ok
/// validate_game_id("../secret") // Err - forbidden characters
/// ```
pub fn validate_game_id(id: &str) -> Result<(), ValidationError> {
    if GameId::parse(id).is_none() {
        let mut err = ValidationError::new("game_id_format");
        err.message = Some(
            "Game ID must be 1 to 64 ASCII letters, digits, `-` or `_` characters".into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that no deck name exceeds [`MAX_DECK_NAME_LENGTH`] characters.
///
/// Blank names are left to the game rules so they surface as a rule violation.
pub fn validate_deck_names(decks: &[String]) -> Result<(), ValidationError> {
    if let Some(too_long) = decks
        .iter()
        .find(|deck| deck.chars().count() as u64 > MAX_DECK_NAME_LENGTH)
    {
        let mut err = ValidationError::new("deck_name_length");
        err.message = Some(
            format!(
                "Deck names must be at most {MAX_DECK_NAME_LENGTH} characters (got {})",
                too_long.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_game_id_valid() {
        assert!(validate_game_id("k3j9x0abc").is_ok());
        assert!(validate_game_id("Game_1-b").is_ok());
    }

    #[test]
    fn test_validate_game_id_invalid() {
        assert!(validate_game_id("").is_err());
        assert!(validate_game_id("a b").is_err());
        assert!(validate_game_id("../etc").is_err());
        assert!(validate_game_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_deck_names() {
        assert!(validate_deck_names(&["a".into(), "".into(), "c".into()]).is_ok());
        assert!(validate_deck_names(&["a".repeat(MAX_DECK_NAME_LENGTH as usize + 1)]).is_err());
    }
}
