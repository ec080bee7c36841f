//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a player name contains at least one visible character.
///
/// # Examples
///
/// ```ignore
/// validate_player_name("Ada")  // Ok
/// validate_player_name("   ")  // Err - blank
/// ```
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("player_name_blank");
        err.message = Some("Player name required".into());
        return Err(err);
    }

    Ok(())
}
