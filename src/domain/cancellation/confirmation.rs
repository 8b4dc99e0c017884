//! Typed confirmation guard for the irreversible step.

use super::CancellationError;

/// Text the organizer must type to confirm a cancellation.
pub const CONFIRMATION_TOKEN: &str = "CONFIRM";

/// Returns true if `text` matches the confirmation token.
///
/// Surrounding whitespace is ignored and the comparison is ASCII
/// case-insensitive.
pub fn is_valid_confirmation(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(CONFIRMATION_TOKEN)
}

/// Fails with `InvalidConfirmationCode` unless `text` matches the token.
pub fn verify_confirmation(text: &str) -> Result<(), CancellationError> {
    if is_valid_confirmation(text) {
        Ok(())
    } else {
        Err(CancellationError::invalid_confirmation_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_token_in_any_case_with_padding() {
        assert!(is_valid_confirmation("CONFIRM"));
        assert!(is_valid_confirmation("confirm"));
        assert!(is_valid_confirmation("Confirm "));
        assert!(is_valid_confirmation("  cOnFiRm\n"));
    }

    #[test]
    fn rejects_anything_else() {
        assert!(!is_valid_confirmation(""));
        assert!(!is_valid_confirmation("CONFIRMED"));
        assert!(!is_valid_confirmation("CON FIRM"));
        assert!(!is_valid_confirmation("yes"));
    }

    #[test]
    fn verify_maps_to_error() {
        assert_eq!(
            verify_confirmation("nope"),
            Err(CancellationError::InvalidConfirmationCode)
        );
        assert!(verify_confirmation("confirm").is_ok());
    }
}
