//! Answer validation: a fixed-order predicate chain over the raw input.
//!
//! The order is load-bearing — empty beats non-digit beats wrong-length —
//! because the UI messages are keyed to whichever check fails first and a
//! failed check never consumes the player's turn.

use thiserror::Error;

/// Why a submitted answer was rejected. All variants are recoverable:
/// the machine stays in `AwaitingInput` and the player retries.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Input was empty after trimming.
    #[error("Please enter the number")]
    Empty,

    /// Input contained non-digit characters. `cleaned` is the input with
    /// those characters stripped, echoed back into the entry field.
    #[error("Only numbers are allowed")]
    NonDigit { cleaned: String },

    /// Digit count did not match the target length.
    #[error("Expected {expected} digits")]
    WrongLength { expected: usize },
}

/// Validate a raw submission against the expected digit count.
/// Returns the trimmed, accepted answer on success.
pub fn validate(raw: &str, expected: usize) -> Result<String, ValidationError> {
    let answer = raw.trim();

    if answer.is_empty() {
        return Err(ValidationError::Empty);
    }

    if !answer.chars().all(|c| c.is_ascii_digit()) {
        let cleaned = answer.chars().filter(|c| c.is_ascii_digit()).collect();
        return Err(ValidationError::NonDigit { cleaned });
    }

    if answer.len() != expected {
        return Err(ValidationError::WrongLength { expected });
    }

    Ok(answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_beats_everything() {
        assert_eq!(validate("", 3), Err(ValidationError::Empty));
        assert_eq!(validate("   ", 3), Err(ValidationError::Empty));
    }

    #[test]
    fn non_digit_beats_wrong_length() {
        // Stripped length would be 2, but NonDigit must win over WrongLength
        assert_eq!(
            validate("12a", 3),
            Err(ValidationError::NonDigit { cleaned: "12".into() })
        );
    }

    #[test]
    fn wrong_length_last() {
        assert_eq!(validate("12", 3), Err(ValidationError::WrongLength { expected: 3 }));
        assert_eq!(validate("1234", 3), Err(ValidationError::WrongLength { expected: 3 }));
    }

    #[test]
    fn accepts_and_trims() {
        assert_eq!(validate(" 123 ", 3), Ok("123".into()));
    }
}
