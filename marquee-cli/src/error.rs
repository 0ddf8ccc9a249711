use marquee_core::{CoreError, ErrorCategory};
use marquee_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Usage(String),

    #[error("Interrupted")]
    Interrupted,
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Core(e) => match e.category() {
                ErrorCategory::Validation => 2,
                ErrorCategory::NotFound => 3,
                ErrorCategory::Remote => 4,
            },
            CliError::Store(_) => 5,
            CliError::Usage(_) => 2,
            CliError::Interrupted => 130,
        }
    }

    /// Text shown to the patron. Not-found failures carry a hint to
    /// re-check the reservation code.
    pub fn user_message(&self) -> String {
        match self {
            CliError::Core(e) => match e.category() {
                ErrorCategory::NotFound => {
                    format!("{}. Check your reservation code and try again.", e)
                }
                ErrorCategory::Remote => match e.status() {
                    Some(409) => format!(
                        "The reservation service rejected the request: {}",
                        e
                    ),
                    _ => format!("Could not reach the reservation service: {}", e),
                },
                ErrorCategory::Validation => e.to_string(),
            },
            CliError::Store(e) => format!("Local booking storage failed: {}", e),
            CliError::Usage(msg) => msg.clone(),
            CliError::Interrupted => "Interrupted".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_categories() {
        assert_eq!(CliError::from(CoreError::NoSeatsSelected).exit_code(), 2);
        assert_eq!(CliError::from(CoreError::BookingNotFound("X".into())).exit_code(), 3);
        assert_eq!(CliError::from(CoreError::remote(500, "boom")).exit_code(), 4);
        assert_eq!(CliError::Interrupted.exit_code(), 130);
    }

    #[test]
    fn test_not_found_suggests_checking_the_code() {
        let message = CliError::from(CoreError::BookingNotFound("ABC123".into())).user_message();
        assert_eq!(
            message,
            "Booking not found: ABC123. Check your reservation code and try again."
        );
    }

    #[test]
    fn test_conflict_message() {
        let message = CliError::from(CoreError::remote(409, "Seat A1 is already taken")).user_message();
        assert!(message.starts_with("The reservation service rejected the request"));
        assert!(message.contains("Seat A1 is already taken"));
    }
}
