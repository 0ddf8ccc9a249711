pub mod models;
pub mod repository;
pub mod mock;

pub use models::{
    Booking, BookingStatus, Customer, Movie, MovieRef, NewBooking, Session, TransitionAck,
};
pub use repository::{BookingRemote, SessionRemote};

/// How a failure should be presented: inline next to the control,
/// as a generic remote failure, or as a "check your code" hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Remote,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Session is not loaded: {0}")]
    SessionUnavailable(String),

    #[error("Select at least one seat")]
    NoSeatsSelected,

    #[error("Seat {0} is selected more than once")]
    DuplicateSeat(String),

    #[error("Selection exceeds availability: requested {requested}, available {available}")]
    CapacityExceeded {
        requested: usize,
        available: u32,
    },

    #[error("Invalid reservation code: {0:?}")]
    InvalidCode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Remote request failed ({}): {message}", describe_status(.status))]
    Remote {
        status: Option<u16>,
        message: String,
    },
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "no response".to_string(),
    }
}

impl CoreError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        CoreError::Remote {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Failure before any HTTP status was received (connect, timeout, decode).
    pub fn transport(message: impl Into<String>) -> Self {
        CoreError::Remote {
            status: None,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::SessionUnavailable(_)
            | CoreError::NoSeatsSelected
            | CoreError::DuplicateSeat(_)
            | CoreError::CapacityExceeded { .. }
            | CoreError::InvalidCode(_) => ErrorCategory::Validation,
            CoreError::NotFound(_) | CoreError::BookingNotFound(_) => ErrorCategory::NotFound,
            CoreError::Remote { .. } => ErrorCategory::Remote,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            CoreError::Remote { status, .. } => *status,
            _ => None,
        }
    }

    /// True when the record does not exist, whether reported locally or as HTTP 404.
    pub fn is_missing(&self) -> bool {
        self.category() == ErrorCategory::NotFound || self.status() == Some(404)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
