use marquee_core::{Booking, CoreError, CoreResult, Session};
use marquee_shared::{BookingId, ReservationCode};
use std::fmt;
use std::sync::Arc;

use crate::quote::PriceQuote;

/// How a patron refers to a booking: internal id or reservation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingKey {
    Id(BookingId),
    Code(ReservationCode),
}

impl BookingKey {
    /// All-digit input is an id; anything else is a reservation code.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidCode(input.to_string()));
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(BookingKey::Id(BookingId::new(trimmed)));
        }
        ReservationCode::parse(trimmed)
            .map(BookingKey::Code)
            .ok_or_else(|| CoreError::InvalidCode(input.to_string()))
    }
}

impl fmt::Display for BookingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingKey::Id(id) => write!(f, "#{}", id),
            BookingKey::Code(code) => write!(f, "{}", code),
        }
    }
}

/// Everything a ticket view shows.
#[derive(Debug, Clone)]
pub struct BookingDetail {
    pub booking: Arc<Booking>,
    pub session: Session,
    pub quote: PriceQuote,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        assert_eq!(BookingKey::parse(" 42 ").unwrap(), BookingKey::Id(BookingId::from(42)));
        assert_eq!(
            BookingKey::parse("533df60e-12ce").unwrap(),
            BookingKey::Code(ReservationCode::new("533df60e-12ce"))
        );
        assert_eq!(
            BookingKey::parse("   ").unwrap_err(),
            CoreError::InvalidCode("   ".into())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(BookingKey::Id(BookingId::from(3)).to_string(), "#3");
        assert_eq!(BookingKey::Code(ReservationCode::new("ABC")).to_string(), "ABC");
    }
}
