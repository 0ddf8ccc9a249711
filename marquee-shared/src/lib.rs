pub mod ids;
pub mod money;
pub mod pii;

pub use ids::{BookingId, MovieId, ReservationCode, SessionId};
pub use money::{Money, MoneyError};
pub use pii::Masked;
