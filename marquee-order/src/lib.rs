pub mod detail;
pub mod guard;
pub mod manager;
pub mod quote;

pub use detail::{BookingDetail, BookingKey};
pub use guard::{Relevance, ViewScope};
pub use manager::{BookingManager, CreatedBooking};
pub use quote::PriceQuote;
