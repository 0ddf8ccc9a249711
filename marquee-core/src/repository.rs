use async_trait::async_trait;
use marquee_shared::{BookingId, MovieId, ReservationCode, SessionId};
use crate::models::{Booking, Movie, NewBooking, Session, TransitionAck};
use crate::CoreResult;

/// Read access to the film and session catalogue of the reservation service.
#[async_trait]
pub trait SessionRemote: Send + Sync {
    async fn fetch_session(&self, id: &SessionId) -> CoreResult<Session>;

    /// All sessions, or only those of one movie.
    async fn list_sessions(&self, movie: Option<&MovieId>) -> CoreResult<Vec<Session>>;

    async fn fetch_movie(&self, id: &MovieId) -> CoreResult<Movie>;

    async fn list_movies(&self) -> CoreResult<Vec<Movie>>;
}

/// Booking endpoints of the reservation service.
///
/// Every non-2xx answer is reported as `CoreError::Remote` carrying the
/// HTTP status. Implementations never retry.
#[async_trait]
pub trait BookingRemote: Send + Sync {
    /// Submit a new booking. The returned record is authoritative.
    async fn create_booking(
        &self,
        request: &NewBooking,
        idempotency_key: Option<&str>,
    ) -> CoreResult<Booking>;

    async fn fetch_booking(&self, id: &BookingId) -> CoreResult<Booking>;

    async fn fetch_booking_by_code(&self, code: &ReservationCode) -> CoreResult<Booking>;

    async fn list_bookings(&self, session: Option<&SessionId>) -> CoreResult<Vec<Booking>>;

    async fn confirm_booking(&self, id: &BookingId) -> CoreResult<TransitionAck>;

    async fn cancel_booking(&self, id: &BookingId) -> CoreResult<TransitionAck>;

    async fn delete_booking(&self, id: &BookingId) -> CoreResult<()>;
}
