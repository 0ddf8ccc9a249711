use async_trait::async_trait;
use chrono::Utc;
use marquee_shared::{BookingId, MovieId, ReservationCode, SessionId};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Movie, MovieRef, NewBooking, Session, TransitionAck};
use crate::repository::{BookingRemote, SessionRemote};
use crate::{CoreError, CoreResult};

/// In-memory stand-in for the reservation service.
///
/// Applies the rules the real service owns: it assigns ids, codes and
/// totals, rejects seats already held by an active booking, answers 409
/// to illegal status transitions and adjusts availability on create,
/// cancel and delete.
#[derive(Default)]
pub struct MockCinemaRemote {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    movies: Vec<Movie>,
    sessions: BTreeMap<SessionId, Session>,
    bookings: BTreeMap<BookingId, Booking>,
    next_booking_id: u64,
    next_code: Option<String>,
    replays: HashMap<String, BookingId>,
    fail_next: Option<u16>,
    calls: Vec<String>,
}

impl MockState {
    fn record(&mut self, call: String) -> CoreResult<()> {
        tracing::debug!("mock remote: {}", call);
        self.calls.push(call);
        match self.fail_next.take() {
            Some(status) => Err(CoreError::remote(status, "injected failure")),
            None => Ok(()),
        }
    }

    fn restore_seats(&mut self, booking: &Booking) {
        if let Some(session) = self.sessions.get_mut(&booking.session) {
            session.available_seats = session
                .available_seats
                .saturating_add(booking.seat_count)
                .min(session.total_seats);
            if let Some(occupied) = session.occupied_seats.as_mut() {
                occupied.retain(|seat| !booking.holds_seat(seat));
            }
        }
    }
}

fn missing(what: &str, key: &dyn std::fmt::Display) -> CoreError {
    CoreError::remote(404, format!("{} {} does not exist", what, key))
}

impl MockCinemaRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_movie(&self, movie: Movie) {
        self.state.lock().await.movies.push(movie);
    }

    pub async fn add_session(&self, session: Session) {
        let mut state = self.state.lock().await;
        state.sessions.insert(session.id.clone(), session);
    }

    /// Seed an existing booking. Availability is left as seeded.
    pub async fn add_booking(&self, booking: Booking) {
        let mut state = self.state.lock().await;
        if let Ok(n) = booking.id.as_str().parse::<u64>() {
            state.next_booking_id = state.next_booking_id.max(n);
        }
        state.bookings.insert(booking.id.clone(), booking);
    }

    /// Code to hand out on the next successful create.
    pub async fn set_next_code(&self, code: &str) {
        self.state.lock().await.next_code = Some(code.to_string());
    }

    /// Make the next call fail with this HTTP status.
    pub async fn fail_next(&self, status: u16) {
        self.state.lock().await.fail_next = Some(status);
    }

    pub async fn session(&self, id: &SessionId) -> Option<Session> {
        self.state.lock().await.sessions.get(id).cloned()
    }

    pub async fn booking(&self, id: &BookingId) -> Option<Booking> {
        self.state.lock().await.bookings.get(id).cloned()
    }

    pub async fn booking_count(&self) -> usize {
        self.state.lock().await.bookings.len()
    }

    /// Calls received so far, as `METHOD path` strings.
    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl SessionRemote for MockCinemaRemote {
    async fn fetch_session(&self, id: &SessionId) -> CoreResult<Session> {
        let mut state = self.state.lock().await;
        state.record(format!("GET /sessions/{}/", id))?;
        state
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| missing("Session", id))
    }

    async fn list_sessions(&self, movie: Option<&MovieId>) -> CoreResult<Vec<Session>> {
        let mut state = self.state.lock().await;
        match movie {
            Some(m) => state.record(format!("GET /movies/{}/sessions/", m))?,
            None => state.record("GET /sessions/".to_string())?,
        }
        Ok(state
            .sessions
            .values()
            .filter(|s| movie.map(|m| s.movie.id() == m).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn fetch_movie(&self, id: &MovieId) -> CoreResult<Movie> {
        let mut state = self.state.lock().await;
        state.record(format!("GET /movies/{}/", id))?;
        state
            .movies
            .iter()
            .find(|m| &m.id == id)
            .cloned()
            .ok_or_else(|| missing("Movie", id))
    }

    async fn list_movies(&self) -> CoreResult<Vec<Movie>> {
        let mut state = self.state.lock().await;
        state.record("GET /movies/".to_string())?;
        Ok(state.movies.clone())
    }
}

#[async_trait]
impl BookingRemote for MockCinemaRemote {
    async fn create_booking(
        &self,
        request: &NewBooking,
        idempotency_key: Option<&str>,
    ) -> CoreResult<Booking> {
        let mut state = self.state.lock().await;
        state.record("POST /bookings/".to_string())?;

        if let Some(key) = idempotency_key {
            let replayed = state
                .replays
                .get(key)
                .and_then(|id| state.bookings.get(id))
                .cloned();
            if let Some(booking) = replayed {
                return Ok(booking);
            }
        }

        if request.selected_seats.is_empty()
            || request.seat_count as usize != request.selected_seats.len()
        {
            return Err(CoreError::remote(
                400,
                "cantidad_asientos must match asientos_seleccionados",
            ));
        }

        let session = state
            .sessions
            .get(&request.session)
            .cloned()
            .ok_or_else(|| CoreError::remote(400, format!("Invalid session {}", request.session)))?;

        if request.seat_count > session.available_seats {
            return Err(CoreError::remote(409, "Not enough seats available"));
        }

        let conflict = state
            .bookings
            .values()
            .filter(|b| b.session == request.session && b.is_active())
            .flat_map(|b| b.selected_seats.iter())
            .find(|seat| request.selected_seats.contains(seat))
            .cloned();
        if let Some(seat) = conflict {
            return Err(CoreError::remote(409, format!("Seat {} is already taken", seat)));
        }

        state.next_booking_id += 1;
        let id = BookingId::from(state.next_booking_id);
        let code = state
            .next_code
            .take()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let booking = Booking {
            id: id.clone(),
            code: ReservationCode::new(code),
            session: request.session.clone(),
            customer_name: request.customer_name.clone(),
            customer_email: request.customer_email.clone(),
            customer_phone: request.customer_phone.clone(),
            selected_seats: request.selected_seats.clone(),
            seat_count: request.seat_count,
            server_total: session.price.times(request.seat_count),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };

        if let Some(stored) = state.sessions.get_mut(&request.session) {
            stored.available_seats -= request.seat_count;
            if let Some(occupied) = stored.occupied_seats.as_mut() {
                occupied.extend(request.selected_seats.iter().cloned());
            }
        }
        if let Some(key) = idempotency_key {
            state.replays.insert(key.to_string(), id.clone());
        }
        state.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn fetch_booking(&self, id: &BookingId) -> CoreResult<Booking> {
        let mut state = self.state.lock().await;
        state.record(format!("GET /bookings/{}/", id))?;
        state
            .bookings
            .get(id)
            .cloned()
            .ok_or_else(|| missing("Booking", id))
    }

    async fn fetch_booking_by_code(&self, code: &ReservationCode) -> CoreResult<Booking> {
        let mut state = self.state.lock().await;
        state.record(format!("GET /bookings/by_code/{}/", code))?;
        state
            .bookings
            .values()
            .find(|b| &b.code == code)
            .cloned()
            .ok_or_else(|| missing("Booking with code", code))
    }

    async fn list_bookings(&self, session: Option<&SessionId>) -> CoreResult<Vec<Booking>> {
        let mut state = self.state.lock().await;
        state.record("GET /bookings/".to_string())?;
        Ok(state
            .bookings
            .values()
            .filter(|b| session.map(|s| &b.session == s).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn confirm_booking(&self, id: &BookingId) -> CoreResult<TransitionAck> {
        let mut state = self.state.lock().await;
        state.record(format!("POST /bookings/{}/confirm/", id))?;
        let booking = state
            .bookings
            .get_mut(id)
            .ok_or_else(|| missing("Booking", id))?;
        if !booking.status.can_transition_to(BookingStatus::Confirmed) {
            return Err(CoreError::remote(
                409,
                format!("Cannot confirm a {} booking", booking.status),
            ));
        }
        booking.status = BookingStatus::Confirmed;
        Ok(TransitionAck {
            status: Some("confirmada".to_string()),
        })
    }

    async fn cancel_booking(&self, id: &BookingId) -> CoreResult<TransitionAck> {
        let mut state = self.state.lock().await;
        state.record(format!("POST /bookings/{}/cancel/", id))?;
        let booking = state
            .bookings
            .get_mut(id)
            .ok_or_else(|| missing("Booking", id))?;
        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(CoreError::remote(
                409,
                format!("Cannot cancel a {} booking", booking.status),
            ));
        }
        booking.status = BookingStatus::Cancelled;
        let released = booking.clone();
        state.restore_seats(&released);
        Ok(TransitionAck {
            status: Some("cancelada".to_string()),
        })
    }

    async fn delete_booking(&self, id: &BookingId) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        state.record(format!("DELETE /bookings/{}/", id))?;
        let removed = state
            .bookings
            .remove(id)
            .ok_or_else(|| missing("Booking", id))?;
        if removed.is_active() {
            state.restore_seats(&removed);
        }
        Ok(())
    }
}

/// Ready-made records for tests across the workspace.
pub mod fixtures {
    use super::*;
    use marquee_shared::{Masked, Money};

    pub fn movie(id: u64, title: &str) -> Movie {
        Movie {
            id: MovieId::from(id),
            title: title.to_string(),
            description: None,
            duration_minutes: Some(120),
            genre: None,
            rating: None,
            poster_url: None,
            active: true,
        }
    }

    /// A session of movie 1 at 20:30 in room "1"; `price` is a decimal string.
    pub fn session(id: u64, total_seats: u32, available_seats: u32, price: &str) -> Session {
        Session {
            id: SessionId::from(id),
            movie: MovieRef::Id(MovieId::from(1)),
            date: "2025-10-20".to_string(),
            time: "20:30".to_string(),
            room: "1".to_string(),
            price: Money::parse(price).unwrap_or(Money::ZERO),
            total_seats,
            available_seats,
            occupied_seats: None,
        }
    }

    pub fn booking(
        id: u64,
        code: &str,
        session: u64,
        seats: &[&str],
        status: BookingStatus,
    ) -> Booking {
        Booking {
            id: BookingId::from(id),
            code: ReservationCode::new(code),
            session: SessionId::from(session),
            customer_name: "Ana".to_string(),
            customer_email: Masked("ana@example.com".to_string()),
            customer_phone: None,
            selected_seats: seats.iter().map(|s| s.to_string()).collect(),
            seat_count: seats.len() as u32,
            server_total: Money::ZERO,
            status,
            created_at: Utc::now(),
        }
    }
}
