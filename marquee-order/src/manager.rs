use marquee_catalog::{SessionDirectory, SessionInventory};
use marquee_core::{
    Booking, BookingRemote, CoreError, CoreResult, Customer, NewBooking, Session, TransitionAck,
};
use marquee_shared::{BookingId, ReservationCode, SessionId};
use marquee_store::BookingCache;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::detail::{BookingDetail, BookingKey};
use crate::quote::PriceQuote;

/// A booking the service just accepted, with its price quote.
#[derive(Debug, Clone)]
pub struct CreatedBooking {
    pub booking: Arc<Booking>,
    pub quote: PriceQuote,
}

/// Drives bookings through create, confirm, cancel and delete, keeping
/// the local cache in line with what the service reports.
pub struct BookingManager {
    remote: Arc<dyn BookingRemote>,
    directory: Arc<SessionDirectory>,
    cache: Arc<BookingCache>,
    send_idempotency_key: bool,
}

impl BookingManager {
    pub fn new(
        remote: Arc<dyn BookingRemote>,
        directory: Arc<SessionDirectory>,
        cache: Arc<BookingCache>,
    ) -> Self {
        Self {
            remote,
            directory,
            cache,
            send_idempotency_key: false,
        }
    }

    pub fn with_idempotency_keys(mut self, enabled: bool) -> Self {
        self.send_idempotency_key = enabled;
        self
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    pub fn cache(&self) -> &BookingCache {
        &self.cache
    }

    /// Local checks run before anything is sent. Uses only the session
    /// copy already held by the directory.
    fn validate(
        &self,
        session_id: &SessionId,
        customer: Customer,
        seats: Vec<String>,
    ) -> CoreResult<(Session, NewBooking)> {
        let session = self
            .directory
            .cached_session(session_id)
            .ok_or_else(|| CoreError::SessionUnavailable(session_id.to_string()))?;

        if seats.is_empty() {
            return Err(CoreError::NoSeatsSelected);
        }

        let mut seen = HashSet::new();
        if let Some(dup) = seats.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(CoreError::DuplicateSeat(dup.clone()));
        }

        let available = session.max_selectable();
        if seats.len() > available as usize {
            return Err(CoreError::CapacityExceeded {
                requested: seats.len(),
                available,
            });
        }

        let request = NewBooking::new(session.id.clone(), customer, seats);
        Ok((session, request))
    }

    pub async fn create(
        &self,
        session_id: &SessionId,
        customer: Customer,
        seats: Vec<String>,
    ) -> CoreResult<CreatedBooking> {
        let (session, request) = self.validate(session_id, customer, seats)?;
        let quote = PriceQuote::estimate(session.price, request.selected_seats.len());

        let key = self
            .send_idempotency_key
            .then(|| Uuid::new_v4().to_string());
        info!(
            "Creating booking for session {} with {} seats (estimate {})",
            session.id, request.seat_count, quote.client_estimate
        );

        let booking = self
            .remote
            .create_booking(&request, key.as_deref())
            .await
            .map_err(|e| {
                warn!("Booking creation for session {} failed: {}", session.id, e);
                e
            })?;

        let stored = self.cache.upsert(booking).await;
        self.cache.focus_booking(&stored);
        info!("Booking {} created with code {}", stored.id, stored.code);

        Ok(CreatedBooking {
            quote: quote.settle(stored.server_total),
            booking: stored,
        })
    }

    pub async fn confirm(&self, id: &BookingId) -> CoreResult<Arc<Booking>> {
        let outcome = self.remote.confirm_booking(id).await;
        self.after_transition(id, "Confirm", outcome).await
    }

    pub async fn cancel(&self, id: &BookingId) -> CoreResult<Arc<Booking>> {
        let outcome = self.remote.cancel_booking(id).await;
        self.after_transition(id, "Cancel", outcome).await
    }

    /// The service owns the transition rules, so the record is re-read
    /// whether it accepted the request or not. A rejection is still
    /// returned to the caller.
    async fn after_transition(
        &self,
        id: &BookingId,
        action: &str,
        outcome: CoreResult<TransitionAck>,
    ) -> CoreResult<Arc<Booking>> {
        match outcome {
            Ok(ack) => {
                debug!("{} of booking {} acknowledged: {:?}", action, id, ack.status);
                self.fetch(id).await
            }
            Err(e) if e.is_missing() => Err(e),
            Err(e) => {
                warn!("{} of booking {} rejected: {}", action, id, e);
                if let Err(refresh) = self.fetch(id).await {
                    debug!("Booking {} could not be re-read: {}", id, refresh);
                }
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: &BookingId) -> CoreResult<()> {
        match self.remote.delete_booking(id).await {
            Ok(()) => {
                self.cache.evict(id).await;
                info!("Booking {} deleted", id);
                Ok(())
            }
            Err(e) if e.is_missing() => {
                self.cache.evict(id).await;
                Err(CoreError::NotFound(format!("booking {}", id)))
            }
            Err(e) => Err(e),
        }
    }

    /// Cached record first, then the service.
    pub async fn lookup_by_code(&self, code: &str) -> CoreResult<Arc<Booking>> {
        let code = parse_code(code)?;
        if let Some(hit) = self.cache.get_by_code(&code) {
            debug!("Booking code {} served from cache", code);
            return Ok(hit);
        }
        self.fetch_code(&code).await
    }

    /// Always asks the service.
    pub async fn fetch_by_code(&self, code: &str) -> CoreResult<Arc<Booking>> {
        let code = parse_code(code)?;
        self.fetch_code(&code).await
    }

    async fn fetch_code(&self, code: &ReservationCode) -> CoreResult<Arc<Booking>> {
        match self.remote.fetch_booking_by_code(code).await {
            Ok(booking) => Ok(self.cache.upsert(booking).await),
            Err(e) if e.is_missing() => {
                Err(CoreError::NotFound(format!("booking with code {}", code)))
            }
            Err(e) => Err(e),
        }
    }

    /// Service lookup of an id or a code. An all-digit key that names no
    /// booking id is tried again as a reservation code.
    pub async fn resolve(&self, key: &BookingKey) -> CoreResult<Arc<Booking>> {
        match key {
            BookingKey::Id(id) => match self.fetch(id).await {
                Err(e) if e.is_missing() => {
                    debug!("No booking {}, trying it as a code", id);
                    let code = ReservationCode::new(id.as_str());
                    self.fetch_code(&code)
                        .await
                        .map_err(|retry| if retry.is_missing() { e } else { retry })
                }
                found => found,
            },
            BookingKey::Code(code) => self.fetch_code(code).await,
        }
    }

    /// Like `resolve`, but answers from the cache when it can. A cached id
    /// wins over a cached code with the same digits.
    pub async fn lookup_key(&self, key: &BookingKey) -> CoreResult<Arc<Booking>> {
        let cached = match key {
            BookingKey::Id(id) => self
                .cache
                .get(id)
                .or_else(|| self.cache.get_by_code(&ReservationCode::new(id.as_str()))),
            BookingKey::Code(code) => self.cache.get_by_code(code),
        };
        match cached {
            Some(hit) => Ok(hit),
            None => self.resolve(key).await,
        }
    }

    pub async fn lookup(&self, id: &BookingId) -> CoreResult<Arc<Booking>> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit);
        }
        self.fetch(id).await
    }

    pub async fn fetch(&self, id: &BookingId) -> CoreResult<Arc<Booking>> {
        match self.remote.fetch_booking(id).await {
            Ok(booking) => Ok(self.cache.upsert(booking).await),
            Err(e) if e.is_missing() => Err(CoreError::NotFound(format!("booking {}", id))),
            Err(e) => Err(e),
        }
    }

    /// Booking, its session and the price for a ticket view.
    ///
    /// Any failure to resolve the booking is `BookingNotFound`; session
    /// failures are returned unchanged.
    pub async fn fetch_detail(&self, id_or_code: &str) -> CoreResult<BookingDetail> {
        let key = BookingKey::parse(id_or_code)?;
        let booking = self.resolve(&key).await.map_err(|e| {
            debug!("Ticket lookup for {} failed: {}", key, e);
            CoreError::BookingNotFound(key.to_string())
        })?;

        let session = self.directory.resolve_session(&booking.session).await?;
        let quote = PriceQuote::estimate(session.price, booking.selected_seats.len())
            .settle(booking.server_total);

        Ok(BookingDetail {
            booking,
            session,
            quote,
        })
    }

    /// Bookings of one session, cached in one batch.
    pub async fn fetch_session_bookings(
        &self,
        session_id: &SessionId,
    ) -> CoreResult<Vec<Arc<Booking>>> {
        let listed: Vec<Booking> = self
            .remote
            .list_bookings(Some(session_id))
            .await?
            .into_iter()
            .filter(|b| &b.session == session_id)
            .collect();
        let bookings = self.cache.upsert_many(listed).await;
        debug!("Session {} has {} bookings", session_id, bookings.len());
        Ok(bookings)
    }

    /// Fresh seat map and occupancy of a session. Bookings are only listed
    /// when the service did not report occupied seats itself.
    pub async fn load_inventory(
        &self,
        session_id: &SessionId,
        columns: u32,
    ) -> CoreResult<SessionInventory> {
        let session = self.directory.resolve_session(session_id).await?;
        let bookings: Vec<Booking> = if session.occupied_seats.is_some() {
            Vec::new()
        } else {
            self.fetch_session_bookings(session_id)
                .await?
                .iter()
                .map(|b| b.as_ref().clone())
                .collect()
        };
        Ok(SessionInventory::derive(&session, &bookings, columns))
    }
}

fn parse_code(raw: &str) -> CoreResult<ReservationCode> {
    ReservationCode::parse(raw).ok_or_else(|| CoreError::InvalidCode(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::mock::{fixtures, MockCinemaRemote};
    use marquee_core::BookingStatus;
    use marquee_store::{BookingCache, MemorySnapshotStore};

    struct Harness {
        remote: Arc<MockCinemaRemote>,
        store: Arc<MemorySnapshotStore>,
        manager: BookingManager,
    }

    async fn harness(available: u32) -> Harness {
        let remote = Arc::new(MockCinemaRemote::new());
        remote.add_movie(fixtures::movie(1, "Dune")).await;
        remote.add_session(fixtures::session(3, 20, available, "5.00")).await;
        let store = Arc::new(MemorySnapshotStore::new());
        let cache = Arc::new(BookingCache::new(store.clone()));
        let directory = Arc::new(SessionDirectory::new(remote.clone()));
        let manager = BookingManager::new(remote.clone(), directory, cache);
        Harness {
            remote,
            store,
            manager,
        }
    }

    fn ana() -> Customer {
        Customer::new("Ana", "ana@example.com")
    }

    fn seats(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    async fn create_pending(h: &Harness, code: &str) -> Arc<Booking> {
        let session = SessionId::from(3);
        h.manager.directory().resolve_session(&session).await.unwrap();
        h.remote.set_next_code(code).await;
        h.manager
            .create(&session, ana(), seats(&["A1", "A2"]))
            .await
            .unwrap()
            .booking
    }

    #[tokio::test]
    async fn test_create_caches_by_id_and_code() {
        let h = harness(20).await;
        let session = SessionId::from(3);
        h.manager.directory().resolve_session(&session).await.unwrap();
        h.remote.set_next_code("ABC123").await;

        let created = h
            .manager
            .create(&session, ana(), seats(&["A1", "A2"]))
            .await
            .unwrap();
        assert_eq!(created.booking.status, BookingStatus::Pending);
        assert_eq!(created.quote.client_estimate.to_string(), "10.00");
        assert_eq!(created.quote.displayed(), created.booking.server_total);

        let by_id = h.manager.cache().get(&created.booking.id).unwrap();
        let by_code = h
            .manager
            .cache()
            .get_by_code(&ReservationCode::new("ABC123"))
            .unwrap();
        assert_eq!(by_id, by_code);
        assert_eq!(h.manager.cache().focused().unwrap().id, created.booking.id);
    }

    #[tokio::test]
    async fn test_create_requires_a_loaded_session() {
        let h = harness(20).await;
        let err = h
            .manager
            .create(&SessionId::from(3), ana(), seats(&["A1"]))
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::SessionUnavailable("3".into()));
        assert!(h.remote.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_validation_runs_before_network() {
        let h = harness(20).await;
        let session = SessionId::from(3);
        h.manager.directory().resolve_session(&session).await.unwrap();
        let calls_before = h.remote.calls().await.len();

        let err = h.manager.create(&session, ana(), Vec::new()).await.unwrap_err();
        assert_eq!(err, CoreError::NoSeatsSelected);

        let err = h
            .manager
            .create(&session, ana(), seats(&["A1", "B2", "A1"]))
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::DuplicateSeat("A1".into()));

        assert_eq!(h.remote.calls().await.len(), calls_before);
    }

    #[tokio::test]
    async fn test_capacity_exceeded_creates_nothing() {
        let h = harness(1).await;
        let session = SessionId::from(3);
        h.manager.directory().resolve_session(&session).await.unwrap();

        let err = h
            .manager
            .create(&session, ana(), seats(&["A1", "A2"]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::CapacityExceeded {
                requested: 2,
                available: 1
            }
        );
        assert_eq!(h.remote.booking_count().await, 0);
        assert!(h.manager.cache().snapshot().is_empty());
        assert_eq!(h.store.save_count().await, 0);
    }

    #[tokio::test]
    async fn test_remote_rejection_leaves_cache_untouched() {
        let h = harness(20).await;
        let session = SessionId::from(3);
        h.manager.directory().resolve_session(&session).await.unwrap();
        h.remote.fail_next(500).await;

        let err = h
            .manager
            .create(&session, ana(), seats(&["A1"]))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(h.manager.cache().snapshot().is_empty());

        // A later attempt is not blocked.
        h.manager.create(&session, ana(), seats(&["A1"])).await.unwrap();
    }

    #[tokio::test]
    async fn test_confirm_then_cancel() {
        let h = harness(20).await;
        let booking = create_pending(&h, "ABC123").await;

        let confirmed = h.manager.confirm(&booking.id).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        let cancelled = h.manager.cancel(&booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(
            h.manager.cache().get(&booking.id).unwrap().status,
            BookingStatus::Cancelled
        );

        let calls = h.remote.calls().await;
        assert!(calls.ends_with(&[
            format!("POST /bookings/{}/cancel/", booking.id),
            format!("GET /bookings/{}/", booking.id),
        ]));
    }

    #[tokio::test]
    async fn test_illegal_transition_is_surfaced() {
        let h = harness(20).await;
        let booking = create_pending(&h, "ABC123").await;
        h.manager.cancel(&booking.id).await.unwrap();

        let err = h.manager.confirm(&booking.id).await.unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(
            h.manager.cache().get(&booking.id).unwrap().status,
            BookingStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_rejected_transition_refreshes_cache() {
        let h = harness(20).await;
        let booking = create_pending(&h, "ABC123").await;
        h.remote.cancel_booking(&booking.id).await.unwrap();
        assert_eq!(
            h.manager.cache().get(&booking.id).unwrap().status,
            BookingStatus::Pending
        );

        let err = h.manager.confirm(&booking.id).await.unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(
            h.manager.cache().get(&booking.id).unwrap().status,
            BookingStatus::Cancelled
        );
        let calls = h.remote.calls().await;
        assert!(calls.ends_with(&[
            format!("POST /bookings/{}/confirm/", booking.id),
            format!("GET /bookings/{}/", booking.id),
        ]));
    }

    #[tokio::test]
    async fn test_numeric_codes_resolve() {
        let h = harness(20).await;
        h.remote
            .add_booking(fixtures::booking(7, "483920", 3, &["A1"], BookingStatus::Pending))
            .await;

        let detail = h.manager.fetch_detail("483920").await.unwrap();
        assert_eq!(detail.booking.id, BookingId::from(7));
        assert!(h
            .manager
            .cache()
            .get_by_code(&ReservationCode::new("483920"))
            .is_some());

        let calls_before = h.remote.calls().await.len();
        let key = BookingKey::parse("483920").unwrap();
        let cached = h.manager.lookup_key(&key).await.unwrap();
        assert_eq!(cached.id, BookingId::from(7));
        assert_eq!(h.remote.calls().await.len(), calls_before);

        let err = h.manager.fetch_detail("999999").await.unwrap_err();
        assert_eq!(err, CoreError::BookingNotFound("#999999".into()));
    }

    #[tokio::test]
    async fn test_delete_evicts_and_maps_missing() {
        let h = harness(20).await;
        let booking = create_pending(&h, "ABC123").await;

        h.manager.delete(&booking.id).await.unwrap();
        assert!(h.manager.cache().get(&booking.id).is_none());
        assert!(h
            .manager
            .cache()
            .get_by_code(&ReservationCode::new("ABC123"))
            .is_none());

        let err = h.manager.delete(&booking.id).await.unwrap_err();
        assert_eq!(err, CoreError::NotFound(format!("booking {}", booking.id)));
    }

    #[tokio::test]
    async fn test_lookup_by_code_prefers_cache() {
        let h = harness(20).await;
        create_pending(&h, "ABC123").await;
        let calls_before = h.remote.calls().await.len();

        let hit = h.manager.lookup_by_code("  ABC123 ").await.unwrap();
        assert_eq!(hit.code.as_str(), "ABC123");
        assert_eq!(h.remote.calls().await.len(), calls_before);

        h.manager.fetch_by_code("ABC123").await.unwrap();
        assert_eq!(h.remote.calls().await.len(), calls_before + 1);
    }

    #[tokio::test]
    async fn test_lookup_by_code_fetches_on_miss() {
        let h = harness(20).await;
        h.remote
            .add_booking(fixtures::booking(9, "XYZ789", 3, &["C1"], BookingStatus::Confirmed))
            .await;

        let booking = h.manager.lookup_by_code("XYZ789").await.unwrap();
        assert_eq!(booking.id, BookingId::from(9));
        assert!(h.manager.cache().get(&BookingId::from(9)).is_some());
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found_without_phantom_entry() {
        let h = harness(20).await;
        let err = h.manager.lookup_by_code("ABC123").await.unwrap_err();
        assert_eq!(err, CoreError::NotFound("booking with code ABC123".into()));
        assert!(h.manager.cache().snapshot().is_empty());

        let err = h.manager.lookup_by_code("   ").await.unwrap_err();
        assert_eq!(err, CoreError::InvalidCode("   ".into()));
    }

    #[tokio::test]
    async fn test_lookup_by_id() {
        let h = harness(20).await;
        h.remote
            .add_booking(fixtures::booking(4, "QRS", 3, &["D1"], BookingStatus::Pending))
            .await;
        let id = BookingId::from(4);

        h.manager.lookup(&id).await.unwrap();
        let calls = h.remote.calls().await.len();
        h.manager.lookup(&id).await.unwrap();
        assert_eq!(h.remote.calls().await.len(), calls);

        let err = h.manager.fetch(&BookingId::from(40)).await.unwrap_err();
        assert!(err.is_missing());
    }

    #[tokio::test]
    async fn test_fetch_detail() {
        let h = harness(20).await;
        let booking = create_pending(&h, "ABC123").await;

        let by_code = h.manager.fetch_detail("ABC123").await.unwrap();
        assert_eq!(by_code.booking.id, booking.id);
        assert_eq!(by_code.session.id, SessionId::from(3));
        assert_eq!(by_code.quote.displayed().to_string(), "10.00");

        let by_id = h.manager.fetch_detail(booking.id.as_str()).await.unwrap();
        assert_eq!(by_id.booking.code.as_str(), "ABC123");

        let err = h.manager.fetch_detail("NOPE").await.unwrap_err();
        assert_eq!(err, CoreError::BookingNotFound("NOPE".into()));
    }

    #[tokio::test]
    async fn test_fetch_detail_propagates_session_failure() {
        let h = harness(20).await;
        h.remote
            .add_booking(fixtures::booking(5, "ORPHAN", 42, &["A1"], BookingStatus::Pending))
            .await;

        let err = h.manager.fetch_detail("ORPHAN").await.unwrap_err();
        assert_eq!(err, CoreError::NotFound("session 42".into()));
    }

    #[tokio::test]
    async fn test_session_bookings_feed_occupancy() {
        let h = harness(20).await;
        h.remote
            .add_booking(fixtures::booking(1, "A", 3, &["A1", "A2"], BookingStatus::Confirmed))
            .await;
        h.remote
            .add_booking(fixtures::booking(2, "B", 3, &["B1"], BookingStatus::Cancelled))
            .await;
        h.remote
            .add_booking(fixtures::booking(3, "C", 8, &["C1"], BookingStatus::Pending))
            .await;

        let listed = h
            .manager
            .fetch_session_bookings(&SessionId::from(3))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(h.manager.cache().snapshot().len(), 2);
        assert_eq!(h.store.save_count().await, 1);

        let inventory = h.manager.load_inventory(&SessionId::from(3), 10).await.unwrap();
        let occupied: Vec<&str> = inventory.occupied.iter().map(String::as_str).collect();
        assert_eq!(occupied, vec!["A1", "A2"]);
    }

    #[tokio::test]
    async fn test_persisted_cache_serves_codes_after_reload() {
        let h = harness(20).await;
        let booking = create_pending(&h, "ABC123").await;

        let reloaded = BookingCache::load(h.store.clone()).await.unwrap();
        let restored = reloaded
            .get_by_code(&ReservationCode::new("ABC123"))
            .unwrap();
        assert_eq!(restored.as_ref(), booking.as_ref());
    }
}
