use marquee_core::Booking;
use marquee_shared::{BookingId, ReservationCode};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::snapshot::SnapshotStore;

/// The only ways the cached collection changes.
#[derive(Debug, Clone)]
pub enum CacheMutation {
    Upsert(Booking),
    UpsertMany(Vec<Booking>),
    Evict(BookingId),
    Clear,
}

/// Immutable view of the cache. Cloning is cheap.
///
/// Records are held once, by id; the code index points at ids, so a
/// lookup by code and a lookup by id always yield the same record.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    by_id: Arc<BTreeMap<BookingId, Arc<Booking>>>,
    by_code: Arc<HashMap<ReservationCode, BookingId>>,
}

impl CacheSnapshot {
    fn from_records(by_id: BTreeMap<BookingId, Arc<Booking>>) -> Self {
        let by_code = by_id
            .values()
            .map(|b| (b.code.clone(), b.id.clone()))
            .collect();
        Self {
            by_id: Arc::new(by_id),
            by_code: Arc::new(by_code),
        }
    }

    pub fn from_bookings(bookings: Vec<Booking>) -> Self {
        Self::from_records(
            bookings
                .into_iter()
                .map(|b| (b.id.clone(), Arc::new(b)))
                .collect(),
        )
    }

    fn upsert_all(&self, bookings: impl IntoIterator<Item = Booking>) -> Self {
        let mut by_id = (*self.by_id).clone();
        let mut by_code = (*self.by_code).clone();
        for booking in bookings {
            if let Some(previous) = by_code.get(&booking.code) {
                if previous != &booking.id {
                    debug!(
                        "Code {} moved from booking {} to {}",
                        booking.code, previous, booking.id
                    );
                    by_id.remove(previous);
                }
            }
            if let Some(old) = by_id.get(&booking.id) {
                by_code.remove(&old.code);
            }
            by_code.insert(booking.code.clone(), booking.id.clone());
            by_id.insert(booking.id.clone(), Arc::new(booking));
        }
        Self::from_records(by_id)
    }

    fn apply(&self, mutation: CacheMutation) -> Self {
        match mutation {
            CacheMutation::Upsert(booking) => self.upsert_all([booking]),
            CacheMutation::UpsertMany(bookings) => self.upsert_all(bookings),
            CacheMutation::Evict(id) => {
                if !self.by_id.contains_key(&id) {
                    return self.clone();
                }
                let mut by_id = (*self.by_id).clone();
                by_id.remove(&id);
                Self::from_records(by_id)
            }
            CacheMutation::Clear => Self::default(),
        }
    }

    pub fn get(&self, id: &BookingId) -> Option<Arc<Booking>> {
        self.by_id.get(id).cloned()
    }

    pub fn get_by_code(&self, code: &ReservationCode) -> Option<Arc<Booking>> {
        self.by_code.get(code).and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn bookings(&self) -> impl Iterator<Item = &Booking> {
        self.by_id.values().map(|b| b.as_ref())
    }

    pub fn to_records(&self) -> Vec<Booking> {
        self.bookings().cloned().collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Focus {
    pub booking: Option<BookingId>,
    pub code: Option<ReservationCode>,
}

/// Locally known bookings, addressable by id and by reservation code.
///
/// Mutations pass through one async gate so snapshots reach the store in
/// the order they were made. A failed save is logged; memory keeps the
/// new state.
pub struct BookingCache {
    current: RwLock<CacheSnapshot>,
    writer: Mutex<()>,
    store: Arc<dyn SnapshotStore>,
    focus: RwLock<Focus>,
}

impl BookingCache {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            current: RwLock::new(CacheSnapshot::default()),
            writer: Mutex::new(()),
            store,
            focus: RwLock::new(Focus::default()),
        }
    }

    /// Restore the persisted collection; the code index is rebuilt from it.
    pub async fn load(store: Arc<dyn SnapshotStore>) -> Result<Self, StoreError> {
        let bookings = store.load().await?.unwrap_or_default();
        info!("Booking cache restored with {} records", bookings.len());
        let cache = Self::new(store);
        *cache.current.write().unwrap_or_else(|p| p.into_inner()) =
            CacheSnapshot::from_bookings(bookings);
        Ok(cache)
    }

    pub async fn apply(&self, mutation: CacheMutation) -> CacheSnapshot {
        let _gate = self.writer.lock().await;

        let clearing = matches!(mutation, CacheMutation::Clear);
        let next = self.snapshot().apply(mutation);
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = next.clone();

        let persisted = if clearing {
            self.store.clear().await
        } else {
            self.store.save(&next.to_records()).await
        };
        if let Err(e) = persisted {
            warn!("Failed to persist booking cache: {}", e);
        }
        next
    }

    /// Insert or replace; returns the stored record.
    pub async fn upsert(&self, booking: Booking) -> Arc<Booking> {
        let id = booking.id.clone();
        let snapshot = self.apply(CacheMutation::Upsert(booking.clone())).await;
        snapshot.get(&id).unwrap_or_else(|| Arc::new(booking))
    }

    /// Insert or replace a batch with a single persist; returns the stored
    /// records in input order.
    pub async fn upsert_many(&self, bookings: Vec<Booking>) -> Vec<Arc<Booking>> {
        let snapshot = self
            .apply(CacheMutation::UpsertMany(bookings.clone()))
            .await;
        bookings
            .into_iter()
            .map(|b| snapshot.get(&b.id).unwrap_or_else(|| Arc::new(b)))
            .collect()
    }

    pub async fn evict(&self, id: &BookingId) {
        self.apply(CacheMutation::Evict(id.clone())).await;
    }

    pub async fn clear(&self) {
        self.apply(CacheMutation::Clear).await;
        self.reset_focus();
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn get(&self, id: &BookingId) -> Option<Arc<Booking>> {
        self.snapshot().get(id)
    }

    pub fn get_by_code(&self, code: &ReservationCode) -> Option<Arc<Booking>> {
        self.snapshot().get_by_code(code)
    }

    pub fn focus_booking(&self, booking: &Booking) {
        let mut focus = self.focus.write().unwrap_or_else(|p| p.into_inner());
        focus.booking = Some(booking.id.clone());
        focus.code = Some(booking.code.clone());
    }

    pub fn focus(&self) -> Focus {
        self.focus.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// The focused booking, if it is still cached.
    pub fn focused(&self) -> Option<Arc<Booking>> {
        let focus = self.focus();
        focus.booking.and_then(|id| self.get(&id))
    }

    pub fn reset_focus(&self) {
        *self.focus.write().unwrap_or_else(|p| p.into_inner()) = Focus::default();
    }
}
