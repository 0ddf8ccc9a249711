use marquee_core::{Booking, Session};
use marquee_shared::{Money, SessionId};
use std::collections::BTreeSet;
use tracing::debug;

use crate::seat_map::SeatMap;

/// Seats currently held in `session`, limited to labels of `seat_map`.
///
/// An explicit occupied list on the session wins. Without one, the seats
/// of every active booking of the session are unioned; the caller must
/// have fetched those bookings already.
pub fn occupancy(session: &Session, bookings: &[Booking], seat_map: &SeatMap) -> BTreeSet<String> {
    let held: Vec<&String> = match &session.occupied_seats {
        Some(explicit) => explicit.iter().collect(),
        None => bookings
            .iter()
            .filter(|b| b.session == session.id && b.is_active())
            .flat_map(|b| b.selected_seats.iter())
            .collect(),
    };

    held.into_iter()
        .filter(|label| seat_map.contains(label))
        .cloned()
        .collect()
}

/// Seat map, occupancy and capacity of one session at the time of reading.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInventory {
    pub session_id: SessionId,
    pub price: Money,
    pub seat_map: SeatMap,
    pub occupied: BTreeSet<String>,
    pub total_seats: u32,
    pub available_seats: u32,
}

impl SessionInventory {
    pub fn derive(session: &Session, bookings: &[Booking], columns: u32) -> Self {
        let seat_map = SeatMap::generate(session.total_seats, columns);
        let occupied = occupancy(session, bookings, &seat_map);
        Self {
            session_id: session.id.clone(),
            price: session.price,
            seat_map,
            occupied,
            total_seats: session.total_seats,
            available_seats: session.available_seats,
        }
    }

    /// How many seats a single reservation attempt may add.
    pub fn max_selectable(&self) -> usize {
        self.available_seats.min(self.total_seats) as usize
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.available_seats.min(self.total_seats)
    }

    pub fn is_occupied(&self, label: &str) -> bool {
        self.occupied.contains(label)
    }

    pub fn is_selectable(&self, label: &str) -> bool {
        self.seat_map.contains(label) && !self.is_occupied(label)
    }

    pub fn free_seats(&self) -> impl Iterator<Item = &str> {
        self.seat_map.labels().filter(move |l| !self.occupied.contains(*l))
    }
}

/// Result of a toggle. Rejections are silent no-ops, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    RejectedOccupied,
    RejectedUnknown,
    RejectedLimit,
}

impl ToggleOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, ToggleOutcome::Added | ToggleOutcome::Removed)
    }
}

/// Seats picked by the patron, in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatSelection {
    seats: Vec<String>,
}

impl SeatSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or remove `label`.
    ///
    /// Occupied seats and seats outside the map are ignored; new seats are
    /// ignored once the selection holds `max_selectable` seats.
    pub fn toggle(&mut self, inventory: &SessionInventory, label: &str) -> ToggleOutcome {
        if inventory.is_occupied(label) {
            debug!("Ignoring toggle of occupied seat {}", label);
            return ToggleOutcome::RejectedOccupied;
        }
        if let Some(pos) = self.seats.iter().position(|s| s == label) {
            self.seats.remove(pos);
            return ToggleOutcome::Removed;
        }
        if !inventory.seat_map.contains(label) {
            debug!("Ignoring toggle of unknown seat {}", label);
            return ToggleOutcome::RejectedUnknown;
        }
        if self.seats.len() >= inventory.max_selectable() {
            debug!(
                "Selection limit of {} reached, ignoring {}",
                inventory.max_selectable(),
                label
            );
            return ToggleOutcome::RejectedLimit;
        }
        self.seats.push(label.to_string());
        ToggleOutcome::Added
    }

    /// Re-apply the rules after the inventory was refreshed: seats that are
    /// now occupied or gone are dropped, then the tail is trimmed to the
    /// new maximum. Returns the dropped seats.
    pub fn rebase(&mut self, inventory: &SessionInventory) -> Vec<String> {
        let mut dropped = Vec::new();
        self.seats.retain(|seat| {
            let keep = inventory.is_selectable(seat);
            if !keep {
                dropped.push(seat.clone());
            }
            keep
        });
        let max = inventory.max_selectable();
        if self.seats.len() > max {
            dropped.extend(self.seats.drain(max..));
        }
        dropped
    }

    pub fn seats(&self) -> &[String] {
        &self.seats
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.seats.iter().any(|s| s == label)
    }

    pub fn clear(&mut self) {
        self.seats.clear();
    }

    /// Optimistic total shown before the service answers. Never sent.
    pub fn estimated_total(&self, price: Money) -> Money {
        price.times(self.seats.len() as u32)
    }

    pub fn into_seats(self) -> Vec<String> {
        self.seats
    }
}
