use marquee_catalog::{SeatSelection, SessionInventory};
use marquee_core::{Booking, Movie, Session};
use marquee_order::{BookingDetail, CreatedBooking};
use marquee_store::CacheSnapshot;
use std::fmt::Write;

const FREE: char = '.';
const TAKEN: char = 'x';
const PICKED: char = '*';

pub fn movies(movies: &[Movie]) -> String {
    let showing: Vec<&Movie> = movies.iter().filter(|m| m.active).collect();
    if showing.is_empty() {
        return "No movies on the programme.\n".to_string();
    }
    let mut out = String::new();
    for movie in showing {
        let _ = write!(out, "{:>4}  {}", movie.id, movie.title);
        if let Some(minutes) = movie.duration_minutes {
            let _ = write!(out, " ({} min)", minutes);
        }
        if let Some(genre) = &movie.genre {
            let _ = write!(out, " [{}]", genre);
        }
        out.push('\n');
    }
    out
}

pub fn sessions(sessions: &[Session]) -> String {
    if sessions.is_empty() {
        return "No sessions scheduled.\n".to_string();
    }
    let mut out = String::new();
    for s in sessions {
        let availability = if s.is_sold_out() {
            "sold out".to_string()
        } else {
            format!("{}/{} free", s.available_seats, s.total_seats)
        };
        let mut line = format!(
            "{:>4}  {} {}  room {}  {}  {}",
            s.id, s.date, s.time, s.room, s.price, availability
        );
        if let Some(title) = s.movie.title() {
            line.push_str("  ");
            line.push_str(title);
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Grid of the room: `.` free, `x` taken, `*` in the current selection.
pub fn seat_map(inventory: &SessionInventory, selection: Option<&SeatSelection>) -> String {
    let mut out = String::new();
    if inventory.seat_map.is_empty() {
        out.push_str("This session has no seats.\n");
        return out;
    }

    let _ = write!(out, "   ");
    for col in 1..=inventory.seat_map.columns() {
        let _ = write!(out, "{:>3}", col);
    }
    out.push('\n');

    for (index, row) in inventory.seat_map.rows().iter().enumerate() {
        let _ = write!(out, "{:<3}", marquee_catalog::seat_map::row_label(index));
        for label in row {
            let mark = if inventory.is_occupied(label) {
                TAKEN
            } else if selection.map(|s| s.contains(label)).unwrap_or(false) {
                PICKED
            } else {
                FREE
            };
            let _ = write!(out, "{:>3}", mark);
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "{} free of {}, up to {} per booking, {} each",
        inventory.free_seats().count(),
        inventory.seat_map.len(),
        inventory.max_selectable(),
        inventory.price
    );
    out
}

pub fn booking(booking: &Booking) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Booking #{}  code {}", booking.id, booking.code);
    let _ = writeln!(out, "  status   {}", booking.status);
    let _ = writeln!(out, "  session  {}", booking.session);
    let _ = writeln!(out, "  seats    {}", booking.selected_seats.join(", "));
    let _ = writeln!(
        out,
        "  name     {} <{}>",
        booking.customer_name,
        booking.customer_email.hint()
    );
    let _ = writeln!(out, "  total    {}", booking.server_total);
    out
}

pub fn created(created: &CreatedBooking) -> String {
    let mut out = booking(&created.booking);
    if let Some(drift) = created.quote.drift_cents().filter(|d| *d != 0) {
        let _ = writeln!(
            out,
            "  note     estimated {} but the service charged {} ({:+} cents)",
            created.quote.client_estimate,
            created.quote.displayed(),
            drift
        );
    }
    let _ = writeln!(out, "Keep your code {} to find this booking later.", created.booking.code);
    out
}

pub fn ticket(detail: &BookingDetail) -> String {
    let session = &detail.session;
    let mut out = String::new();
    let _ = writeln!(out, "=== TICKET {} ===", detail.booking.code);
    if let Some(title) = session.movie.title() {
        let _ = writeln!(out, "{}", title);
    }
    let _ = writeln!(out, "{} {}  room {}", session.date, session.time, session.room);
    let _ = writeln!(out, "Seats: {}", detail.booking.selected_seats.join(", "));
    let _ = writeln!(out, "Holder: {}", detail.booking.customer_name);
    let _ = writeln!(out, "Status: {}", detail.booking.status);
    let _ = writeln!(out, "Total: {}", detail.quote.displayed());
    out
}

pub fn cache(snapshot: &CacheSnapshot) -> String {
    if snapshot.is_empty() {
        return "No bookings stored locally.\n".to_string();
    }
    let mut out = String::new();
    for b in snapshot.bookings() {
        let _ = writeln!(
            out,
            "{:>4}  {}  {:<9}  session {}  seats {}",
            b.id,
            b.code,
            b.status.to_string(),
            b.session,
            b.selected_seats.join(",")
        );
    }
    out
}
