use chrono::{DateTime, Utc};
use marquee_shared::{BookingId, Masked, Money, MovieId, ReservationCode, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_true() -> bool {
    true
}

/// A film in the programme. Read-only from the reservation core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "duracion", default)]
    pub duration_minutes: Option<u32>,
    #[serde(rename = "genero", default)]
    pub genre: Option<String>,
    #[serde(rename = "clasificacion", default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(rename = "activa", default = "default_true")]
    pub active: bool,
}

/// The owning movie of a session, either as a bare key or embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MovieRef {
    Embedded(Box<Movie>),
    Id(MovieId),
}

impl MovieRef {
    pub fn id(&self) -> &MovieId {
        match self {
            MovieRef::Embedded(movie) => &movie.id,
            MovieRef::Id(id) => id,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            MovieRef::Embedded(movie) => Some(&movie.title),
            MovieRef::Id(_) => None,
        }
    }
}

/// A scheduled screening with fixed capacity and a single price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(alias = "movie_id")]
    pub movie: MovieRef,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "hora")]
    pub time: String,
    #[serde(rename = "sala")]
    pub room: String,
    #[serde(rename = "precio")]
    pub price: Money,
    #[serde(rename = "asientos_totales")]
    pub total_seats: u32,
    #[serde(rename = "asientos_disponibles")]
    pub available_seats: u32,
    /// Present only when the service exposes occupancy directly.
    #[serde(
        rename = "asientos_ocupados",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub occupied_seats: Option<Vec<String>>,
}

impl Session {
    /// Upper bound on seats a single reservation attempt may add.
    pub fn max_selectable(&self) -> u32 {
        self.available_seats.min(self.total_seats)
    }

    pub fn is_sold_out(&self) -> bool {
        self.max_selectable() == 0
    }
}

/// Booking lifecycle.
///
/// `Pending → Confirmed`, `Pending → Cancelled`, `Confirmed → Cancelled`.
/// `Cancelled` is terminal. The reservation service decides whether a
/// transition is legal; this table is for presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    #[serde(rename = "pendiente", alias = "pending", alias = "PENDING")]
    Pending,
    #[serde(
        rename = "confirmada",
        alias = "confirmado",
        alias = "confirmed",
        alias = "CONFIRMED"
    )]
    Confirmed,
    #[serde(
        rename = "cancelada",
        alias = "cancelado",
        alias = "cancelled",
        alias = "canceled",
        alias = "CANCELLED"
    )]
    Cancelled,
}

impl BookingStatus {
    /// Pending and confirmed bookings hold their seats.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// A reservation as recorded by the reservation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    #[serde(rename = "codigo_reserva")]
    pub code: ReservationCode,
    pub session: SessionId,
    #[serde(rename = "nombre_cliente")]
    pub customer_name: String,
    #[serde(rename = "email_cliente")]
    pub customer_email: Masked<String>,
    #[serde(
        rename = "telefono_cliente",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_phone: Option<Masked<String>>,
    #[serde(rename = "asientos_seleccionados")]
    pub selected_seats: Vec<String>,
    #[serde(rename = "cantidad_asientos")]
    pub seat_count: u32,
    /// Authoritative total computed by the service.
    #[serde(rename = "precio_total")]
    pub server_total: Money,
    #[serde(rename = "estado")]
    pub status: BookingStatus,
    #[serde(rename = "creado_en")]
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn holds_seat(&self, label: &str) -> bool {
        self.selected_seats.iter().any(|s| s == label)
    }
}

/// Contact details captured by the booking form.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub name: String,
    pub email: Masked<String>,
    pub phone: Option<Masked<String>>,
}

impl Customer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: Masked(email.into()),
            phone: None,
        }
    }

    /// Blank phone numbers are dropped rather than sent as empty strings.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        let phone = phone.into();
        self.phone = if phone.trim().is_empty() {
            None
        } else {
            Some(Masked(phone))
        };
        self
    }
}

/// Body of `POST /bookings/`.
///
/// Only client-supplied fields exist here; price, status, code, creation
/// time and id are assigned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    pub session: SessionId,
    #[serde(rename = "nombre_cliente")]
    pub customer_name: String,
    #[serde(rename = "email_cliente")]
    pub customer_email: Masked<String>,
    #[serde(rename = "telefono_cliente", skip_serializing_if = "Option::is_none", default)]
    pub customer_phone: Option<Masked<String>>,
    #[serde(rename = "asientos_seleccionados")]
    pub selected_seats: Vec<String>,
    #[serde(rename = "cantidad_asientos")]
    pub seat_count: u32,
}

impl NewBooking {
    pub fn new(session: SessionId, customer: Customer, selected_seats: Vec<String>) -> Self {
        let seat_count = u32::try_from(selected_seats.len()).unwrap_or(u32::MAX);
        Self {
            session,
            customer_name: customer.name,
            customer_email: customer.email,
            customer_phone: customer.phone,
            selected_seats,
            seat_count,
        }
    }
}

/// Acknowledgement of `confirm`/`cancel`. Never trusted as the new state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionAck {
    #[serde(default)]
    pub status: Option<String>,
}
