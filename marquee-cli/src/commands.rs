use clap::{Parser, Subcommand};
use marquee_catalog::{SeatSelection, ToggleOutcome};
use marquee_core::{CoreError, Customer};
use marquee_order::{BookingKey, Relevance, ViewScope};
use marquee_shared::{BookingId, MovieId, SessionId};
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::CliError;
use crate::render;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "marquee")]
#[command(about = "Browse cinema sessions, pick seats and manage reservations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default/{RUN_MODE}/local configuration files
    #[arg(long, default_value = "config")]
    pub config_dir: PathBuf,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// List the movies on the programme
    Movies,
    /// List sessions, optionally for one movie
    Sessions {
        #[arg(long)]
        movie: Option<String>,
    },
    /// Show the seat map of a session
    Seats { session: String },
    /// Reserve seats in a session
    Book {
        session: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        /// Seat label, repeatable or comma separated (e.g. --seat A1,A2)
        #[arg(long = "seat", required = true, value_delimiter = ',')]
        seats: Vec<String>,
    },
    /// Confirm a pending booking (id or reservation code)
    Confirm { booking: String },
    /// Cancel a booking (id or reservation code)
    Cancel { booking: String },
    /// Delete a booking (id or reservation code)
    Delete { booking: String },
    /// Show the ticket of a booking (id or reservation code)
    Ticket { booking: String },
    /// Inspect or reset locally stored bookings
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    List,
    Clear,
}

/// Run one command and return what should be printed.
pub async fn execute(command: Commands, state: &AppState) -> Result<String, CliError> {
    match command {
        Commands::Movies => {
            let movies = state.directory.list_movies().await?;
            Ok(render::movies(&movies))
        }
        Commands::Sessions { movie } => {
            let movie = movie.map(MovieId::new);
            let sessions = state.directory.refresh_sessions(movie.as_ref()).await?;
            Ok(render::sessions(&sessions))
        }
        Commands::Seats { session } => {
            let id = SessionId::new(session.trim());
            let manager = state.manager.clone();
            let columns = state.columns;
            let inventory = until_interrupted(|relevance| async move {
                relevance.settle(manager.load_inventory(&id, columns)).await
            })
            .await??;
            state.directory.select_session(inventory.session_id.clone());
            Ok(render::seat_map(&inventory, None))
        }
        Commands::Book {
            session,
            name,
            email,
            phone,
            seats,
        } => book(state, session, name, email, phone, seats).await,
        Commands::Confirm { booking } => {
            let id = resolve_id(state, &booking).await?;
            let updated = state.manager.confirm(&id).await?;
            Ok(render::booking(&updated))
        }
        Commands::Cancel { booking } => {
            let id = resolve_id(state, &booking).await?;
            let updated = state.manager.cancel(&id).await?;
            Ok(render::booking(&updated))
        }
        Commands::Delete { booking } => {
            let id = resolve_id(state, &booking).await?;
            state.manager.delete(&id).await?;
            Ok(format!("Booking #{} deleted.\n", id))
        }
        Commands::Ticket { booking } => {
            let manager = state.manager.clone();
            let detail = until_interrupted(|relevance| async move {
                relevance.settle(manager.fetch_detail(&booking)).await
            })
            .await??;
            state.cache.focus_booking(&detail.booking);
            Ok(render::ticket(&detail))
        }
        Commands::Cache { action } => match action {
            CacheAction::List => Ok(render::cache(&state.cache.snapshot())),
            CacheAction::Clear => {
                let dropped = state.cache.snapshot().len();
                state.cache.clear().await;
                state.directory.clear_selection();
                Ok(format!("Removed {} stored bookings.\n", dropped))
            }
        },
    }
}

async fn book(
    state: &AppState,
    session: String,
    name: String,
    email: String,
    phone: Option<String>,
    seats: Vec<String>,
) -> Result<String, CliError> {
    let session_id = SessionId::new(session.trim());
    let inventory = state
        .manager
        .load_inventory(&session_id, state.columns)
        .await?;

    let mut selection = SeatSelection::new();
    for seat in seats.iter().map(|s| s.trim().to_uppercase()) {
        match selection.toggle(&inventory, &seat) {
            ToggleOutcome::Added => {}
            ToggleOutcome::Removed => return Err(CoreError::DuplicateSeat(seat).into()),
            ToggleOutcome::RejectedOccupied => {
                return Err(CliError::Usage(format!("Seat {} is already taken", seat)))
            }
            ToggleOutcome::RejectedUnknown => {
                return Err(CliError::Usage(format!(
                    "Seat {} does not exist in this room",
                    seat
                )))
            }
            ToggleOutcome::RejectedLimit => {
                return Err(CoreError::CapacityExceeded {
                    requested: seats.len(),
                    available: inventory.remaining_capacity(),
                }
                .into())
            }
        }
    }
    debug!(
        "Selected {:?}, estimated {}",
        selection.seats(),
        selection.estimated_total(inventory.price)
    );

    let mut customer = Customer::new(name, email);
    if let Some(phone) = phone {
        customer = customer.with_phone(phone);
    }

    let created = state
        .manager
        .create(&session_id, customer, selection.into_seats())
        .await?;
    info!("Reserved booking {}", created.booking.id);
    Ok(render::created(&created))
}

/// Booking id from either an id or a reservation code.
async fn resolve_id(state: &AppState, input: &str) -> Result<BookingId, CliError> {
    let key = BookingKey::parse(input)?;
    let booking = state.manager.lookup_key(&key).await?;
    Ok(booking.id.clone())
}

/// Run `work` in the background and stop waiting for it on Ctrl-C.
///
/// The view scope is dropped on interrupt, so a result arriving later is
/// discarded instead of being rendered.
async fn until_interrupted<T, F, Fut>(work: F) -> Result<Result<T, CoreError>, CliError>
where
    T: Send + 'static,
    F: FnOnce(Relevance) -> Fut,
    Fut: Future<Output = Option<Result<T, CoreError>>> + Send + 'static,
{
    let scope = ViewScope::new();
    let task = tokio::spawn(work(scope.relevance()));

    tokio::select! {
        joined = task => match joined {
            Ok(Some(result)) => Ok(result),
            Ok(None) => Err(CliError::Interrupted),
            Err(e) => Err(CliError::Usage(format!("Background task failed: {}", e))),
        },
        _ = tokio::signal::ctrl_c() => {
            drop(scope);
            Err(CliError::Interrupted)
        }
    }
}
