pub mod seat_map;
pub mod inventory;
pub mod directory;

pub use seat_map::SeatMap;
pub use inventory::{occupancy, SeatSelection, SessionInventory, ToggleOutcome};
pub use directory::SessionDirectory;
