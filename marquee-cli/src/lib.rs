pub mod commands;
pub mod error;
pub mod render;
pub mod state;

pub use commands::{execute, CacheAction, Cli, Commands};
pub use error::CliError;
pub use state::AppState;
