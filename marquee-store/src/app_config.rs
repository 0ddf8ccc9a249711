use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub seat_map: SeatMapConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    File,
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub path: PathBuf,
    pub redis_url: Option<String>,
    pub redis_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeatMapConfig {
    pub columns: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Attach a fresh `Idempotency-Key` header to every create.
    pub send_idempotency_key: bool,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Layer `<dir>/default`, `<dir>/{RUN_MODE}`, `<dir>/local` and
    /// `MARQUEE__*` variables over built-in defaults. Every file is optional.
    pub fn load_from(dir: &str) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .set_default("remote.base_url", DEFAULT_BASE_URL)?
            .set_default("remote.timeout_seconds", 15_i64)?
            .set_default("cache.backend", "file")?
            .set_default("cache.path", ".marquee/bookings.json")?
            .set_default("cache.redis_key", "marquee:bookings")?
            .set_default("seat_map.columns", 10_i64)?
            .set_default("booking.send_idempotency_key", false)?
            .add_source(config::File::with_name(&format!("{}/default", dir)).required(false))
            .add_source(config::File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name(&format!("{}/local", dir)).required(false))
            // e.g. MARQUEE__REMOTE__BASE_URL
            .add_source(
                config::Environment::with_prefix("MARQUEE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
