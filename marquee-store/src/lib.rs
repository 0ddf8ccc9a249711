pub mod app_config;
pub mod booking_cache;
pub mod error;
pub mod http_remote;
pub mod snapshot;

pub use app_config::{CacheBackend, Config};
pub use booking_cache::{BookingCache, CacheMutation, CacheSnapshot};
pub use error::StoreError;
pub use http_remote::HttpRemote;
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, RedisSnapshotStore, SnapshotStore};
