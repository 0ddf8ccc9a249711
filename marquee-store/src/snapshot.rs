use async_trait::async_trait;
use marquee_core::Booking;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::app_config::{CacheBackend, CacheConfig};
use crate::error::StoreError;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    bookings: Vec<Booking>,
}

pub fn encode(bookings: &[Booking]) -> Result<String, StoreError> {
    let document = SnapshotDocument {
        version: SNAPSHOT_VERSION,
        bookings: bookings.to_vec(),
    };
    Ok(serde_json::to_string(&document)?)
}

pub fn decode(raw: &str) -> Result<Vec<Booking>, StoreError> {
    let document: SnapshotDocument = serde_json::from_str(raw)?;
    if document.version != SNAPSHOT_VERSION {
        return Err(StoreError::UnsupportedVersion(document.version));
    }
    Ok(document.bookings)
}

/// Durable home of the booking collection of one profile.
///
/// Only the id-indexed records are stored; indexes are rebuilt on load.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// `None` when nothing was ever saved.
    async fn load(&self) -> Result<Option<Vec<Booking>>, StoreError>;

    async fn save(&self, bookings: &[Booking]) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    /// Move an unreadable document out of the way so the next save cannot
    /// overwrite it. Returns where it went.
    async fn set_aside(&self) -> Result<String, StoreError>;
}

/// Build the store selected by `cache.backend`.
pub fn from_config(cache: &CacheConfig) -> Result<Arc<dyn SnapshotStore>, StoreError> {
    let store: Arc<dyn SnapshotStore> = match cache.backend {
        CacheBackend::File => Arc::new(FileSnapshotStore::new(cache.path.clone())),
        CacheBackend::Redis => {
            let url = cache.redis_url.as_deref().ok_or_else(|| {
                config::ConfigError::NotFound("cache.redis_url".to_string())
            })?;
            Arc::new(RedisSnapshotStore::new(url, cache.redis_key.clone())?)
        }
        CacheBackend::Memory => Arc::new(MemorySnapshotStore::new()),
    };
    Ok(store)
}

/// JSON file replaced atomically through a sibling temp file.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "bookings.json".into());
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    pub fn backup_path(&self) -> PathBuf {
        self.sibling(".bak")
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Option<Vec<Booking>>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let bookings = decode(&raw)?;
                info!("Loaded {} bookings from {}", bookings.len(), self.path.display());
                Ok(Some(bookings))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, bookings: &[Booking]) -> Result<(), StoreError> {
        let raw = encode(bookings)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, raw).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!("Saved {} bookings to {}", bookings.len(), self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_aside(&self) -> Result<String, StoreError> {
        let backup = self.backup_path();
        tokio::fs::rename(&self.path, &backup).await?;
        warn!("Moved {} to {}", self.path.display(), backup.display());
        Ok(backup.display().to_string())
    }
}

/// Snapshot kept under a single Redis string key.
#[derive(Clone)]
pub struct RedisSnapshotStore {
    client: redis::Client,
    key: String,
}

impl RedisSnapshotStore {
    pub fn new(connection_string: &str, key: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self {
            client,
            key: key.into(),
        })
    }
}

#[async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn load(&self) -> Result<Option<Vec<Booking>>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(self.key.as_str()).await?;
        raw.map(|r| decode(&r)).transpose()
    }

    async fn save(&self, bookings: &[Booking]) -> Result<(), StoreError> {
        let raw = encode(bookings)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(self.key.as_str(), raw).await?;
        debug!("Saved {} bookings to redis key {}", bookings.len(), self.key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(self.key.as_str()).await?;
        Ok(())
    }

    async fn set_aside(&self) -> Result<String, StoreError> {
        let backup = format!("{}.bak", self.key);
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.rename::<_, _, ()>(self.key.as_str(), backup.as_str()).await?;
        warn!("Moved redis key {} to {}", self.key, backup);
        Ok(backup)
    }
}

/// Keeps the encoded document in memory. Nothing survives the process.
#[derive(Default)]
pub struct MemorySnapshotStore {
    raw: Mutex<Option<String>>,
    backup: Mutex<Option<String>>,
    saves: Mutex<usize>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn raw(&self) -> Option<String> {
        self.raw.lock().await.clone()
    }

    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }

    /// Store a document as-is, readable or not.
    pub async fn put_raw(&self, raw: impl Into<String>) {
        *self.raw.lock().await = Some(raw.into());
    }

    pub async fn backup(&self) -> Option<String> {
        self.backup.lock().await.clone()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<Vec<Booking>>, StoreError> {
        self.raw.lock().await.as_deref().map(decode).transpose()
    }

    async fn save(&self, bookings: &[Booking]) -> Result<(), StoreError> {
        let raw = encode(bookings)?;
        *self.raw.lock().await = Some(raw);
        *self.saves.lock().await += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.raw.lock().await = None;
        Ok(())
    }

    async fn set_aside(&self) -> Result<String, StoreError> {
        let raw = self.raw.lock().await.take();
        *self.backup.lock().await = raw;
        Ok("memory backup".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::mock::fixtures;
    use marquee_core::BookingStatus;

    fn bookings() -> Vec<Booking> {
        vec![
            fixtures::booking(1, "ABC123", 3, &["A1", "A2"], BookingStatus::Pending),
            fixtures::booking(2, "XYZ789", 3, &["B4"], BookingStatus::Confirmed),
        ]
    }

    #[test]
    fn test_document_is_versioned() {
        let raw = encode(&bookings()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["bookings"].as_array().unwrap().len(), 2);
        assert_eq!(value["bookings"][0]["codigo_reserva"], "ABC123");
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let err = decode(r#"{"version":2,"bookings":[]}"#).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion(2)));
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("nested").join("bookings.json"));

        let saved = bookings();
        assert!(store.load().await.unwrap().is_none());
        store.save(&saved).await.unwrap();
        assert!(!store.temp_path().exists());

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, saved);

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookings.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileSnapshotStore::new(path);
        assert!(matches!(store.load().await, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_set_aside_keeps_the_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookings.json");
        let unreadable = r#"{"version":2,"bookings":[]}"#;
        std::fs::write(&path, unreadable).unwrap();
        let store = FileSnapshotStore::new(path.clone());
        assert!(matches!(store.load().await, Err(StoreError::UnsupportedVersion(2))));

        let moved = store.set_aside().await.unwrap();
        assert_eq!(moved, store.backup_path().display().to_string());
        assert!(store.load().await.unwrap().is_none());

        store.save(&bookings()).await.unwrap();
        assert_eq!(std::fs::read_to_string(store.backup_path()).unwrap(), unreadable);
    }

    #[test]
    fn test_redis_backend_needs_a_url() {
        let cache = CacheConfig {
            backend: CacheBackend::Redis,
            path: PathBuf::from("unused.json"),
            redis_url: None,
            redis_key: "marquee:bookings".into(),
        };
        assert!(matches!(from_config(&cache), Err(StoreError::Config(_))));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().await.unwrap().is_none());
        store.save(&bookings()).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().len(), 2);
        assert_eq!(store.save_count().await, 1);
        store.clear().await.unwrap();
        assert!(store.raw().await.is_none());

        store.put_raw("not json").await;
        assert!(store.load().await.is_err());
        store.set_aside().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        assert_eq!(store.backup().await.as_deref(), Some("not json"));
    }
}
