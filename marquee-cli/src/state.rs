use marquee_catalog::SessionDirectory;
use marquee_core::{BookingRemote, SessionRemote};
use marquee_order::BookingManager;
use marquee_store::{snapshot, BookingCache, Config, HttpRemote, SnapshotStore, StoreError};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<BookingManager>,
    pub directory: Arc<SessionDirectory>,
    pub cache: Arc<BookingCache>,
    pub columns: u32,
}

impl AppState {
    pub async fn build(config: &Config) -> Result<Self, StoreError> {
        let remote = Arc::new(HttpRemote::from_config(&config.remote)?);
        info!("Using reservation service at {}", remote.base_url());
        let store = snapshot::from_config(&config.cache)?;
        Self::from_parts(
            remote,
            store,
            config.seat_map.columns,
            config.booking.send_idempotency_key,
        )
        .await
    }

    /// Wire one remote into both the directory and the manager.
    ///
    /// An unreadable snapshot is moved aside and the cache starts empty; if
    /// it cannot be moved, startup fails rather than overwrite it.
    pub async fn from_parts<R>(
        remote: Arc<R>,
        store: Arc<dyn SnapshotStore>,
        columns: u32,
        send_idempotency_key: bool,
    ) -> Result<Self, StoreError>
    where
        R: SessionRemote + BookingRemote + 'static,
    {
        let cache = match BookingCache::load(store.clone()).await {
            Ok(cache) => cache,
            Err(e) => {
                let moved = store.set_aside().await?;
                warn!("Unreadable booking snapshot ({}) moved to {}", e, moved);
                BookingCache::new(store)
            }
        };
        let cache = Arc::new(cache);
        let directory = Arc::new(SessionDirectory::new(remote.clone()));
        let manager = BookingManager::new(remote, directory.clone(), cache.clone())
            .with_idempotency_keys(send_idempotency_key);

        Ok(Self {
            manager: Arc::new(manager),
            directory,
            cache,
            columns,
        })
    }
}
