#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}
