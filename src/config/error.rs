use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("At least one job class is required")]
    NoJobClasses,
    #[error("Job class `{0}` must have at least one user")]
    ZeroUsers(String),
    #[error("Unknown job class `{0}`")]
    UnknownJobClass(String),
    #[error("Spawn rate must be greater than zero")]
    ZeroSpawnRate,
    #[error("Host must not be empty")]
    EmptyHost,
}
