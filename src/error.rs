use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("package name is required")]
    MissingPackageName,

    #[error("package version is required")]
    MissingPackageVersion,

    #[error("a GitHub owner is required for the github registry")]
    MissingGitHubOwner,

    #[error("Invalid config payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to prepare state directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid pending update record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("State store lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to spawn check runner {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to locate current executable: {0}")]
    CurrentExe(std::io::Error),

    #[error(transparent)]
    Payload(#[from] ConfigError),
}
