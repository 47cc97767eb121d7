/// Error types shared across the crate
///
/// Icon acquisition failures are per-item and never escape the scheduler;
/// they collapse into the not-found visual state. The remaining errors are
/// surfaced to callers that load configuration or catalogs.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while resolving or fetching an item icon
#[derive(Debug, Clone, Error)]
pub enum IconError {
    /// The identity has no catalog entry
    #[error("no catalog entry for {0}")]
    NotFound(String),

    /// Transport, decode or timeout failure
    #[error("icon fetch failed: {0}")]
    FetchFailed(String),

    /// The compositing job could not run to completion
    #[error("icon processing failed: {0}")]
    Processing(String),
}

impl From<reqwest::Error> for IconError {
    fn from(err: reqwest::Error) -> Self {
        IconError::FetchFailed(err.to_string())
    }
}

impl From<image::ImageError> for IconError {
    fn from(err: image::ImageError) -> Self {
        IconError::FetchFailed(format!("decode: {}", err))
    }
}

/// Unrecognised rarity or paint name in an item bundle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown rarity: {0:?}")]
    Rarity(String),

    #[error("unknown paint color: {0:?}")]
    Paint(String),
}

/// Failure while loading the icon catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failure while reading or writing the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine config directory")]
    NoConfigDir,
}
