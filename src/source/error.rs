use thiserror::Error;

use crate::inventory::InventoryError;

/// Every failure aborts the whole inventory load.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Missing or invalid settings, or an endpoint answering with an error status
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The endpoint answered, but not with usable inventory JSON
    #[error("parse error: {0}")]
    Parse(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid plugin configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

pub type Result<T> = std::result::Result<T, SourceError>;
