//! Error types for configuration, the model manifest and provisioning.

use std::path::PathBuf;

/// Startup configuration errors. These are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid model base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// A manifest that breaks the "one flat file per entry" invariant.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest has no model groups")]
    Empty,

    #[error("model group {0:?} lists no files")]
    EmptyGroup(String),

    #[error("model group {group:?} has an invalid file name {file:?}")]
    InvalidFileName { group: String, file: String },
}

/// Failure to provision a single manifest file. Captured per file, never propagated
/// out of the provisioning pass.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("failed to build HTTP client: {0}")]
    CreateClient(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download from {url} failed: HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
