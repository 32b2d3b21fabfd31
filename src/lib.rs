//! Web server for the browser-side face recognition demo.
//!
//! On startup the face-api.js weight files are provisioned into a local
//! directory, then the landing page, the weights, the static assets and a
//! status endpoint are served over HTTP.

pub mod config;
pub mod error;
pub mod manifest;
pub mod provision;
pub mod routes;

pub use config::Config;
pub use error::{ConfigError, ManifestError, ProvisionError};
pub use manifest::{ModelGroup, ModelManifest};
pub use provision::{ensure_models_present, provision, FileReport, FileStatus, ProvisionReport};
pub use routes::{build_router, AppState, StatusResponse};
