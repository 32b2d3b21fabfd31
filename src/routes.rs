use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;

pub const STATUS_MESSAGE: &str = "Face recognition server running";

#[derive(Clone)]
pub struct AppState {
    pub index_template: Arc<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

/// Build the HTTP surface: landing page, model files, static assets and status.
///
/// File routes go through `ServeDir`, which only accepts normal path
/// components, so `..` segments get a 404 instead of escaping the root.
/// Directories are never listed or redirected; they are 404 as well.
pub fn build_router(config: &Config) -> Router {
    let state = AppState {
        index_template: Arc::new(config.index_template()),
    };

    Router::new()
        .route("/", get(index))
        .route("/api/status", get(status))
        .nest_service("/models", serve_files(&config.models_dir))
        .nest_service("/static", serve_files(&config.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

fn serve_files(root: &Path) -> ServeDir {
    ServeDir::new(root).append_index_html_on_directories(false)
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    match tokio::fs::read_to_string(state.index_template.as_path()).await {
        Ok(page) => Ok(Html(page)),
        Err(e) => {
            tracing::error!(
                "Failed to read landing page {}: {}",
                state.index_template.display(),
                e
            );
            Err(StatusCode::NOT_FOUND)
        }
    }
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        message: STATUS_MESSAGE.to_string(),
    })
}
