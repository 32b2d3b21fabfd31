//! Shared helpers: a local stand-in for the remote weight host.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use face_recognition_server::{ModelGroup, ModelManifest};

/// Files served by the fixture host, keyed by name.
pub fn fixture_files() -> HashMap<String, Vec<u8>> {
    HashMap::from([
        (
            "detector-weights_manifest.json".to_string(),
            br#"[{"weights":[],"paths":["detector-shard1"]}]"#.to_vec(),
        ),
        ("detector-shard1".to_string(), vec![0u8, 1, 2, 3, 254, 255]),
        (
            "landmarks-weights_manifest.json".to_string(),
            br#"[{"weights":[],"paths":["landmarks-shard1"]}]"#.to_vec(),
        ),
        ("landmarks-shard1".to_string(), (0..=255u8).cycle().take(4096).collect()),
    ])
}

pub fn fixture_manifest() -> ModelManifest {
    ModelManifest::new(vec![
        ModelGroup {
            name: "detector".to_string(),
            files: vec![
                "detector-weights_manifest.json".to_string(),
                "detector-shard1".to_string(),
            ],
        },
        ModelGroup {
            name: "landmarks".to_string(),
            files: vec![
                "landmarks-weights_manifest.json".to_string(),
                "landmarks-shard1".to_string(),
            ],
        },
    ])
    .unwrap()
}

#[derive(Clone, Default)]
struct HostState {
    files: Arc<HashMap<String, Vec<u8>>>,
    failing: Arc<Vec<String>>,
    slow: Arc<Vec<String>>,
    hits: Arc<Mutex<Vec<String>>>,
    total: Arc<AtomicUsize>,
}

/// A running fixture host on 127.0.0.1.
pub struct FixtureHost {
    pub addr: SocketAddr,
    state: HostState,
}

impl FixtureHost {
    pub async fn start() -> Self {
        Self::start_with(&[], &[]).await
    }

    /// `failing` files answer 500; `slow` files stall for ten seconds.
    pub async fn start_with(failing: &[&str], slow: &[&str]) -> Self {
        let state = HostState {
            files: Arc::new(fixture_files()),
            failing: Arc::new(failing.iter().map(|f| f.to_string()).collect()),
            slow: Arc::new(slow.iter().map(|f| f.to_string()).collect()),
            ..Default::default()
        };

        let app = Router::new()
            .route("/weights/:file", get(serve_weight))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/weights", self.addr)
    }

    pub fn total_requests(&self) -> usize {
        self.state.total.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.state.hits.lock().unwrap().clone()
    }
}

async fn serve_weight(
    State(state): State<HostState>,
    Path(file): Path<String>,
) -> Result<Vec<u8>, StatusCode> {
    state.total.fetch_add(1, Ordering::SeqCst);
    state.hits.lock().unwrap().push(file.clone());

    if state.failing.contains(&file) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if state.slow.contains(&file) {
        tokio::time::sleep(Duration::from_secs(10)).await;
    }

    state.files.get(&file).cloned().ok_or(StatusCode::NOT_FOUND)
}
