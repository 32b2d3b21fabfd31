//! Model provisioning
//!
//! Makes sure every file in the manifest exists in the local model directory,
//! downloading the missing ones. Runs once before the server starts accepting
//! connections. Failures are logged and recorded per file; the pass always
//! visits the whole manifest.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ProvisionError;
use crate::manifest::ModelManifest;

/// What happened to one manifest file during a pass.
#[derive(Debug)]
pub enum FileStatus {
    /// A local file with that name already existed; it was not touched.
    AlreadyPresent,
    Downloaded { bytes: u64 },
    Failed(ProvisionError),
}

#[derive(Debug)]
pub struct FileReport {
    pub group: String,
    pub file: String,
    pub status: FileStatus,
}

/// Per-file results of a provisioning pass, in manifest order.
#[derive(Debug, Default)]
pub struct ProvisionReport {
    pub entries: Vec<FileReport>,
}

impl ProvisionReport {
    pub fn present(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::AlreadyPresent))
    }

    pub fn downloaded(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Downloaded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed(_)))
    }

    /// True when every manifest file is available locally.
    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }

    pub fn get(&self, file: &str) -> Option<&FileStatus> {
        self.entries
            .iter()
            .find(|e| e.file == file)
            .map(|e| &e.status)
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }
}

/// Provision the models described by `config`.
pub async fn provision(config: &Config) -> ProvisionReport {
    ensure_models_present(
        &config.manifest,
        &config.models_dir,
        &config.model_base_url,
        config.download_timeout,
    )
    .await
}

/// Download every manifest file missing from `local_dir`.
///
/// Files already present are skipped without any network access, so a pass
/// over a fully provisioned directory performs no requests and no writes.
/// Each download is a single GET to `remote_base_url/<file>`, bounded by
/// `timeout`, with no retry. Content is not verified.
pub async fn ensure_models_present(
    manifest: &ModelManifest,
    local_dir: &Path,
    remote_base_url: &str,
    timeout: Duration,
) -> ProvisionReport {
    info!("[Provision] Checking {} model files in {}", manifest.len(), local_dir.display());

    // A failure here surfaces again as a per-file write error below
    if let Err(e) = tokio::fs::create_dir_all(local_dir).await {
        error!("[Provision] Failed to create model dir {}: {}", local_dir.display(), e);
    }

    let missing = manifest.missing_files(local_dir).await;
    info!("[Provision] {} of {} files need downloading", missing.len(), manifest.len());

    let base_url = remote_base_url.trim_end_matches('/');
    let mut client: Option<Client> = None;
    let mut report = ProvisionReport::default();

    for (group, file) in manifest.files() {
        let dest = local_dir.join(file);

        let status = if !missing.contains(&file) {
            info!("[Provision] ✓ {} already present", file);
            FileStatus::AlreadyPresent
        } else {
            let url = format!("{}/{}", base_url, file);
            info!("[Provision] Downloading {} ...", file);

            let result = match client_for(&mut client, timeout) {
                Ok(client) => download(client, &url, &dest).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(bytes) => {
                    info!("[Provision] ✓ {} downloaded ({} bytes)", file, bytes);
                    FileStatus::Downloaded { bytes }
                }
                Err(e) => {
                    error!("[Provision] ✗ Failed to download {}: {}", file, e);
                    FileStatus::Failed(e)
                }
            }
        };

        report.entries.push(FileReport {
            group: group.to_string(),
            file: file.to_string(),
            status,
        });
    }

    if report.is_complete() {
        info!(
            "[Provision] Models ready: {} present, {} downloaded",
            report.present(),
            report.downloaded()
        );
    } else {
        warn!(
            "[Provision] {} of {} model files unavailable; they will 404 until the next successful start",
            report.failed(),
            report.entries.len()
        );
    }

    report
}

/// Build the shared client on first use.
fn client_for(slot: &mut Option<Client>, timeout: Duration) -> Result<&Client, ProvisionError> {
    let client = match slot.take() {
        Some(client) => client,
        None => Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProvisionError::CreateClient)?,
    };
    Ok(&*slot.insert(client))
}

async fn download(client: &Client, url: &str, dest: &Path) -> Result<u64, ProvisionError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| ProvisionError::Request {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(ProvisionError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    // Buffer the full body before touching the filesystem
    let body = response.bytes().await.map_err(|source| ProvisionError::Body {
        url: url.to_string(),
        source,
    })?;

    if let Err(source) = write_file(dest, &body).await {
        // Never leave a truncated file that would count as present
        if let Err(e) = tokio::fs::remove_file(dest).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("[Provision] Failed to remove partial file {}: {}", dest.display(), e);
            }
        }
        return Err(ProvisionError::Filesystem {
            path: PathBuf::from(dest),
            source,
        });
    }

    Ok(body.len() as u64)
}

async fn write_file(dest: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(dest).await?;
    file.write_all(data).await?;
    file.flush().await
}
