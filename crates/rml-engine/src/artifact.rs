//! Engine artifact acquisition: download once, then reuse.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};
use uuid::Uuid;

use rml_core::error::{Result, RmlError};
use rml_core::traits::ArtifactDownloader;

/// Streams release artifacts over HTTP.
pub struct ReleaseDownloader {
    client: reqwest::Client,
}

impl ReleaseDownloader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rml-runner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RmlError::Download(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl ArtifactDownloader for ReleaseDownloader {
    fn download(&self, url: &str, dest: &Path) -> BoxFuture<'_, Result<()>> {
        let url = url.to_string();
        let dest = dest.to_path_buf();
        Box::pin(async move {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| RmlError::Download(format!("{url}: {e}")))?;

            if !resp.status().is_success() {
                return Err(RmlError::Download(format!("{url}: HTTP {}", resp.status())));
            }

            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            // Write next to the target and rename, so a partial download is
            // never mistaken for a cached artifact.
            let partial = partial_path(&dest);
            let mut file = tokio::fs::File::create(&partial).await?;
            let mut body = resp.bytes_stream();
            let mut written: u64 = 0;
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| RmlError::Download(format!("{url}: {e}")))?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            drop(file);

            tokio::fs::rename(&partial, &dest).await?;
            debug!(url = %url, path = %dest.display(), bytes = written, "Artifact written");
            Ok(())
        })
    }
}

/// In-progress download location for `dest`, unique per destination.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Guarantees the engine artifact is present locally.
///
/// Concurrent callers asking for the same location share a single download.
/// A completed download is remembered until [`EngineArtifactResolver::reset`].
pub struct EngineArtifactResolver {
    release_url: String,
    default_location: PathBuf,
    downloader: Arc<dyn ArtifactDownloader>,
    slots: Mutex<HashMap<PathBuf, Arc<OnceCell<()>>>>,
}

impl EngineArtifactResolver {
    /// Create a resolver whose default location is a fresh file under `temp_dir`.
    pub fn new(
        release_url: impl Into<String>,
        temp_dir: &Path,
        downloader: Arc<dyn ArtifactDownloader>,
    ) -> Self {
        let default_location = temp_dir.join(format!("rml-engine-{}.jar", Uuid::new_v4()));
        Self {
            release_url: release_url.into(),
            default_location,
            downloader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn release_url(&self) -> &str {
        &self.release_url
    }

    pub fn default_location(&self) -> &Path {
        &self.default_location
    }

    /// Return a local path holding the artifact, downloading it if needed.
    ///
    /// With `offline` set, a missing artifact is an error and the network is
    /// never touched.
    pub async fn resolve(&self, explicit: Option<&Path>, offline: bool) -> Result<PathBuf> {
        let candidate = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_location.clone());

        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            debug!(path = %candidate.display(), "Using cached engine artifact");
            return Ok(candidate);
        }

        if offline {
            return Err(RmlError::ArtifactUnavailable(candidate));
        }

        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(candidate.clone()).or_default().clone()
        };

        slot.get_or_try_init(|| async {
            info!(url = %self.release_url, path = %candidate.display(), "Downloading engine artifact");
            self.downloader.download(&self.release_url, &candidate).await
        })
        .await?;

        Ok(candidate)
    }

    /// Forget every completed or pending download.
    pub async fn reset(&self) {
        self.slots.lock().await.clear();
    }
}
