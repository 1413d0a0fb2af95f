//! Model artifact provisioning.
//!
//! Makes sure the artifact exists at its local path before the service loads
//! it, downloading it once from the configured source when missing. Downloads
//! land in a temporary file next to the destination and are renamed into place
//! without clobbering, so concurrent starts never observe a partial artifact.

use crate::config::ModelConfig;
use crate::error::{ShieldError, ShieldResult};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ensures the model artifact is present locally
#[derive(Debug, Clone)]
pub struct ArtifactProvisioner {
    path: PathBuf,
    source_url: Option<String>,
    sha256: Option<String>,
    timeout: Duration,
}

impl ArtifactProvisioner {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            source_url: None,
            sha256: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            path: PathBuf::from(&config.path),
            source_url: config.source_url.clone().filter(|u| !u.trim().is_empty()),
            sha256: config.sha256.clone().filter(|s| !s.trim().is_empty()),
            timeout: Duration::from_secs(config.download_timeout_secs.max(1)),
        }
    }

    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the local artifact path, downloading the artifact if absent.
    pub async fn ensure_present(&self) -> ShieldResult<PathBuf> {
        if self.path.exists() {
            debug!(path = %self.path.display(), "Artifact already present, skipping download");
            self.verify_file(&self.path)?;
            return Ok(self.path.clone());
        }

        let url = self.source_url.as_deref().ok_or_else(|| {
            ShieldError::artifact(format!(
                "artifact {} is missing and no source_url is configured",
                self.path.display()
            ))
        })?;

        info!(url = %url, path = %self.path.display(), "Downloading model artifact");
        let bytes = self.download(url).await?;
        self.verify_bytes(&bytes)?;
        self.place(&bytes)?;

        Ok(self.path.clone())
    }

    async fn download(&self, url: &str) -> ShieldResult<Vec<u8>> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ShieldError::artifact(format!("failed to build HTTP client: {}", e)))?;

        let response = client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ShieldError::artifact(format!("failed to fetch {}: {}", url, e)))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ShieldError::artifact(format!("failed to read body from {}: {}", url, e)))?;

        if bytes.is_empty() {
            return Err(ShieldError::artifact(format!("{} returned an empty artifact", url)));
        }

        info!(bytes = bytes.len(), "Artifact downloaded");
        Ok(bytes.to_vec())
    }

    /// Write to a sibling temp file, then rename into place without clobbering
    fn place(&self, bytes: &[u8]) -> ShieldResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |e: std::io::Error| {
            ShieldError::artifact(format!("failed to write {}: {}", self.path.display(), e))
        };

        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".artifact-")
            .suffix(".partial")
            .tempfile_in(&dir)
            .map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;

        match tmp.persist_noclobber(&self.path) {
            Ok(_) => {
                info!(path = %self.path.display(), "Artifact placed");
                Ok(())
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                warn!(
                    path = %self.path.display(),
                    "Artifact was placed by a concurrent start, discarding local download"
                );
                self.verify_file(&self.path)
            }
            Err(e) => Err(io_err(e.error)),
        }
    }

    fn verify_file(&self, path: &Path) -> ShieldResult<()> {
        if self.sha256.is_none() {
            return Ok(());
        }
        let bytes = std::fs::read(path).map_err(|e| {
            ShieldError::artifact(format!("failed to read {}: {}", path.display(), e))
        })?;
        self.verify_bytes(&bytes)
    }

    fn verify_bytes(&self, bytes: &[u8]) -> ShieldResult<()> {
        let Some(expected) = &self.sha256 else {
            return Ok(());
        };

        let actual = hex::encode(Sha256::digest(bytes));
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(ShieldError::artifact(format!(
                "checksum mismatch: expected {}, got {}",
                expected.trim(),
                actual
            )));
        }

        debug!(sha256 = %actual, "Artifact checksum verified");
        Ok(())
    }
}
