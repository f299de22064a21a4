//! Client-side artifact saving.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::data_uri::{self, DataUriError};
use crate::session::MediaItem;

/// Filename prefix for saved artifacts.
pub const DOWNLOAD_PREFIX: &str = "neon_dream";

/// Filename for a gallery item: `<prefix>_<id>.<ext>`.
pub fn artifact_filename(item: &MediaItem) -> String {
    format!(
        "{}_{}.{}",
        DOWNLOAD_PREFIX,
        item.id,
        item.kind.file_extension()
    )
}

/// Saves gallery artifacts to disk.
pub struct Downloader {
    http_client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }

    /// Save an item's content under its artifact filename inside `dir`.
    ///
    /// Data URIs are decoded locally; remote locators are streamed to disk
    /// without buffering the whole artifact in memory. Parent directories
    /// are created as needed.
    pub async fn save(&self, item: &MediaItem, dir: &Path) -> Result<PathBuf, DownloadError> {
        let dest = dir.join(artifact_filename(item));
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if item.locator.starts_with("data:") {
            let (_, bytes) = data_uri::decode(&item.locator)?;
            tokio::fs::write(&dest, bytes).await?;
        } else {
            self.fetch_to_file(&item.locator, &dest).await?;
        }

        log::info!("artifact saved to {:?}", dest);
        Ok(dest)
    }

    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DownloadError::Api(format!(
                "download failed with status {}: {}",
                status, error_text
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();

        use futures_util::StreamExt;
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(())
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur while saving an artifact.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid data URI: {0}")]
    DataUri(#[from] DataUriError),
}
