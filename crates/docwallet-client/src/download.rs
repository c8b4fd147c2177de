//! Download destinations.
//!
//! The document controller hands a sink either a signed URL or the raw bytes;
//! the sink decides where the file ends up.

use async_trait::async_trait;
use bytes::Bytes;
use docwallet_core::AppError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// How a download reached the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadRoute {
    SignedUrl,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub route: DownloadRoute,
}

#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Retrieve `url` and save it under `filename`.
    async fn save_from_url(&self, url: &str, filename: &str) -> Result<PathBuf, AppError>;

    /// Save bytes fetched directly from the gateway under `filename`.
    async fn save_bytes(&self, data: Bytes, filename: &str) -> Result<PathBuf, AppError>;
}

/// Saves downloads into a local directory.
///
/// Bytes go through a temporary file in the target directory that is renamed
/// into place, so a failed write never leaves a partial file behind.
pub struct DirectorySink {
    dir: PathBuf,
    client: reqwest::Client,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            dir: dir.into(),
            client,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, data: Bytes, filename: &str) -> Result<PathBuf, AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let dir = self.dir.clone();
        let filename = sanitize_filename(filename);

        tokio::task::spawn_blocking(move || write_through_temp(&dir, &filename, &data))
            .await
            .map_err(|e| AppError::Internal(format!("Download task failed: {}", e)))?
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn save_from_url(&self, url: &str, filename: &str) -> Result<PathBuf, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Download(format!("Failed to fetch signed URL: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Download(format!(
                "Signed URL request failed with status {}",
                status
            )));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| AppError::Download(format!("Failed to read download: {}", e)))?;
        self.write(data, filename).await
    }

    async fn save_bytes(&self, data: Bytes, filename: &str) -> Result<PathBuf, AppError> {
        self.write(data, filename).await
    }
}

fn write_through_temp(dir: &Path, filename: &str, data: &[u8]) -> Result<PathBuf, AppError> {
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.flush()?;

    for target in candidate_paths(dir, filename) {
        match temp.persist_noclobber(&target) {
            Ok(_) => return Ok(target),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => temp = e.file,
            Err(e) => {
                return Err(AppError::Internal(format!(
                    "Failed to save download: {}",
                    e.error
                )))
            }
        }
    }

    Err(AppError::Internal(format!(
        "No free file name for {}",
        filename
    )))
}

/// `name.ext`, then `name (1).ext`, `name (2).ext`, ...
fn candidate_paths<'a>(dir: &'a Path, filename: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };
    std::iter::once(dir.join(filename)).chain((1..=MAX_NAME_ATTEMPTS).map(move |n| match ext {
        Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
        None => dir.join(format!("{} ({})", stem, n)),
    }))
}

/// Reduce a stored filename to a safe single path component.
pub fn sanitize_filename(filename: &str) -> String {
    const MAX: usize = 255;
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    if base.contains("..") {
        return "document".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() {
        "document".to_string()
    } else {
        s
    }
}
