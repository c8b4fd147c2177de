use async_trait::async_trait;
use bytes::Bytes;
use docwallet_client::DownloadSink;
use docwallet_core::AppError;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Saved {
    Url { url: String, filename: String },
    Bytes { data: Bytes, filename: String },
}

/// Sink that records what it was handed instead of touching the disk.
#[derive(Default)]
pub struct RecordingSink {
    pub saved: Mutex<Vec<Saved>>,
    pub reject_urls: bool,
}

impl RecordingSink {
    pub fn rejecting_urls() -> Self {
        Self {
            reject_urls: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Vec<Saved> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadSink for RecordingSink {
    async fn save_from_url(&self, url: &str, filename: &str) -> Result<PathBuf, AppError> {
        if self.reject_urls {
            return Err(AppError::Download("URL expired".to_string()));
        }
        self.saved.lock().unwrap().push(Saved::Url {
            url: url.to_string(),
            filename: filename.to_string(),
        });
        Ok(PathBuf::from(filename))
    }

    async fn save_bytes(&self, data: Bytes, filename: &str) -> Result<PathBuf, AppError> {
        self.saved.lock().unwrap().push(Saved::Bytes {
            data,
            filename: filename.to_string(),
        });
        Ok(PathBuf::from(filename))
    }
}
