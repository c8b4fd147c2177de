use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Success,
    Error,
}

/// Transient status of one file in the upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadStatusRecord {
    pub id: u64,
    pub filename: String,
    pub size: u64,
    pub status: UploadStatus,
    pub error: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl UploadStatusRecord {
    pub fn uploading(id: u64, filename: impl Into<String>, size: u64) -> Self {
        Self {
            id,
            filename: filename.into(),
            size,
            status: UploadStatus::Uploading,
            error: None,
            resolved_at: None,
        }
    }

    pub fn mark_success(&mut self, now: DateTime<Utc>) {
        self.status = UploadStatus::Success;
        self.error = None;
        self.resolved_at = Some(now);
    }

    pub fn mark_error(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.status = UploadStatus::Error;
        self.error = Some(message.into());
        self.resolved_at = Some(now);
    }

    pub fn is_resolved(&self) -> bool {
        self.status != UploadStatus::Uploading
    }

    /// True once the record has been resolved for at least `grace`.
    pub fn is_expired(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        match self.resolved_at {
            Some(at) if self.is_resolved() => now - at >= grace,
            _ => false,
        }
    }
}
