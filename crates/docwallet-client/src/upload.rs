//! Multi-file upload pipeline.
//!
//! Every file of a batch gets an `Uploading` status record up front; files are
//! then processed one at a time in input order. A file that fails validation
//! never reaches the gateway, and no failure stops the batch.

use crate::documents::DocumentController;
use crate::file::UploadFile;
use chrono::{DateTime, Utc};
use docwallet_core::models::{Document, UploadStatusRecord};
use docwallet_core::{AppError, ErrorMetadata, FileValidator};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Queued { id: u64, filename: String },
    Succeeded { id: u64, document: Document },
    Failed { id: u64, filename: String, error: String },
    BatchFinished { succeeded: usize, failed: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded(Document),
    Failed(UploadFailure),
}

/// Outcome of one batch, one entry per file in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn uploaded(&self) -> impl Iterator<Item = &Document> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            UploadOutcome::Uploaded(document) => Some(document),
            UploadOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &UploadFailure> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            UploadOutcome::Failed(failure) => Some(failure),
            UploadOutcome::Uploaded(_) => None,
        })
    }

    pub fn succeeded(&self) -> usize {
        self.uploaded().count()
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }
}

#[derive(Clone)]
pub struct UploadPipeline {
    documents: DocumentController,
    validator: FileValidator,
    board: Arc<watch::Sender<Vec<UploadStatusRecord>>>,
    next_id: Arc<AtomicU64>,
    events: broadcast::Sender<UploadEvent>,
    grace: Duration,
}

impl UploadPipeline {
    /// `grace` is how long resolved records stay on the board.
    pub fn new(documents: DocumentController, grace: Duration) -> Self {
        let validator = FileValidator::new(documents.settings().max_file_size_bytes);
        let (board, _) = watch::channel(Vec::new());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            documents,
            validator,
            board: Arc::new(board),
            next_id: Arc::new(AtomicU64::new(1)),
            events,
            grace,
        }
    }

    /// Upload a batch of files sequentially.
    pub async fn submit(&self, files: &[UploadFile]) -> UploadReport {
        let ids: Vec<u64> = files.iter().map(|file| self.register(file)).collect();
        let mut report = UploadReport::default();

        for (id, file) in ids.into_iter().zip(files) {
            let outcome = match self.validator.validate(file.name(), file.size()) {
                Ok(_) => self.documents.upload(file).await,
                Err(e) => {
                    tracing::debug!(filename = %file.name(), error = %e, "File rejected");
                    Err(AppError::from(e))
                }
            };

            match outcome {
                Ok(document) => {
                    self.resolve(id, |record, now| record.mark_success(now));
                    self.emit(UploadEvent::Succeeded {
                        id,
                        document: document.clone(),
                    });
                    report.outcomes.push(UploadOutcome::Uploaded(document));
                }
                Err(e) => {
                    let message = e.client_message();
                    self.resolve(id, |record, now| record.mark_error(message.clone(), now));
                    self.emit(UploadEvent::Failed {
                        id,
                        filename: file.name().to_string(),
                        error: message.clone(),
                    });
                    report.outcomes.push(UploadOutcome::Failed(UploadFailure {
                        filename: file.name().to_string(),
                        error: message,
                    }));
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Upload batch finished"
        );
        self.emit(UploadEvent::BatchFinished {
            succeeded: report.succeeded(),
            failed: report.failed(),
        });
        self.schedule_cleanup();

        report
    }

    fn register(&self, file: &UploadFile) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = UploadStatusRecord::uploading(id, file.name(), file.size());
        self.board.send_modify(|records| records.push(record));
        self.emit(UploadEvent::Queued {
            id,
            filename: file.name().to_string(),
        });
        id
    }

    fn resolve<F>(&self, id: u64, apply: F)
    where
        F: FnOnce(&mut UploadStatusRecord, DateTime<Utc>),
    {
        let now = Utc::now();
        self.board.send_modify(|records| {
            if let Some(record) = records.iter_mut().find(|r| r.id == id) {
                apply(record, now);
            }
        });
    }

    fn emit(&self, event: UploadEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Drop records resolved at least one grace period before `now`.
    /// Returns how many were removed.
    pub fn prune_resolved(&self, now: DateTime<Utc>) -> usize {
        let grace = chrono::Duration::milliseconds(self.grace.as_millis() as i64);
        let mut removed = 0;
        self.board.send_if_modified(|records| {
            let before = records.len();
            records.retain(|record| !record.is_expired(now, grace));
            removed = before - records.len();
            removed > 0
        });
        removed
    }

    /// Remove one record regardless of its status.
    pub fn dismiss(&self, id: u64) -> bool {
        self.board.send_if_modified(|records| {
            let before = records.len();
            records.retain(|record| record.id != id);
            records.len() != before
        })
    }

    /// Prune once the grace period has elapsed.
    pub fn schedule_cleanup(&self) -> JoinHandle<usize> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(pipeline.grace).await;
            pipeline.prune_resolved(Utc::now())
        })
    }

    pub fn records(&self) -> Vec<UploadStatusRecord> {
        self.board.borrow().clone()
    }

    pub fn watch_records(&self) -> watch::Receiver<Vec<UploadStatusRecord>> {
        self.board.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.events.subscribe()
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }
}
