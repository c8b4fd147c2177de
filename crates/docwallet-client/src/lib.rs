//! Docwallet Client Library
//!
//! Stateful side of the wallet: the session and document controllers, the
//! upload pipeline, download sinks and dashboard navigation, all wired
//! together by [`WalletContext`]. Controllers publish their state through
//! `tokio::sync::watch` channels.

pub mod context;
pub mod dashboard;
pub mod documents;
pub mod download;
pub mod file;
pub mod session;
pub mod upload;

pub use context::WalletContext;
pub use dashboard::{overview_documents, shows_view_all, tab_after_upload, DashboardTab};
pub use documents::{DocumentController, DocumentSettings};
pub use download::{DirectorySink, DownloadRoute, DownloadSink, DownloadedFile};
pub use file::UploadFile;
pub use session::SessionController;
pub use upload::{UploadEvent, UploadFailure, UploadOutcome, UploadPipeline, UploadReport};

use docwallet_core::{AppError, ErrorMetadata, LogLevel};

fn log_error(operation: &str, error: &AppError) {
    let error_code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(operation, error = %error, error_code, "Operation failed");
        }
        LogLevel::Warn => {
            tracing::warn!(operation, error = %error, error_code, "Operation failed");
        }
        LogLevel::Error => {
            tracing::error!(operation, error = %error, error_code, "Operation failed");
        }
    }
}
