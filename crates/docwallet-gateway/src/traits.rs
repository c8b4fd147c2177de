//! Storage gateway abstraction trait
//!
//! This module defines the [`StorageGateway`] trait every backend implements,
//! and the error type shared by all of them.

use crate::GatewayBackend;
use async_trait::async_trait;
use bytes::Bytes;
use docwallet_core::models::{Credentials, Document, NewDocument, Session, SignUpOptions, User};
use docwallet_core::AppError;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Gateway operation errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Auth(String),

    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Signed URL failed: {0}")]
    SignFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Gateway backend error: {0}")]
    BackendError(String),

    #[cfg(feature = "gateway-rest")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Auth(msg) => AppError::Unauthorized(msg),
            GatewayError::NotAuthenticated => AppError::NotAuthenticated,
            GatewayError::NotFound(path) => AppError::NotFound(path),
            GatewayError::ConfigError(msg) => AppError::Config(msg),
            other => AppError::Gateway(other.to_string()),
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Session changes pushed by the gateway to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(User),
    TokenRefreshed(User),
    SignedOut,
}

impl AuthEvent {
    /// The user the event leaves signed in, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthEvent::SignedIn(user) | AuthEvent::TokenRefreshed(user) => Some(user),
            AuthEvent::SignedOut => None,
        }
    }
}

/// Row ordering for selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOrder {
    pub column: String,
    pub ascending: bool,
}

impl RowOrder {
    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }
}

/// Storage gateway abstraction trait
///
/// Everything the wallet persists goes through this trait: the session,
/// the file bytes (objects) and the metadata rows. Row visibility is the
/// backend's business; the wallet never filters rows by owner itself.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Current session, if any. Backends refresh expired sessions here.
    async fn get_session(&self) -> GatewayResult<Option<Session>>;

    /// Subscribe to session changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Create an account. Returns a session when the account is active
    /// immediately, `None` when it waits for email confirmation.
    async fn sign_up(
        &self,
        credentials: &Credentials,
        options: &SignUpOptions,
    ) -> GatewayResult<Option<Session>>;

    async fn sign_in(&self, credentials: &Credentials) -> GatewayResult<Session>;

    async fn sign_out(&self) -> GatewayResult<()>;

    /// Store bytes at `path` inside `bucket`.
    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> GatewayResult<()>;

    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> GatewayResult<()>;

    async fn download_object(&self, bucket: &str, path: &str) -> GatewayResult<Bytes>;

    /// Issue a time-limited retrieval URL for an object.
    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> GatewayResult<String>;

    /// Insert a metadata row and return it as stored.
    async fn insert_document(&self, table: &str, row: &NewDocument) -> GatewayResult<Document>;

    async fn select_documents(&self, table: &str, order: &RowOrder)
        -> GatewayResult<Vec<Document>>;

    async fn delete_document(&self, table: &str, id: Uuid) -> GatewayResult<()>;

    /// Get the gateway backend type
    fn backend_type(&self) -> GatewayBackend;
}

#[cfg(test)]
mod tests {
    use super::*;
    use docwallet_core::ErrorMetadata;

    #[test]
    fn auth_errors_become_unauthorized() {
        let err = AppError::from(GatewayError::Auth("Invalid login credentials".to_string()));
        assert_eq!(err.error_code(), "UNAUTHORIZED");
        assert_eq!(err.client_message(), "Invalid login credentials");
    }

    #[test]
    fn backend_errors_keep_message() {
        let err = AppError::from(GatewayError::UploadFailed("Bucket not found".to_string()));
        assert_eq!(err.client_message(), "Upload failed: Bucket not found");
    }

    #[test]
    fn event_user() {
        assert!(AuthEvent::SignedOut.user().is_none());
    }
}
