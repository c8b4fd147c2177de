use crate::download::{DownloadRoute, DownloadSink, DownloadedFile};
use crate::file::UploadFile;
use crate::log_error;
use chrono::{DateTime, Utc};
use docwallet_core::constants::UPLOAD_DATE_COLUMN;
use docwallet_core::models::{Document, DocumentState, NewDocument, SessionState, User};
use docwallet_core::query::{self, DocumentQuery};
use docwallet_core::{AppError, DocumentStats, ErrorMetadata, FileValidator, WalletConfig};
use docwallet_gateway::keys::generate_object_path;
use docwallet_gateway::{RowOrder, StorageGateway};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

const DOWNLOAD_FAILED: &str = "Failed to download document. Please try again.";

/// Where documents live and how long signed URLs stay valid.
#[derive(Debug, Clone)]
pub struct DocumentSettings {
    pub bucket: String,
    pub table: String,
    pub signed_url_ttl: Duration,
    pub max_file_size_bytes: u64,
}

impl From<&WalletConfig> for DocumentSettings {
    fn from(config: &WalletConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            table: config.table.clone(),
            signed_url_ttl: config.signed_url_ttl(),
            max_file_size_bytes: config.max_file_size_bytes,
        }
    }
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self::from(&WalletConfig::default())
    }
}

/// Owns the signed-in user's document collection.
///
/// The collection is only ever replaced through `send_modify`, so readers see
/// either the old or the new list. It is never filtered by owner here; row
/// visibility belongs to the gateway.
#[derive(Clone)]
pub struct DocumentController {
    gateway: Arc<dyn StorageGateway>,
    settings: DocumentSettings,
    validator: FileValidator,
    user: Arc<watch::Sender<Option<User>>>,
    state: Arc<watch::Sender<DocumentState>>,
}

impl DocumentController {
    pub fn new(gateway: Arc<dyn StorageGateway>, settings: DocumentSettings) -> Self {
        let (user, _) = watch::channel(None);
        let (state, _) = watch::channel(DocumentState::default());
        let validator = FileValidator::new(settings.max_file_size_bytes);
        Self {
            gateway,
            settings,
            validator,
            user: Arc::new(user),
            state: Arc::new(state),
        }
    }

    pub fn settings(&self) -> &DocumentSettings {
        &self.settings
    }

    /// Set the user uploads are attributed to.
    pub fn set_user(&self, user: Option<User>) {
        self.user.send_replace(user);
    }

    pub fn user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    /// Reload the collection, newest first. On failure the previous
    /// collection is kept and the error recorded.
    pub async fn fetch(&self) -> Result<(), AppError> {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let order = RowOrder::descending(UPLOAD_DATE_COLUMN);
        match self
            .gateway
            .select_documents(&self.settings.table, &order)
            .await
        {
            Ok(documents) => {
                tracing::debug!(count = documents.len(), "Documents fetched");
                self.state.send_modify(|state| {
                    state.documents = documents;
                    state.loading = false;
                });
                Ok(())
            }
            Err(e) => Err(self.capture("fetch", e.into())),
        }
    }

    /// Refetch whenever the signed-in user changes; clear on sign-out.
    ///
    /// Changes are detected against the user set on the controller, so a
    /// caller that already set the user and fetched does not cause a refetch.
    pub fn follow_session(&self, mut session: watch::Receiver<SessionState>) -> JoinHandle<()> {
        let controller = self.clone();

        tokio::spawn(async move {
            loop {
                let user = session.borrow_and_update().user.clone();
                let user_id = user.as_ref().map(|u| u.id);
                let current = controller.user().map(|u| u.id);

                if user_id != current {
                    controller.set_user(user);
                    if user_id.is_some() {
                        // Errors are already recorded in the state
                        let _ = controller.fetch().await;
                    } else {
                        controller.clear();
                    }
                }

                if session.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Prepend a document without refetching.
    pub fn insert(&self, document: Document) {
        self.state
            .send_modify(|state| state.documents.insert(0, document));
    }

    /// Store a file and its metadata row, then prepend the new document.
    pub async fn upload(&self, file: &UploadFile) -> Result<Document, AppError> {
        let Some(user) = self.user() else {
            return Err(self.capture("upload", AppError::NotAuthenticated));
        };

        self.state.send_modify(|state| {
            state.uploading = true;
            state.error = None;
        });

        let result = self.store(&user, file).await;
        self.state.send_modify(|state| state.uploading = false);

        match result {
            Ok(document) => {
                tracing::info!(
                    document_id = %document.id,
                    filename = %document.filename,
                    size_bytes = document.file_size,
                    "Document uploaded"
                );
                self.insert(document.clone());
                Ok(document)
            }
            Err(e) => Err(self.capture("upload", e)),
        }
    }

    async fn store(&self, user: &User, file: &UploadFile) -> Result<Document, AppError> {
        let file_type = self.validator.validate(file.name(), file.size())?;
        let data = file.read().await?;

        let storage_path = generate_object_path(user.id, file_type.as_str(), Utc::now());
        self.gateway
            .put_object(
                &self.settings.bucket,
                &storage_path,
                file_type.content_type(),
                data,
            )
            .await?;

        let row = NewDocument {
            user_id: user.id,
            filename: file.name().to_string(),
            file_type: file_type.as_str().to_string(),
            file_size: file.size(),
            storage_path,
        };
        Ok(self
            .gateway
            .insert_document(&self.settings.table, &row)
            .await?)
    }

    /// Remove the stored object, then the metadata row.
    pub async fn delete(&self, document: &Document) -> Result<(), AppError> {
        self.state.send_modify(|state| state.error = None);

        if let Err(e) = self
            .gateway
            .remove_objects(
                &self.settings.bucket,
                std::slice::from_ref(&document.storage_path),
            )
            .await
        {
            return Err(self.capture("delete", e.into()));
        }

        if let Err(e) = self
            .gateway
            .delete_document(&self.settings.table, document.id)
            .await
        {
            return Err(self.capture("delete", e.into()));
        }

        let id = document.id;
        self.state
            .send_modify(|state| state.documents.retain(|doc| doc.id != id));
        tracing::info!(document_id = %id, filename = %document.filename, "Document deleted");
        Ok(())
    }

    /// Save a document through `sink`, preferring a signed URL and falling
    /// back to fetching the bytes directly.
    pub async fn download(
        &self,
        document: &Document,
        sink: &dyn DownloadSink,
    ) -> Result<DownloadedFile, AppError> {
        self.state.send_modify(|state| state.error = None);

        let signed = self
            .gateway
            .create_signed_url(
                &self.settings.bucket,
                &document.storage_path,
                self.settings.signed_url_ttl,
            )
            .await;

        match signed {
            Ok(url) => match sink.save_from_url(&url, &document.filename).await {
                Ok(path) => {
                    tracing::info!(document_id = %document.id, path = %path.display(), "Document downloaded");
                    return Ok(DownloadedFile {
                        path,
                        route: DownloadRoute::SignedUrl,
                    });
                }
                Err(e) => {
                    tracing::warn!(document_id = %document.id, error = %e, "Signed URL download failed, fetching directly");
                }
            },
            Err(e) => {
                tracing::warn!(document_id = %document.id, error = %e, "Signed URL unavailable, fetching directly");
            }
        }

        let direct = match self
            .gateway
            .download_object(&self.settings.bucket, &document.storage_path)
            .await
        {
            Ok(data) => sink.save_bytes(data, &document.filename).await,
            Err(e) => Err(e.into()),
        };

        match direct {
            Ok(path) => {
                tracing::info!(document_id = %document.id, path = %path.display(), "Document downloaded directly");
                Ok(DownloadedFile {
                    path,
                    route: DownloadRoute::Direct,
                })
            }
            Err(e) => {
                tracing::error!(document_id = %document.id, error = %e, "Document download failed");
                Err(self.capture("download", AppError::Download(DOWNLOAD_FAILED.to_string())))
            }
        }
    }

    pub fn find(&self, id: Uuid) -> Option<Document> {
        self.state
            .borrow()
            .documents
            .iter()
            .find(|doc| doc.id == id)
            .cloned()
    }

    /// Filtered and sorted view of the collection.
    pub fn view(&self, query: &DocumentQuery) -> Vec<Document> {
        query::view(&self.state.borrow().documents, query)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> DocumentStats {
        DocumentStats::compute(&self.state.borrow().documents, now)
    }

    pub fn documents(&self) -> Vec<Document> {
        self.state.borrow().documents.clone()
    }

    pub fn snapshot(&self) -> DocumentState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DocumentState> {
        self.state.subscribe()
    }

    /// Drop the collection and any recorded error.
    pub fn clear(&self) {
        self.state.send_replace(DocumentState::default());
    }

    fn capture(&self, operation: &str, err: AppError) -> AppError {
        log_error(operation, &err);
        let message = err.client_message();
        self.state.send_modify(|state| {
            state.error = Some(message);
            state.loading = false;
        });
        err
    }
}
