use crate::documents::{DocumentController, DocumentSettings};
use crate::session::SessionController;
use crate::upload::UploadPipeline;
use docwallet_core::{AppError, WalletConfig};
use docwallet_gateway::{create_gateway, StorageGateway};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Wallet context
///
/// Holds the gateway and every controller built on it. Construct one per
/// process (or per test) and pass it to whoever needs the wallet; background
/// tasks live until [`WalletContext::shutdown`].
pub struct WalletContext {
    config: WalletConfig,
    gateway: Arc<dyn StorageGateway>,
    session: SessionController,
    documents: DocumentController,
    uploads: UploadPipeline,
    tasks: Vec<JoinHandle<()>>,
}

impl WalletContext {
    /// Build the gateway from configuration, then initialize.
    pub async fn from_config(config: WalletConfig) -> Result<Self, AppError> {
        let gateway = create_gateway(&config)?;
        Self::init(config, gateway).await
    }

    /// Wire controllers to `gateway`, restore the session and, when someone
    /// is signed in, load their documents.
    pub async fn init(
        config: WalletConfig,
        gateway: Arc<dyn StorageGateway>,
    ) -> Result<Self, AppError> {
        let session = SessionController::new(Arc::clone(&gateway));
        let documents = DocumentController::new(Arc::clone(&gateway), DocumentSettings::from(&config));
        let uploads = UploadPipeline::new(documents.clone(), config.upload_status_grace());

        let mut tasks = vec![session.observe()];

        let user = session.initialize().await?;
        if user.is_some() {
            documents.set_user(user);
            if let Err(e) = documents.fetch().await {
                tracing::warn!(error = %e, "Initial document fetch failed");
            }
        }
        tasks.push(documents.follow_session(session.subscribe()));

        tracing::debug!(
            backend = %gateway.backend_type(),
            signed_in = session.current_user().is_some(),
            "Wallet context initialized"
        );

        Ok(Self {
            config,
            gateway,
            session,
            documents,
            uploads,
            tasks,
        })
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<dyn StorageGateway> {
        &self.gateway
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn documents(&self) -> &DocumentController {
        &self.documents
    }

    pub fn uploads(&self) -> &UploadPipeline {
        &self.uploads
    }

    /// Sign in and load the user's documents before returning.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AppError> {
        let user = self.session.sign_in(email, password).await?;
        self.documents.set_user(Some(user));
        self.documents.fetch().await
    }

    /// Sign out and drop everything held for the previous user.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.session.sign_out().await?;
        self.documents.set_user(None);
        self.documents.clear();
        Ok(())
    }

    /// Stop background tasks.
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        tracing::debug!("Wallet context shut down");
    }
}
