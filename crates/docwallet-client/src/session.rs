use crate::log_error;
use docwallet_core::models::{Credentials, SessionState, SignUpOptions, User};
use docwallet_core::{AppError, ErrorMetadata};
use docwallet_gateway::StorageGateway;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use validator::Validate;

/// Tracks who is signed in.
///
/// State is published through a `watch` channel; [`SessionController::observe`]
/// keeps it in line with the gateway's auth events.
#[derive(Clone)]
pub struct SessionController {
    gateway: Arc<dyn StorageGateway>,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionController {
    pub fn new(gateway: Arc<dyn StorageGateway>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            gateway,
            state: Arc::new(state),
        }
    }

    /// Look up the current session once and leave the loading state.
    pub async fn initialize(&self) -> Result<Option<User>, AppError> {
        match self.gateway.get_session().await {
            Ok(session) => {
                let user = session.map(|s| s.user);
                self.state.send_modify(|state| {
                    state.user = user.clone();
                    state.loading = false;
                });
                tracing::debug!(signed_in = user.is_some(), "Session initialized");
                Ok(user)
            }
            Err(e) => Err(self.capture("initialize", e.into())),
        }
    }

    /// Apply gateway auth events to the state until the gateway goes away.
    pub fn observe(&self) -> JoinHandle<()> {
        let mut events = self.gateway.subscribe();
        let gateway = Arc::clone(&self.gateway);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let user = event.user().cloned();
                        state.send_modify(|s| {
                            s.user = user;
                            s.loading = false;
                            s.error = None;
                        });
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Missed auth events, re-reading session");
                        match gateway.get_session().await {
                            Ok(session) => state.send_modify(|s| {
                                s.user = session.map(|session| session.user);
                                s.loading = false;
                                s.error = None;
                            }),
                            Err(e) => tracing::warn!(error = %e, "Session lookup failed"),
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Create an account. Returns the user when the account is signed in
    /// right away, `None` when it waits for email confirmation.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<User>, AppError> {
        self.begin();
        let credentials = Credentials::new(email, password);
        if let Err(e) = credentials.validate() {
            return Err(self.capture("sign_up", e.into()));
        }

        match self
            .gateway
            .sign_up(&credentials, &SignUpOptions::default())
            .await
        {
            Ok(session) => {
                let user = session.map(|s| s.user);
                self.state.send_modify(|state| {
                    if user.is_some() {
                        state.user = user.clone();
                    }
                    state.loading = false;
                });
                tracing::info!(email = %credentials.email, active = user.is_some(), "Signed up");
                Ok(user)
            }
            Err(e) => Err(self.capture("sign_up", e.into())),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AppError> {
        self.begin();
        let credentials = Credentials::new(email, password);
        if let Err(e) = credentials.validate() {
            return Err(self.capture("sign_in", e.into()));
        }

        match self.gateway.sign_in(&credentials).await {
            Ok(session) => {
                let user = session.user;
                self.state.send_modify(|state| {
                    state.user = Some(user.clone());
                    state.loading = false;
                });
                tracing::info!(user_id = %user.id, "Signed in");
                Ok(user)
            }
            Err(e) => Err(self.capture("sign_in", e.into())),
        }
    }

    /// Sign out. Failures are returned but not recorded in the state.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.gateway.sign_out().await?;
        self.state.send_modify(|state| state.user = None);
        tracing::info!("Signed out");
        Ok(())
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
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

#[cfg(test)]
mod tests {
    use super::*;
    use docwallet_gateway::{GatewayOperation, InMemoryGateway};

    fn controller() -> (Arc<InMemoryGateway>, SessionController) {
        let gateway = Arc::new(InMemoryGateway::new());
        let controller = SessionController::new(gateway.clone());
        (gateway, controller)
    }

    #[tokio::test]
    async fn starts_loading_until_initialized() {
        let (_, controller) = controller();
        assert!(controller.snapshot().loading);

        let user = controller.initialize().await.unwrap();
        assert!(user.is_none());
        assert!(!controller.snapshot().loading);
    }

    #[tokio::test]
    async fn sign_up_signs_in_immediately() {
        let (_, controller) = controller();
        let user = controller
            .sign_up("ada@example.com", "secret1")
            .await
            .unwrap();
        assert!(user.is_some());
        assert_eq!(
            controller.current_user().map(|u| u.email),
            Some("ada@example.com".to_string())
        );
    }

    #[tokio::test]
    async fn short_password_is_captured() {
        let (gateway, controller) = controller();
        let err = controller.sign_in("ada@example.com", "123").await.unwrap_err();

        assert_eq!(err.client_message(), "Password must be at least 6 characters");
        let state = controller.snapshot();
        assert_eq!(
            state.error.as_deref(),
            Some("Password must be at least 6 characters")
        );
        assert!(!state.loading);
        assert_eq!(gateway.call_count(GatewayOperation::SignIn).await, 0);
    }

    #[tokio::test]
    async fn gateway_errors_are_captured_and_cleared_on_retry() {
        let (_, controller) = controller();
        controller.sign_up("ada@example.com", "secret1").await.unwrap();
        controller.sign_out().await.unwrap();

        controller
            .sign_in("ada@example.com", "wrong-pass")
            .await
            .unwrap_err();
        assert_eq!(
            controller.snapshot().error.as_deref(),
            Some("Invalid login credentials")
        );

        controller.sign_in("ada@example.com", "secret1").await.unwrap();
        let state = controller.snapshot();
        assert!(state.error.is_none());
        assert!(state.user.is_some());
    }

    #[tokio::test]
    async fn sign_out_errors_are_not_captured() {
        let (gateway, controller) = controller();
        controller.sign_up("ada@example.com", "secret1").await.unwrap();
        gateway
            .fail_on(GatewayOperation::SignOut, "network down")
            .await;

        assert!(controller.sign_out().await.is_err());
        let state = controller.snapshot();
        assert!(state.error.is_none());
        assert!(state.user.is_some());
    }

    #[tokio::test]
    async fn observe_follows_gateway_events() {
        let (gateway, controller) = controller();
        let handle = controller.observe();
        let mut rx = controller.subscribe();

        gateway
            .sign_up(
                &Credentials::new("ada@example.com", "secret1"),
                &SignUpOptions::default(),
            )
            .await
            .unwrap();

        rx.wait_for(|state| state.user.is_some()).await.unwrap();

        gateway.sign_out().await.unwrap();
        rx.wait_for(|state| state.user.is_none()).await.unwrap();

        handle.abort();
    }

    #[tokio::test]
    async fn auth_events_clear_recorded_error() {
        let (gateway, controller) = controller();
        controller.sign_in("ada@example.com", "123").await.unwrap_err();
        assert!(controller.snapshot().error.is_some());

        let handle = controller.observe();
        let mut rx = controller.subscribe();
        gateway
            .sign_up(
                &Credentials::new("ada@example.com", "secret1"),
                &SignUpOptions::default(),
            )
            .await
            .unwrap();

        let state = rx
            .wait_for(|state| state.user.is_some())
            .await
            .unwrap()
            .clone();
        assert!(state.error.is_none());

        handle.abort();
    }
}
