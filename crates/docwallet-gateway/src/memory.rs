use crate::keys::validate_object_path;
use crate::traits::{AuthEvent, GatewayError, GatewayResult, RowOrder, StorageGateway};
use crate::GatewayBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use docwallet_core::constants::UPLOAD_DATE_COLUMN;
use docwallet_core::models::{Credentials, Document, NewDocument, Session, SignUpOptions, User};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 16;

/// Gateway operations, used to inject failures and to inspect call history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOperation {
    GetSession,
    SignUp,
    SignIn,
    SignOut,
    PutObject,
    RemoveObjects,
    DownloadObject,
    CreateSignedUrl,
    InsertRow,
    SelectRows,
    DeleteRow,
}

struct Account {
    user: User,
    password: String,
}

struct StoredRow {
    seq: u64,
    document: Document,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    objects: HashMap<(String, String), Bytes>,
    tables: HashMap<String, Vec<StoredRow>>,
    next_seq: u64,
    failures: HashMap<GatewayOperation, String>,
    calls: Vec<GatewayOperation>,
}

impl State {
    /// Record the call and return the injected failure, if any.
    fn enter(&mut self, op: GatewayOperation) -> GatewayResult<()> {
        self.calls.push(op);
        match self.failures.get(&op) {
            Some(message) => Err(injected_error(op, message.clone())),
            None => Ok(()),
        }
    }

    fn session_user(&self) -> GatewayResult<&User> {
        self.session
            .as_ref()
            .map(|session| &session.user)
            .ok_or(GatewayError::NotAuthenticated)
    }
}

fn injected_error(op: GatewayOperation, message: String) -> GatewayError {
    match op {
        GatewayOperation::GetSession
        | GatewayOperation::SignUp
        | GatewayOperation::SignIn
        | GatewayOperation::SignOut => GatewayError::Auth(message),
        GatewayOperation::PutObject => GatewayError::UploadFailed(message),
        GatewayOperation::RemoveObjects | GatewayOperation::DeleteRow => {
            GatewayError::DeleteFailed(message)
        }
        GatewayOperation::DownloadObject => GatewayError::DownloadFailed(message),
        GatewayOperation::CreateSignedUrl => GatewayError::SignFailed(message),
        GatewayOperation::InsertRow | GatewayOperation::SelectRows => {
            GatewayError::QueryFailed(message)
        }
    }
}

/// Process-local storage gateway
///
/// Keeps accounts, the session, objects and metadata rows in memory. Rows are
/// only visible to the user who owns them, mirroring row-level security on the
/// hosted service. Every operation can be made to fail with
/// [`InMemoryGateway::fail_on`].
pub struct InMemoryGateway {
    state: Mutex<State>,
    events: broadcast::Sender<AuthEvent>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(State::default()),
            events,
        }
    }

    /// Make every subsequent call of `op` fail with `message`.
    pub async fn fail_on(&self, op: GatewayOperation, message: impl Into<String>) {
        self.state.lock().await.failures.insert(op, message.into());
    }

    pub async fn clear_failure(&self, op: GatewayOperation) {
        self.state.lock().await.failures.remove(&op);
    }

    /// Operations invoked so far, in call order.
    pub async fn calls(&self) -> Vec<GatewayOperation> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, op: GatewayOperation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| **call == op)
            .count()
    }

    pub async fn object(&self, bucket: &str, path: &str) -> Option<Bytes> {
        self.state
            .lock()
            .await
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.state.lock().await.objects.len()
    }

    /// Insert a row directly, bypassing session checks.
    pub async fn seed_document(&self, table: &str, document: Document) {
        let mut state = self.state.lock().await;
        state.next_seq += 1;
        let seq = state.next_seq;
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(StoredRow { seq, document });
    }

    /// Row count across all owners.
    pub async fn row_count(&self, table: &str) -> usize {
        self.state
            .lock()
            .await
            .tables
            .get(table)
            .map_or(0, |rows| rows.len())
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn new_session(user: User) -> Session {
        Session {
            access_token: format!("memory-{}", Uuid::new_v4()),
            refresh_token: None,
            expires_at: None,
            user,
        }
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageGateway for InMemoryGateway {
    async fn get_session(&self) -> GatewayResult<Option<Session>> {
        let mut state = self.state.lock().await;
        state.enter(GatewayOperation::GetSession)?;
        Ok(state.session.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        options: &SignUpOptions,
    ) -> GatewayResult<Option<Session>> {
        let mut state = self.state.lock().await;
        state.enter(GatewayOperation::SignUp)?;

        let key = credentials.email.to_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(GatewayError::Auth("User already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: credentials.email.clone(),
            created_at: Utc::now(),
        };
        state.accounts.insert(
            key,
            Account {
                user: user.clone(),
                password: credentials.password.clone(),
            },
        );

        // A confirmation redirect means the account waits for the email link
        if options.email_redirect_to.is_some() {
            tracing::debug!(email = %credentials.email, "Account pending email confirmation");
            return Ok(None);
        }

        let session = Self::new_session(user.clone());
        state.session = Some(session.clone());
        drop(state);

        self.emit(AuthEvent::SignedIn(user));
        Ok(Some(session))
    }

    async fn sign_in(&self, credentials: &Credentials) -> GatewayResult<Session> {
        let mut state = self.state.lock().await;
        state.enter(GatewayOperation::SignIn)?;

        let user = match state.accounts.get(&credentials.email.to_lowercase()) {
            Some(account) if account.password == credentials.password => account.user.clone(),
            _ => return Err(GatewayError::Auth("Invalid login credentials".to_string())),
        };

        let session = Self::new_session(user.clone());
        state.session = Some(session.clone());
        drop(state);

        self.emit(AuthEvent::SignedIn(user));
        Ok(session)
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        let mut state = self.state.lock().await;
        state.enter(GatewayOperation::SignOut)?;
        state.session = None;
        drop(state);

        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> GatewayResult<()> {
        let mut state = self.state.lock().await;
        state.enter(GatewayOperation::PutObject)?;
        state.session_user()?;
        validate_object_path(path)?;

        let key = (bucket.to_string(), path.to_string());
        if state.objects.contains_key(&key) {
            return Err(GatewayError::UploadFailed(
                "The resource already exists".to_string(),
            ));
        }

        tracing::debug!(
            bucket = %bucket,
            path = %path,
            content_type = %content_type,
            size_bytes = data.len(),
            "In-memory object stored"
        );
        state.objects.insert(key, data);
        Ok(())
    }

    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> GatewayResult<()> {
        let mut state = self.state.lock().await;
        state.enter(GatewayOperation::RemoveObjects)?;
        state.session_user()?;

        for path in paths {
            state.objects.remove(&(bucket.to_string(), path.clone()));
        }
        Ok(())
    }

    async fn download_object(&self, bucket: &str, path: &str) -> GatewayResult<Bytes> {
        let mut state = self.state.lock().await;
        state.enter(GatewayOperation::DownloadObject)?;
        state.session_user()?;

        state
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(path.to_string()))
    }

    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> GatewayResult<String> {
        let mut state = self.state.lock().await;
        state.enter(GatewayOperation::CreateSignedUrl)?;
        state.session_user()?;

        if !state
            .objects
            .contains_key(&(bucket.to_string(), path.to_string()))
        {
            return Err(GatewayError::NotFound(path.to_string()));
        }

        let expires_at = Utc::now().timestamp() + expires_in.as_secs() as i64;
        Ok(format!(
            "memory://{}/{}?expires={}",
            bucket,
            urlencoding::encode(path),
            expires_at
        ))
    }

    async fn insert_document(&self, table: &str, row: &NewDocument) -> GatewayResult<Document> {
        let mut state = self.state.lock().await;
        state.enter(GatewayOperation::InsertRow)?;
        let user_id = state.session_user()?.id;
        if row.user_id != user_id {
            return Err(GatewayError::QueryFailed(
                "new row violates row-level security policy".to_string(),
            ));
        }

        let document = row.clone().into_document(Uuid::new_v4(), Utc::now());
        state.next_seq += 1;
        let seq = state.next_seq;
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(StoredRow {
                seq,
                document: document.clone(),
            });
        Ok(document)
    }

    async fn select_documents(
        &self,
        table: &str,
        order: &RowOrder,
    ) -> GatewayResult<Vec<Document>> {
        let mut state = self.state.lock().await;
        state.enter(GatewayOperation::SelectRows)?;

        let Some(user_id) = state.session.as_ref().map(|s| s.user.id) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<&StoredRow> = state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.document.user_id == user_id)
                    .collect()
            })
            .unwrap_or_default();

        if order.column != UPLOAD_DATE_COLUMN {
            return Err(GatewayError::QueryFailed(format!(
                "unsupported order column: {}",
                order.column
            )));
        }
        // Insertion sequence breaks timestamp ties
        rows.sort_by(|a, b| {
            let ordering = a
                .document
                .upload_date
                .cmp(&b.document.upload_date)
                .then(a.seq.cmp(&b.seq));
            if order.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });

        Ok(rows.into_iter().map(|row| row.document.clone()).collect())
    }

    async fn delete_document(&self, table: &str, id: Uuid) -> GatewayResult<()> {
        let mut state = self.state.lock().await;
        state.enter(GatewayOperation::DeleteRow)?;
        let user_id = state.session_user()?.id;

        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|row| !(row.document.id == id && row.document.user_id == user_id));
        }
        Ok(())
    }

    fn backend_type(&self) -> GatewayBackend {
        GatewayBackend::Memory
    }
}
