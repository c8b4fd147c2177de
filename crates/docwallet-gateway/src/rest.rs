//! Supabase-compatible REST gateway.
//!
//! Talks to three services under one base URL:
//! - `/auth/v1` for accounts and sessions
//! - `/storage/v1` for objects and signed URLs
//! - `/rest/v1` for metadata rows
//!
//! Every request carries the project `apikey` header; authenticated requests
//! also send the session access token as a bearer token. The session is kept in
//! memory and, when a session file is configured, persisted between runs.

use crate::keys::validate_object_path;
use crate::traits::{AuthEvent, GatewayError, GatewayResult, RowOrder, StorageGateway};
use crate::GatewayBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use docwallet_core::models::{Credentials, Document, NewDocument, Session, SignUpOptions, User};
use docwallet_core::WalletConfig;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 16;

/// Token grant returned by `/auth/v1/token` and by auto-confirmed sign-ups.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| {
                self.expires_in
                    .map(|secs| now + chrono::Duration::seconds(secs))
            });
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Sign-up answers with a session when the account is active right away,
/// otherwise with the bare user awaiting confirmation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Active(TokenResponse),
    Pending(User),
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Gateway backed by a hosted Supabase-compatible project
pub struct RestGateway {
    client: Client,
    base_url: String,
    api_key: String,
    session: RwLock<Option<Session>>,
    session_file: Option<PathBuf>,
    events: broadcast::Sender<AuthEvent>,
}

impl RestGateway {
    /// Create a new REST gateway
    ///
    /// # Arguments
    /// * `base_url` - Project URL (e.g., "https://abc.supabase.co")
    /// * `api_key` - Project anon key
    /// * `timeout` - Per-request timeout
    /// * `session_file` - Where the session is persisted, if anywhere
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        session_file: Option<PathBuf>,
    ) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let session = session_file.as_deref().and_then(load_session);
        if let Some(session) = &session {
            tracing::debug!(user_id = %session.user.id, "Restored persisted session");
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            session: RwLock::new(session),
            session_file,
            events,
        })
    }

    pub fn from_config(config: &WalletConfig) -> GatewayResult<Self> {
        let base_url = config
            .gateway_url
            .clone()
            .ok_or_else(|| GatewayError::ConfigError("DOCWALLET_GATEWAY_URL not configured".to_string()))?;
        let api_key = config
            .gateway_api_key
            .clone()
            .ok_or_else(|| GatewayError::ConfigError("DOCWALLET_GATEWAY_KEY not configured".to_string()))?;

        Self::new(
            base_url,
            api_key,
            config.request_timeout(),
            config.session_file.clone(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        self.url(&format!("/storage/v1/object/{}/{}", bucket, path))
    }

    /// Attach the project key and the bearer token. Anonymous requests use the
    /// project key as their bearer token.
    fn apply_auth(&self, request: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
        let token = session
            .map(|s| s.access_token.as_str())
            .unwrap_or(self.api_key.as_str());
        request.header("apikey", &self.api_key).bearer_auth(token)
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn require_session(&self) -> GatewayResult<Session> {
        self.get_session()
            .await?
            .ok_or(GatewayError::NotAuthenticated)
    }

    async fn set_session(&self, session: Option<Session>) -> GatewayResult<()> {
        *self.session.write().await = session.clone();

        let Some(path) = &self.session_file else {
            return Ok(());
        };
        match session {
            Some(session) => persist_session(path, &session).await,
            None => match tokio::fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
        }
    }

    async fn refresh(&self, session: Session) -> GatewayResult<Option<Session>> {
        let Some(refresh_token) = session.refresh_token else {
            tracing::info!("Session expired without refresh token");
            self.set_session(None).await?;
            self.emit(AuthEvent::SignedOut);
            return Ok(None);
        };

        let response = self
            .client
            .post(self.url("/auth/v1/token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.api_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            let message = failure_message(response).await;
            tracing::warn!(error = %message, "Session refresh rejected, signing out");
            self.set_session(None).await?;
            self.emit(AuthEvent::SignedOut);
            return Ok(None);
        }

        let token: TokenResponse = response.json().await?;
        let session = token.into_session(Utc::now());
        self.set_session(Some(session.clone())).await?;

        tracing::debug!(user_id = %session.user.id, "Session refreshed");
        self.emit(AuthEvent::TokenRefreshed(session.user.clone()));
        Ok(Some(session))
    }
}

#[async_trait]
impl StorageGateway for RestGateway {
    async fn get_session(&self) -> GatewayResult<Option<Session>> {
        let current = self.session.read().await.clone();
        match current {
            Some(session) if session.is_expired(Utc::now()) => self.refresh(session).await,
            other => Ok(other),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        options: &SignUpOptions,
    ) -> GatewayResult<Option<Session>> {
        let mut request = self.client.post(self.url("/auth/v1/signup"));
        if let Some(redirect) = &options.email_redirect_to {
            request = request.query(&[("redirect_to", redirect.as_str())]);
        }

        let response = request
            .header("apikey", &self.api_key)
            .json(&json!({
                "email": credentials.email,
                "password": credentials.password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Auth(failure_message(response).await));
        }

        match response.json::<SignUpResponse>().await? {
            SignUpResponse::Active(token) => {
                let session = token.into_session(Utc::now());
                self.set_session(Some(session.clone())).await?;
                tracing::info!(user_id = %session.user.id, "Account created and signed in");
                self.emit(AuthEvent::SignedIn(session.user.clone()));
                Ok(Some(session))
            }
            SignUpResponse::Pending(user) => {
                tracing::info!(user_id = %user.id, "Account created, awaiting email confirmation");
                Ok(None)
            }
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> GatewayResult<Session> {
        let response = self
            .client
            .post(self.url("/auth/v1/token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&json!({
                "email": credentials.email,
                "password": credentials.password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Auth(failure_message(response).await));
        }

        let token: TokenResponse = response.json().await?;
        let session = token.into_session(Utc::now());
        self.set_session(Some(session.clone())).await?;

        tracing::info!(user_id = %session.user.id, "Signed in");
        self.emit(AuthEvent::SignedIn(session.user.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        let current = self.session.read().await.clone();

        if let Some(session) = &current {
            let result = self
                .apply_auth(self.client.post(self.url("/auth/v1/logout")), Some(session))
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    let message = failure_message(response).await;
                    tracing::warn!(error = %message, "Remote sign-out rejected, clearing local session");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Remote sign-out failed, clearing local session");
                }
            }
        }

        self.set_session(None).await?;
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
        validate_object_path(path)?;
        let session = self.require_session().await?;
        let size = data.len();

        let response = self
            .apply_auth(self.client.post(self.object_url(bucket, path)), Some(&session))
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::UploadFailed(failure_message(response).await));
        }

        tracing::debug!(bucket = %bucket, path = %path, size_bytes = size, "Object uploaded");
        Ok(())
    }

    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> GatewayResult<()> {
        let session = self.require_session().await?;

        let response = self
            .apply_auth(
                self.client
                    .delete(self.url(&format!("/storage/v1/object/{}", bucket))),
                Some(&session),
            )
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::DeleteFailed(failure_message(response).await));
        }

        tracing::debug!(bucket = %bucket, count = paths.len(), "Objects removed");
        Ok(())
    }

    async fn download_object(&self, bucket: &str, path: &str) -> GatewayResult<Bytes> {
        validate_object_path(path)?;
        let session = self.require_session().await?;

        let response = self
            .apply_auth(
                self.client.get(self.url(&format!(
                    "/storage/v1/object/authenticated/{}/{}",
                    bucket, path
                ))),
                Some(&session),
            )
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(GatewayError::DownloadFailed(failure_message(response).await));
        }

        Ok(response.bytes().await?)
    }

    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> GatewayResult<String> {
        validate_object_path(path)?;
        let session = self.require_session().await?;

        let response = self
            .apply_auth(
                self.client
                    .post(self.url(&format!("/storage/v1/object/sign/{}/{}", bucket, path))),
                Some(&session),
            )
            .json(&json!({ "expiresIn": expires_in.as_secs() }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(GatewayError::SignFailed(failure_message(response).await));
        }

        let signed: SignedUrlResponse = response.json().await?;
        Ok(self.url(&format!("/storage/v1{}", signed.signed_url)))
    }

    async fn insert_document(&self, table: &str, row: &NewDocument) -> GatewayResult<Document> {
        let session = self.require_session().await?;

        let response = self
            .apply_auth(
                self.client.post(self.url(&format!("/rest/v1/{}", table))),
                Some(&session),
            )
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::QueryFailed(failure_message(response).await));
        }

        let mut rows: Vec<Document> = response.json().await?;
        if rows.is_empty() {
            return Err(GatewayError::QueryFailed(
                "insert returned no rows".to_string(),
            ));
        }
        Ok(rows.swap_remove(0))
    }

    async fn select_documents(
        &self,
        table: &str,
        order: &RowOrder,
    ) -> GatewayResult<Vec<Document>> {
        let session = self.get_session().await?;
        let direction = if order.ascending { "asc" } else { "desc" };

        let response = self
            .apply_auth(
                self.client.get(self.url(&format!("/rest/v1/{}", table))),
                session.as_ref(),
            )
            .query(&[
                ("select", "*".to_string()),
                ("order", format!("{}.{}", order.column, direction)),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::QueryFailed(failure_message(response).await));
        }

        Ok(response.json().await?)
    }

    async fn delete_document(&self, table: &str, id: Uuid) -> GatewayResult<()> {
        let session = self.require_session().await?;

        let response = self
            .apply_auth(
                self.client.delete(self.url(&format!("/rest/v1/{}", table))),
                Some(&session),
            )
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::DeleteFailed(failure_message(response).await));
        }
        Ok(())
    }

    fn backend_type(&self) -> GatewayBackend {
        GatewayBackend::Rest
    }
}

/// Human-readable message from an error response.
async fn failure_message(response: Response) -> String {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    extract_message(&text).unwrap_or_else(|| {
        if text.trim().is_empty() {
            format!("Request failed with status {}", status)
        } else {
            text
        }
    })
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

fn load_session(path: &Path) -> Option<Session> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
            None
        }
    }
}

async fn persist_session(path: &Path, session: &Session) -> GatewayResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_vec_pretty(session)
        .map_err(|e| GatewayError::BackendError(format!("Failed to encode session: {}", e)))?;
    tokio::fs::write(path, content).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const USER_ID: &str = "5f0c8a4e-3b1f-4f7e-9d4e-2a1b3c4d5e6f";

    fn token_body(access_token: &str) -> String {
        json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "user": {
                "id": USER_ID,
                "email": "ada@example.com",
                "created_at": "2024-01-01T00:00:00Z",
                "role": "authenticated"
            }
        })
        .to_string()
    }

    fn build_gateway(server: &mockito::Server, session_file: Option<PathBuf>) -> RestGateway {
        RestGateway::new(server.url(), "anon", Duration::from_secs(5), session_file).unwrap()
    }

    async fn signed_in(server: &mut mockito::Server) -> RestGateway {
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("token-1"))
            .create_async()
            .await;

        let gateway = build_gateway(server, None);
        gateway
            .sign_in(&Credentials::new("ada@example.com", "secret1"))
            .await
            .unwrap();
        gateway
    }

    #[tokio::test]
    async fn sign_in_persists_session_and_notifies() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
            .match_header("apikey", "anon")
            .match_body(Matcher::PartialJson(json!({ "email": "ada@example.com" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body("token-1"))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("session.json");
        let gateway = build_gateway(&server, Some(file.clone()));
        let mut events = gateway.subscribe();

        let session = gateway
            .sign_in(&Credentials::new("ada@example.com", "secret1"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(session.access_token, "token-1");
        assert!(session.expires_at.is_some());
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedIn(_)));

        // A fresh gateway picks the session back up
        let restored = build_gateway(&server, Some(file.clone()));
        let current = restored.get_session().await.unwrap().unwrap();
        assert_eq!(current.user.email, "ada@example.com");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&file).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn sign_in_failure_surfaces_service_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(
                json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid login credentials"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = build_gateway(&server, None)
            .sign_in(&Credentials::new("ada@example.com", "wrong-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Auth(ref m) if m == "Invalid login credentials"));
    }

    #[tokio::test]
    async fn sign_up_pending_confirmation_returns_no_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/signup")
            .match_query(Matcher::UrlEncoded(
                "redirect_to".into(),
                "https://wallet.example.com".into(),
            ))
            .with_status(200)
            .with_body(
                json!({
                    "id": USER_ID,
                    "email": "ada@example.com",
                    "created_at": "2024-01-01T00:00:00Z",
                    "confirmation_sent_at": "2024-01-01T00:00:00Z"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let gateway = build_gateway(&server, None);
        let session = gateway
            .sign_up(
                &Credentials::new("ada@example.com", "secret1"),
                &SignUpOptions {
                    email_redirect_to: Some("https://wallet.example.com".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(session.is_none());
        assert!(gateway.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_up_without_redirect_signs_in() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/signup")
            .with_status(200)
            .with_body(token_body("token-new"))
            .create_async()
            .await;

        let gateway = build_gateway(&server, None);
        let session = gateway
            .sign_up(
                &Credentials::new("ada@example.com", "secret1"),
                &SignUpOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(session.unwrap().access_token, "token-new");
    }

    #[tokio::test]
    async fn select_documents_sends_bearer_and_order() {
        let mut server = mockito::Server::new_async().await;
        let gateway = signed_in(&mut server).await;

        let mock = server
            .mock("GET", "/rest/v1/documents")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), "*".into()),
                Matcher::UrlEncoded("order".into(), "upload_date.desc".into()),
            ]))
            .match_header("authorization", "Bearer token-1")
            .match_header("apikey", "anon")
            .with_status(200)
            .with_body(
                json!([{
                    "id": "0b8f6d1e-6f0a-4b7a-9c52-1f2e3d4c5b6a",
                    "user_id": USER_ID,
                    "filename": "passport.pdf",
                    "file_type": "pdf",
                    "file_size": 2048,
                    "storage_path": format!("{}/1700000000000-abc.pdf", USER_ID),
                    "upload_date": "2024-03-01T10:00:00.123456+00:00"
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let docs = gateway
            .select_documents("documents", &RowOrder::descending("upload_date"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].filename, "passport.pdf");
        assert_eq!(docs[0].file_size, 2048);
    }

    #[tokio::test]
    async fn insert_document_returns_representation() {
        let mut server = mockito::Server::new_async().await;
        let gateway = signed_in(&mut server).await;

        let mock = server
            .mock("POST", "/rest/v1/documents")
            .match_header("prefer", "return=representation")
            .match_body(Matcher::PartialJson(json!({ "filename": "id.png" })))
            .with_status(201)
            .with_body(
                json!([{
                    "id": "0b8f6d1e-6f0a-4b7a-9c52-1f2e3d4c5b6a",
                    "user_id": USER_ID,
                    "filename": "id.png",
                    "file_type": "png",
                    "file_size": 10,
                    "storage_path": "p/1-a.png",
                    "upload_date": "2024-03-01T10:00:00Z"
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let row = NewDocument {
            user_id: USER_ID.parse().unwrap(),
            filename: "id.png".to_string(),
            file_type: "png".to_string(),
            file_size: 10,
            storage_path: "p/1-a.png".to_string(),
        };
        let doc = gateway.insert_document("documents", &row).await.unwrap();

        mock.assert_async().await;
        assert_eq!(doc.filename, "id.png");
    }

    #[tokio::test]
    async fn signed_url_is_absolute() {
        let mut server = mockito::Server::new_async().await;
        let gateway = signed_in(&mut server).await;

        server
            .mock("POST", "/storage/v1/object/sign/documents/u/1-a.pdf")
            .match_body(Matcher::Json(json!({ "expiresIn": 60 })))
            .with_status(200)
            .with_body(json!({ "signedURL": "/object/sign/documents/u/1-a.pdf?token=xyz" }).to_string())
            .create_async()
            .await;

        let url = gateway
            .create_signed_url("documents", "u/1-a.pdf", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/sign/documents/u/1-a.pdf?token=xyz",
                server.url()
            )
        );
    }

    #[tokio::test]
    async fn storage_errors_map_to_gateway_errors() {
        let mut server = mockito::Server::new_async().await;
        let gateway = signed_in(&mut server).await;

        server
            .mock("POST", "/storage/v1/object/documents/u/1-a.pdf")
            .with_status(400)
            .with_body(json!({ "statusCode": "404", "error": "Bucket not found", "message": "Bucket not found" }).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/storage/v1/object/authenticated/documents/u/missing.pdf")
            .with_status(404)
            .create_async()
            .await;

        let err = gateway
            .put_object("documents", "u/1-a.pdf", "application/pdf", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Upload failed: Bucket not found");

        let err = gateway
            .download_object("documents", "u/missing.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_filters_by_id() {
        let mut server = mockito::Server::new_async().await;
        let gateway = signed_in(&mut server).await;
        let id = Uuid::new_v4();

        let rows = server
            .mock("DELETE", "/rest/v1/documents")
            .match_query(Matcher::UrlEncoded("id".into(), format!("eq.{}", id)))
            .with_status(204)
            .create_async()
            .await;
        let objects = server
            .mock("DELETE", "/storage/v1/object/documents")
            .match_body(Matcher::Json(json!({ "prefixes": ["u/1-a.pdf"] })))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        gateway
            .remove_objects("documents", &["u/1-a.pdf".to_string()])
            .await
            .unwrap();
        gateway.delete_document("documents", id).await.unwrap();

        objects.assert_async().await;
        rows.assert_async().await;
    }

    #[tokio::test]
    async fn expired_session_is_refreshed() {
        let mut server = mockito::Server::new_async().await;
        let refresh = server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
            .match_body(Matcher::Json(json!({ "refresh_token": "old-refresh" })))
            .with_status(200)
            .with_body(token_body("token-2"))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("session.json");
        let stale = Session {
            access_token: "token-old".to_string(),
            refresh_token: Some("old-refresh".to_string()),
            expires_at: Some(Utc::now() - chrono::Duration::minutes(5)),
            user: User {
                id: USER_ID.parse().unwrap(),
                email: "ada@example.com".to_string(),
                created_at: Utc::now(),
            },
        };
        std::fs::write(&file, serde_json::to_string(&stale).unwrap()).unwrap();

        let gateway = build_gateway(&server, Some(file));
        let mut events = gateway.subscribe();
        let session = gateway.get_session().await.unwrap().unwrap();

        refresh.assert_async().await;
        assert_eq!(session.access_token, "token-2");
        assert!(matches!(
            events.recv().await.unwrap(),
            AuthEvent::TokenRefreshed(_)
        ));
    }

    #[tokio::test]
    async fn sign_out_removes_session_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(token_body("token-1"))
            .create_async()
            .await;
        let logout = server
            .mock("POST", "/auth/v1/logout")
            .match_header("authorization", "Bearer token-1")
            .with_status(204)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("session.json");
        let gateway = build_gateway(&server, Some(file.clone()));
        gateway
            .sign_in(&Credentials::new("ada@example.com", "secret1"))
            .await
            .unwrap();
        assert!(file.exists());

        gateway.sign_out().await.unwrap();

        logout.assert_async().await;
        assert!(!file.exists());
        assert!(gateway.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn anonymous_upload_is_refused_without_request() {
        let server = mockito::Server::new_async().await;
        let err = build_gateway(&server, None)
            .put_object("documents", "u/1-a.pdf", "application/pdf", Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotAuthenticated));
    }

    #[test]
    fn extract_message_prefers_message_fields() {
        assert_eq!(
            extract_message(r#"{"msg":"Email rate limit exceeded"}"#).as_deref(),
            Some("Email rate limit exceeded")
        );
        assert_eq!(extract_message("plain text"), None);
    }
}
