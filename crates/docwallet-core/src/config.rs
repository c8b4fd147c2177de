//! Configuration module
//!
//! Wallet settings come from `DOCWALLET_*` environment variables (the binary
//! loads `.env` first). Every value except the gateway endpoint has a default.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DOCUMENTS_BUCKET, DOCUMENTS_TABLE, MAX_FILE_SIZE_BYTES, SIGNED_URL_TTL_SECS,
    UPLOAD_STATUS_GRACE_SECS,
};
use crate::gateway_types::GatewayBackend;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_ENVIRONMENT: &str = "development";
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Clone, Debug)]
pub struct WalletConfig {
    pub gateway_backend: GatewayBackend,
    pub gateway_url: Option<String>,
    pub gateway_api_key: Option<String>,
    pub bucket: String,
    pub table: String,
    pub max_file_size_bytes: u64,
    pub signed_url_ttl_secs: u64,
    pub upload_status_grace_secs: u64,
    pub request_timeout_secs: u64,
    pub session_file: Option<PathBuf>,
    pub environment: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            gateway_backend: GatewayBackend::Rest,
            gateway_url: None,
            gateway_api_key: None,
            bucket: DOCUMENTS_BUCKET.to_string(),
            table: DOCUMENTS_TABLE.to_string(),
            max_file_size_bytes: MAX_FILE_SIZE_BYTES,
            signed_url_ttl_secs: SIGNED_URL_TTL_SECS,
            upload_status_grace_secs: UPLOAD_STATUS_GRACE_SECS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            session_file: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

impl WalletConfig {
    /// In-memory configuration, used by tests and embedders.
    pub fn memory() -> Self {
        Self {
            gateway_backend: GatewayBackend::Memory,
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let gateway_backend = match get("DOCWALLET_GATEWAY") {
            Some(value) => value.parse()?,
            None => GatewayBackend::Rest,
        };

        let max_file_size_bytes = get("DOCWALLET_MAX_FILE_SIZE_MB")
            .and_then(|s| s.parse::<u64>().ok())
            .map(|mb| mb * 1024 * 1024)
            .unwrap_or(MAX_FILE_SIZE_BYTES);

        let config = WalletConfig {
            gateway_backend,
            gateway_url: get("DOCWALLET_GATEWAY_URL")
                .or_else(|| get("SUPABASE_URL"))
                .map(|url| url.trim_end_matches('/').to_string()),
            gateway_api_key: get("DOCWALLET_GATEWAY_KEY").or_else(|| get("SUPABASE_ANON_KEY")),
            bucket: get("DOCWALLET_BUCKET").unwrap_or_else(|| DOCUMENTS_BUCKET.to_string()),
            table: get("DOCWALLET_TABLE").unwrap_or_else(|| DOCUMENTS_TABLE.to_string()),
            max_file_size_bytes,
            signed_url_ttl_secs: get("DOCWALLET_SIGNED_URL_TTL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(SIGNED_URL_TTL_SECS),
            upload_status_grace_secs: get("DOCWALLET_UPLOAD_STATUS_GRACE_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(UPLOAD_STATUS_GRACE_SECS),
            request_timeout_secs: get("DOCWALLET_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(REQUEST_TIMEOUT_SECS),
            session_file: get("DOCWALLET_SESSION_FILE")
                .map(PathBuf::from)
                .or_else(|| {
                    get("HOME").map(|home| {
                        PathBuf::from(home)
                            .join(".docwallet")
                            .join(SESSION_FILE_NAME)
                    })
                }),
            environment: get("DOCWALLET_ENV").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.gateway_backend == GatewayBackend::Rest {
            let url = self.gateway_url.as_deref().ok_or_else(|| {
                anyhow::anyhow!("DOCWALLET_GATEWAY_URL must be set when using the rest gateway")
            })?;
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!(
                    "DOCWALLET_GATEWAY_URL must be an http(s) URL"
                ));
            }
            if self.gateway_api_key.is_none() {
                return Err(anyhow::anyhow!(
                    "DOCWALLET_GATEWAY_KEY must be set when using the rest gateway"
                ));
            }
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "DOCWALLET_MAX_FILE_SIZE_MB must be greater than zero"
            ));
        }

        if self.signed_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!(
                "DOCWALLET_SIGNED_URL_TTL_SECS must be greater than zero"
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }

    pub fn upload_status_grace(&self) -> Duration {
        Duration::from_secs(self.upload_status_grace_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
