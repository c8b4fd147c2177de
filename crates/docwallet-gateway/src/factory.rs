#[cfg(feature = "gateway-memory")]
use crate::InMemoryGateway;
#[cfg(feature = "gateway-rest")]
use crate::RestGateway;
use crate::{GatewayBackend, GatewayResult, StorageGateway};
use docwallet_core::WalletConfig;
use std::sync::Arc;

/// Create a storage gateway based on configuration
pub fn create_gateway(config: &WalletConfig) -> GatewayResult<Arc<dyn StorageGateway>> {
    match config.gateway_backend {
        #[cfg(feature = "gateway-rest")]
        GatewayBackend::Rest => {
            let gateway = RestGateway::from_config(config)?;
            tracing::debug!(base_url = %gateway.base_url(), "Using REST gateway");
            Ok(Arc::new(gateway))
        }

        #[cfg(not(feature = "gateway-rest"))]
        GatewayBackend::Rest => Err(crate::GatewayError::ConfigError(
            "REST gateway not available (gateway-rest feature not enabled)".to_string(),
        )),

        #[cfg(feature = "gateway-memory")]
        GatewayBackend::Memory => {
            tracing::debug!("Using in-memory gateway");
            Ok(Arc::new(InMemoryGateway::new()))
        }

        #[cfg(not(feature = "gateway-memory"))]
        GatewayBackend::Memory => Err(crate::GatewayError::ConfigError(
            "In-memory gateway not available (gateway-memory feature not enabled)".to_string(),
        )),
    }
}
