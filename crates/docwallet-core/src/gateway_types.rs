use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage gateway backend types
///
/// Defined in core because it's used by configuration and by the gateway factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayBackend {
    /// Supabase-compatible HTTP service
    Rest,
    /// Process-local gateway; state is lost when the process exits
    Memory,
}

impl FromStr for GatewayBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rest" | "supabase" => Ok(GatewayBackend::Rest),
            "memory" => Ok(GatewayBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid gateway backend: {}", s)),
        }
    }
}

impl Display for GatewayBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            GatewayBackend::Rest => write!(f, "rest"),
            GatewayBackend::Memory => write!(f, "memory"),
        }
    }
}
