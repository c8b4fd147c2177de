//! Shared object path generation.
//!
//! Path format: `{user_id}/{unix_millis}-{random base36}.{ext}`.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::traits::{GatewayError, GatewayResult};

const SUFFIX_LEN: usize = 11;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Collision-resistant object name keeping the original extension.
pub fn generate_object_name(extension: &str, now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!(
        "{}-{}.{}",
        now.timestamp_millis(),
        suffix,
        extension.to_lowercase()
    )
}

/// Generate an object path scoped by the owning user.
pub fn generate_object_path(user_id: Uuid, extension: &str, now: DateTime<Utc>) -> String {
    format!("{}/{}", user_id, generate_object_name(extension, now))
}

/// Reject paths that could escape their bucket.
pub fn validate_object_path(path: &str) -> GatewayResult<()> {
    if path.is_empty() || path.contains("..") || path.starts_with('/') {
        return Err(GatewayError::InvalidPath(path.to_string()));
    }
    Ok(())
}
