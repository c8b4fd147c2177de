//! Docwallet Gateway Library
//!
//! This crate provides the storage gateway abstraction the wallet talks to:
//! authentication, object storage, signed URLs and metadata rows. It includes
//! the [`StorageGateway`] trait, a Supabase-compatible REST implementation and
//! an in-memory implementation.
//!
//! # Object path format
//!
//! Objects are scoped by owner: `{user_id}/{unix_millis}-{random}.{ext}`.
//! Paths must not contain `..` or a leading `/`. Path generation lives in the
//! `keys` module so every caller produces the same layout.

pub mod factory;
pub mod keys;
#[cfg(feature = "gateway-memory")]
pub mod memory;
#[cfg(feature = "gateway-rest")]
pub mod rest;
pub mod traits;

// Re-export commonly used types
pub use docwallet_core::GatewayBackend;
pub use factory::create_gateway;
#[cfg(feature = "gateway-memory")]
pub use memory::{GatewayOperation, InMemoryGateway};
#[cfg(feature = "gateway-rest")]
pub use rest::RestGateway;
pub use traits::{AuthEvent, GatewayError, GatewayResult, RowOrder, StorageGateway};
