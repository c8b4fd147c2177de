//! Docwallet Core Library
//!
//! This crate provides the domain models, error types, configuration, validation
//! and the pure document query engine shared by all docwallet components.
//! Nothing in here performs I/O.

pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod gateway_types;
pub mod models;
pub mod query;
pub mod stats;
pub mod validation;

// Re-export commonly used types
pub use config::WalletConfig;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use format::{format_file_size, kind_label};
pub use gateway_types::GatewayBackend;
pub use query::{DocumentQuery, SortDirection, SortKey, SortState, TypeFilter};
pub use stats::DocumentStats;
pub use validation::{FileValidator, ValidationError};
