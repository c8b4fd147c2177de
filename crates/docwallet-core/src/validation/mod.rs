//! Validation modules

pub mod file;

pub use file::{FileValidator, ValidationError};
