//! Data models for the wallet
//!
//! Each sub-module represents one feature area; everything is re-exported here.

mod document;
mod state;
mod upload;
mod user;

pub use document::*;
pub use state::*;
pub use upload::*;
pub use user::*;
