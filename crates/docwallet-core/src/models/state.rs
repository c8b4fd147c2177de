use serde::Serialize;

use super::{Document, User};

/// Authentication state published by the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    /// Starts in `loading` until the initial session lookup completes.
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
            error: None,
        }
    }
}

/// Document collection state published by the document controller.
///
/// `documents` is most-recent-first: the gateway's order on fetch, with new
/// uploads prepended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentState {
    pub documents: Vec<Document>,
    pub loading: bool,
    pub uploading: bool,
    pub error: Option<String>,
}
