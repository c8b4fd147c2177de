//! Shared constants.

/// Default object bucket holding document bytes.
pub const DOCUMENTS_BUCKET: &str = "documents";

/// Default table holding document metadata rows.
pub const DOCUMENTS_TABLE: &str = "documents";

/// Column the document list is ordered by.
pub const UPLOAD_DATE_COLUMN: &str = "upload_date";

/// 10 MiB.
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

pub const SIGNED_URL_TTL_SECS: u64 = 60;

/// How long a resolved upload status record stays visible.
pub const UPLOAD_STATUS_GRACE_SECS: u64 = 3;

pub const RECENT_UPLOAD_WINDOW_DAYS: i64 = 7;

/// Number of documents shown on the overview; above this the dashboard offers "view all".
pub const OVERVIEW_DOCUMENT_LIMIT: usize = 8;
