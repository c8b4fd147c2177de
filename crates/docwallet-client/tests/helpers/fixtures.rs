use chrono::{DateTime, Duration, Utc};
use docwallet_client::UploadFile;
use docwallet_core::models::Document;
use uuid::Uuid;

pub const MIB: usize = 1024 * 1024;

/// In-memory upload of `size` bytes.
pub fn file(name: &str, size: usize) -> UploadFile {
    UploadFile::from_bytes(name.to_string(), vec![b'x'; size])
}

pub fn pdf(name: &str) -> UploadFile {
    file(name, 2048)
}

/// Stored document owned by `user_id`, uploaded `minutes_ago` before `now`.
pub fn document(
    user_id: Uuid,
    filename: &str,
    file_type: &str,
    minutes_ago: i64,
    now: DateTime<Utc>,
) -> Document {
    Document {
        id: Uuid::new_v4(),
        user_id,
        filename: filename.to_string(),
        file_type: file_type.to_string(),
        file_size: 1024,
        storage_path: format!("{}/{}", user_id, filename),
        upload_date: now - Duration::minutes(minutes_ago),
    }
}
