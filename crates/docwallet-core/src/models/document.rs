use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// File types the wallet accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Png,
    Jpg,
    Jpeg,
}

impl FileType {
    pub const ALL: [FileType; 5] = [
        FileType::Pdf,
        FileType::Docx,
        FileType::Png,
        FileType::Jpg,
        FileType::Jpeg,
    ];

    /// Lowercase tag stored in the metadata row.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Png => "png",
            FileType::Jpg => "jpg",
            FileType::Jpeg => "jpeg",
        }
    }

    /// Parse the extension (last dot-separated segment) of a filename.
    pub fn from_filename(filename: &str) -> Option<FileType> {
        let extension = filename.rsplit('.').next()?;
        extension.parse().ok()
    }

    pub fn is_image(&self) -> bool {
        matches!(self, FileType::Png | FileType::Jpg | FileType::Jpeg)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileType::Pdf => "application/pdf",
            FileType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileType::Png => "image/png",
            FileType::Jpg | FileType::Jpeg => "image/jpeg",
        }
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(FileType::Pdf),
            "docx" => Ok(FileType::Docx),
            "png" => Ok(FileType::Png),
            "jpg" => Ok(FileType::Jpg),
            "jpeg" => Ok(FileType::Jpeg),
            other => Err(format!("Unsupported file type: {}", other)),
        }
    }
}

impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Metadata row for one stored file.
///
/// `file_type` is kept as the raw tag from the row so documents written by
/// other clients still load; use [`Document::kind`] for the typed view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub file_type: String,
    pub file_size: u64,
    pub storage_path: String,
    pub upload_date: DateTime<Utc>,
}

impl Document {
    pub fn kind(&self) -> Option<FileType> {
        self.file_type.parse().ok()
    }

    pub fn is_image(&self) -> bool {
        self.kind().is_some_and(|kind| kind.is_image())
    }
}

/// Row inserted after the object upload; the gateway assigns `id` and `upload_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub user_id: Uuid,
    pub filename: String,
    pub file_type: String,
    pub file_size: u64,
    pub storage_path: String,
}

impl NewDocument {
    /// Materialize the row the way the metadata table would.
    pub fn into_document(self, id: Uuid, upload_date: DateTime<Utc>) -> Document {
        Document {
            id,
            user_id: self.user_id,
            filename: self.filename,
            file_type: self.file_type,
            file_size: self.file_size,
            storage_path: self.storage_path,
            upload_date,
        }
    }
}
