use crate::constants::MAX_FILE_SIZE_BYTES;
use crate::models::FileType;

/// Local checks a file must pass before anything is sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File type not supported. Please upload PDF, DOCX, PNG, or JPG files.")]
    UnsupportedType { extension: String },

    #[error("File size too large. Maximum size is {max_mb}MB.")]
    FileTooLarge { size: u64, max: u64, max_mb: u64 },
}

/// Upload file validator
///
/// Checks the extension against the accepted [`FileType`]s, then the size
/// against the configured cap. Empty files are accepted.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
}

impl FileValidator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<FileType, ValidationError> {
        FileType::from_filename(filename).ok_or_else(|| ValidationError::UnsupportedType {
            extension: filename
                .rsplit('.')
                .next()
                .unwrap_or_default()
                .to_lowercase(),
        })
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
                max_mb: self.max_file_size / (1024 * 1024),
            });
        }
        Ok(())
    }

    /// Validate type then size; returns the parsed type on success.
    pub fn validate(&self, filename: &str, size: u64) -> Result<FileType, ValidationError> {
        let file_type = self.validate_extension(filename)?;
        self.validate_file_size(size)?;
        Ok(file_type)
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(MAX_FILE_SIZE_BYTES)
    }
}
