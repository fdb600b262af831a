use thiserror::Error;

/// Every way a backup cycle can stop. The first error raised by a stage is
/// returned to the caller as-is; nothing after it runs.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Could not parse connection string: {0}")]
    ConnectionParse(String),

    #[error("Database dump failed: {0}")]
    DumpFailure(String),

    #[error("Upload failed: {0}")]
    UploadFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<url::ParseError> for BackupError {
    fn from(err: url::ParseError) -> Self {
        BackupError::ConnectionParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
