use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerritorialError {
    #[error("Spreadsheet is missing required columns {missing:?} (columns found: {found:?})")]
    Schema {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),

    /// Batches before `batch_index` are already persisted and stay that way.
    #[error("Storage write failed on batch {batch_index} ({committed_records} records already committed): {message}")]
    StorageWrite {
        batch_index: usize,
        committed_records: usize,
        message: String,
    },

    #[error("Storage read failed at offset {offset}: {message}")]
    StorageRead { offset: usize, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TerritorialError {
    /// The underlying message without the variant prefix, used when re-wrapping store errors
    pub fn detail(&self) -> String {
        match self {
            TerritorialError::StorageWrite { message, .. }
            | TerritorialError::StorageRead { message, .. } => message.clone(),
            TerritorialError::Auth(message)
            | TerritorialError::Spreadsheet(message)
            | TerritorialError::Config(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TerritorialError>;
