use thiserror::Error;

use crate::snapshot::SnapshotError;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Unsupported resource encoding: {0:?} (only base64 is supported)")]
    UnsupportedEncoding(String),

    #[error("Invalid resource payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    #[error("Missing or invalid created timestamp for note '{0}'")]
    MissingTimestamp(String),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl ConvertError {
    /// Whether this error came from decoding a resource payload.
    pub fn is_decoding(&self) -> bool {
        matches!(
            self,
            ConvertError::UnsupportedEncoding(_) | ConvertError::InvalidPayload(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
