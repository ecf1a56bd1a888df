use convertifile::ConvertError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("conversion error: {0}")]
    Convert(String),

    #[error("engine not initialized")]
    EngineNotInitialized,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("busy: {0}")]
    Busy(String),
}

impl Error {
    pub fn code(&self) -> i32 {
        match self {
            Error::Convert(_) => -1,
            Error::EngineNotInitialized => -2,
            Error::Storage(_) => -3,
            Error::Io(_) => -4,
            Error::Serialization(_) => -5,
            Error::Decode(_) => -6,
            Error::InvalidInput(_) => -7,
            Error::NotFound(_) => -8,
            Error::Network(_) => -9,
            Error::Busy(_) => -10,
        }
    }
}

impl From<ConvertError> for Error {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::InvalidInput { field, message } => {
                Error::InvalidInput(format!("{}: {}", field, message))
            }
            ConvertError::Network { message, .. } => Error::Network(message),
            ConvertError::Storage { message, .. } => Error::Storage(message),
            other => Error::Convert(other.to_string()),
        }
    }
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
