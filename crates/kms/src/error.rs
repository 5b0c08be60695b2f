use crosscheck_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KmsError {
    #[error("invalid key URI '{uri}': {reason}")]
    InvalidKeyUri { uri: String, reason: String },

    #[error("key URI {uri} is not served by this client")]
    UnsupportedKeyUri { uri: String },

    #[error("credentials error: {0}")]
    Credentials(String),

    #[error("client setup failed: {0}")]
    Setup(String),

    #[error("{backend} request failed: {message}")]
    Request {
        backend: &'static str,
        message: String,
    },

    #[error("{backend} response is missing {field}")]
    MalformedResponse {
        backend: &'static str,
        field: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type KmsResult<T> = Result<T, KmsError>;

impl From<KmsError> for CryptoError {
    fn from(err: KmsError) -> Self {
        CryptoError::Kms(err.to_string())
    }
}
