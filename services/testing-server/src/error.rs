//! Failure taxonomy of the testing server.

use crosscheck_crypto::CryptoError;
use thiserror::Error;
use tonic::Status;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// The request's keyset could not be turned into a valid handle.
    #[error("keyset resolution failed: {0}")]
    Resolution(String),

    /// The handle does not yield the requested primitive.
    #[error("primitive construction failed: {0}")]
    Construction(String),

    /// The primitive operation itself failed.
    #[error(transparent)]
    Operation(#[from] CryptoError),

    /// Startup only.
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

impl From<HarnessError> for Status {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::Resolution(_) => Status::invalid_argument(err.to_string()),
            HarnessError::Construction(_) => Status::failed_precondition(err.to_string()),
            HarnessError::Operation(_) => Status::unknown(err.to_string()),
            HarnessError::Configuration(_) => Status::internal(err.to_string()),
        }
    }
}
