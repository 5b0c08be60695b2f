//! Error types for keyset handling and primitive operations.

use thiserror::Error;

/// Errors produced by keyset parsing, key management and primitive calls.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid keyset: {0}")]
    InvalidKeyset(String),

    #[error("keyset decoding failed: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("JSON keyset error: {0}")]
    Json(String),

    #[error("no key manager registered for key type {type_url}")]
    UnsupportedKeyType { type_url: String },

    #[error("key type {type_url} does not provide {primitive}")]
    PrimitiveMismatch { type_url: String, primitive: String },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("unsupported parameters: {0}")]
    UnsupportedParameters(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("invalid MAC")]
    InvalidMac,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("PRF computation failed: {0}")]
    Prf(String),

    #[error("key derivation failed: {0}")]
    Derivation(String),

    #[error("no KMS client supports key URI {key_uri}")]
    KmsClientNotFound { key_uri: String },

    #[error("KMS error: {0}")]
    Kms(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
