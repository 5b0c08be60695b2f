//! In-process KMS whose key URIs carry the key itself:
//! `fake-kms://` followed by a URL-safe base64 binary keyset.
//!
//! Used by the conformance suite so every implementation can exercise
//! KMS code paths without cloud credentials.

use crate::error::{CryptoError, CryptoResult};
use crate::keyset::templates::named_template;
use crate::keyset::KeysetHandle;
use crate::kms::KmsClient;
use crate::primitive::{Aead, Primitive, PrimitiveKind};
use crate::registry::KeyManagerRegistry;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

pub const FAKE_KMS_PREFIX: &str = "fake-kms://";

pub struct FakeKmsClient {
    key_uri: Option<String>,
    registry: KeyManagerRegistry,
}

impl FakeKmsClient {
    /// Client claiming every `fake-kms://` URI.
    pub fn new() -> Self {
        Self {
            key_uri: None,
            registry: KeyManagerRegistry::local(),
        }
    }

    /// Client bound to one key URI.
    pub fn bound_to(key_uri: &str) -> CryptoResult<Self> {
        if !key_uri.starts_with(FAKE_KMS_PREFIX) {
            return Err(CryptoError::Kms(format!(
                "key URI must start with {}",
                FAKE_KMS_PREFIX
            )));
        }
        Ok(Self {
            key_uri: Some(key_uri.to_string()),
            registry: KeyManagerRegistry::local(),
        })
    }

    /// Fresh URI wrapping a new AES128-GCM keyset.
    pub fn new_key_uri() -> CryptoResult<String> {
        let template = named_template("AES128_GCM")
            .ok_or_else(|| CryptoError::Kms("AES128_GCM template missing".to_string()))?;
        let handle = KeysetHandle::generate(&template, &KeyManagerRegistry::local())?;
        Ok(format!(
            "{}{}",
            FAKE_KMS_PREFIX,
            URL_SAFE_NO_PAD.encode(handle.serialize())
        ))
    }
}

impl Default for FakeKmsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KmsClient for FakeKmsClient {
    fn name(&self) -> &str {
        "fake-kms"
    }

    fn supports(&self, key_uri: &str) -> bool {
        match &self.key_uri {
            Some(bound) => bound == key_uri,
            None => key_uri.starts_with(FAKE_KMS_PREFIX),
        }
    }

    fn get_aead(&self, key_uri: &str) -> CryptoResult<Box<dyn Aead>> {
        if !self.supports(key_uri) {
            return Err(CryptoError::Kms(format!("key URI {} is not supported", key_uri)));
        }
        let encoded = key_uri[FAKE_KMS_PREFIX.len()..].trim_end_matches('=');
        let serialized = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| CryptoError::Kms(format!("invalid fake KMS key URI: {}", e)))?;
        let handle = KeysetHandle::read(&serialized)?;
        match handle.primitive(PrimitiveKind::Aead, &self.registry)? {
            Primitive::Aead(aead) => Ok(aead),
            other => Err(CryptoError::Kms(format!(
                "fake KMS keyset produced {} instead of Aead",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_uri_roundtrip() {
        let uri = FakeKmsClient::new_key_uri().unwrap();
        let client = FakeKmsClient::new();
        assert!(client.supports(&uri));
        let aead = client.get_aead(&uri).unwrap();
        let ciphertext = aead.encrypt(b"dek", b"").unwrap();
        let aead_again = client.get_aead(&uri).unwrap();
        assert_eq!(aead_again.decrypt(&ciphertext, b"").unwrap(), b"dek");
    }

    #[test]
    fn test_bound_client_only_claims_its_uri() {
        let uri = FakeKmsClient::new_key_uri().unwrap();
        let other = FakeKmsClient::new_key_uri().unwrap();
        let client = FakeKmsClient::bound_to(&uri).unwrap();
        assert!(client.supports(&uri));
        assert!(!client.supports(&other));
        assert!(client.get_aead(&other).is_err());
        assert!(FakeKmsClient::bound_to("aws-kms://x").is_err());
    }

    #[test]
    fn test_garbage_uri_fails() {
        let client = FakeKmsClient::new();
        assert!(client.get_aead("fake-kms://!!!").is_err());
        assert!(client.get_aead("fake-kms://").is_err());
    }
}
