//! AEAD key types and the keyset-level AEAD wrapper.

mod aes_gcm;
mod chacha20_poly1305;
mod kms;

pub use self::aes_gcm::{AesGcm, AesGcmKeyManager, AES_GCM_TYPE_URL};
pub use self::chacha20_poly1305::{
    ChaCha20Poly1305, ChaCha20Poly1305KeyManager, XChaCha20Poly1305, XChaCha20Poly1305KeyManager,
    CHACHA20_POLY1305_TYPE_URL, XCHACHA20_POLY1305_TYPE_URL,
};
pub use self::kms::{
    KmsAeadKeyManager, KmsEnvelopeAead, KmsEnvelopeAeadKeyManager, KMS_AEAD_TYPE_URL,
    KMS_ENVELOPE_AEAD_TYPE_URL,
};

use crate::error::{CryptoError, CryptoResult};
use crate::primitive::Aead;
use crate::primitive_set::{candidates, PrimitiveSet};

/// Encrypts with the primary key and decrypts with whichever key matches
/// the ciphertext prefix.
pub struct WrappedAead {
    set: PrimitiveSet<Box<dyn Aead>>,
}

impl WrappedAead {
    pub fn new(set: PrimitiveSet<Box<dyn Aead>>) -> Self {
        Self { set }
    }
}

impl Aead for WrappedAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let primary = self.set.primary();
        let ciphertext = primary.primitive.encrypt(plaintext, associated_data)?;
        let mut output = Vec::with_capacity(primary.prefix.len() + ciphertext.len());
        output.extend_from_slice(&primary.prefix);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        for (entry, payload) in candidates(&self.set, ciphertext) {
            match entry.primitive.decrypt(payload, associated_data) {
                Ok(plaintext) => return Ok(plaintext),
                Err(err) => {
                    tracing::trace!(key_id = entry.key_id, error = %err, "candidate key rejected ciphertext")
                }
            }
        }
        Err(CryptoError::Decryption("no key in the keyset decrypts the ciphertext".to_string()))
    }
}
