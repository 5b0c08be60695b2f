//! Deterministic AEAD key types and the keyset-level wrapper.

mod aes_siv;

pub use self::aes_siv::{AesSiv, AesSivKeyManager, AES_SIV_TYPE_URL};

use crate::error::{CryptoError, CryptoResult};
use crate::primitive::DeterministicAead;
use crate::primitive_set::{candidates, PrimitiveSet};

pub struct WrappedDeterministicAead {
    set: PrimitiveSet<Box<dyn DeterministicAead>>,
}

impl WrappedDeterministicAead {
    pub fn new(set: PrimitiveSet<Box<dyn DeterministicAead>>) -> Self {
        Self { set }
    }
}

impl DeterministicAead for WrappedDeterministicAead {
    fn encrypt_deterministically(
        &self,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        let primary = self.set.primary();
        let ciphertext = primary
            .primitive
            .encrypt_deterministically(plaintext, associated_data)?;
        Ok([primary.prefix.as_slice(), ciphertext.as_slice()].concat())
    }

    fn decrypt_deterministically(
        &self,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        for (entry, payload) in candidates(&self.set, ciphertext) {
            if let Ok(plaintext) = entry
                .primitive
                .decrypt_deterministically(payload, associated_data)
            {
                return Ok(plaintext);
            }
        }
        Err(CryptoError::Decryption("no key in the keyset decrypts the ciphertext".to_string()))
    }
}
