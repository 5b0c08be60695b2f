//! Hybrid encryption key types and wrappers.

mod hpke;

pub use self::hpke::{
    HpkeDecrypt, HpkeEncrypt, HpkePrivateKeyManager, HpkePublicKeyManager,
    HPKE_PRIVATE_KEY_TYPE_URL, HPKE_PUBLIC_KEY_TYPE_URL,
};

use crate::error::{CryptoError, CryptoResult};
use crate::primitive::{HybridDecrypt, HybridEncrypt};
use crate::primitive_set::{candidates, PrimitiveSet};

pub struct WrappedHybridEncrypt {
    set: PrimitiveSet<Box<dyn HybridEncrypt>>,
}

impl WrappedHybridEncrypt {
    pub fn new(set: PrimitiveSet<Box<dyn HybridEncrypt>>) -> Self {
        Self { set }
    }
}

impl HybridEncrypt for WrappedHybridEncrypt {
    fn encrypt(&self, plaintext: &[u8], context_info: &[u8]) -> CryptoResult<Vec<u8>> {
        let primary = self.set.primary();
        let ciphertext = primary.primitive.encrypt(plaintext, context_info)?;
        Ok([primary.prefix.as_slice(), ciphertext.as_slice()].concat())
    }
}

pub struct WrappedHybridDecrypt {
    set: PrimitiveSet<Box<dyn HybridDecrypt>>,
}

impl WrappedHybridDecrypt {
    pub fn new(set: PrimitiveSet<Box<dyn HybridDecrypt>>) -> Self {
        Self { set }
    }
}

impl HybridDecrypt for WrappedHybridDecrypt {
    fn decrypt(&self, ciphertext: &[u8], context_info: &[u8]) -> CryptoResult<Vec<u8>> {
        for (entry, payload) in candidates(&self.set, ciphertext) {
            if let Ok(plaintext) = entry.primitive.decrypt(payload, context_info) {
                return Ok(plaintext);
            }
        }
        Err(CryptoError::Decryption("no key in the keyset decrypts the ciphertext".to_string()))
    }
}
