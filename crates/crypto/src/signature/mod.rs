//! Digital signature key types and the signer/verifier wrappers.
//!
//! LEGACY keys sign `data || 0x00` instead of `data`.

mod ecdsa;
mod ed25519;

pub use self::ecdsa::{
    EcdsaPrivateKeyManager, EcdsaPublicKeyManager, EcdsaSigner, EcdsaVerifier,
    ECDSA_PRIVATE_KEY_TYPE_URL, ECDSA_PUBLIC_KEY_TYPE_URL,
};
pub use self::ed25519::{
    Ed25519PrivateKeyManager, Ed25519PublicKeyManager, Ed25519Signer, Ed25519Verifier,
    ED25519_PRIVATE_KEY_TYPE_URL, ED25519_PUBLIC_KEY_TYPE_URL,
};

use crate::error::{CryptoError, CryptoResult};
use crate::mac::legacy_input;
use crate::primitive::{Signer, Verifier};
use crate::primitive_set::{candidates, PrimitiveSet};

pub struct WrappedSigner {
    set: PrimitiveSet<Box<dyn Signer>>,
}

impl WrappedSigner {
    pub fn new(set: PrimitiveSet<Box<dyn Signer>>) -> Self {
        Self { set }
    }
}

impl Signer for WrappedSigner {
    fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let primary = self.set.primary();
        let input = legacy_input(data, primary.output_prefix_type);
        let signature = primary.primitive.sign(&input)?;
        Ok([primary.prefix.as_slice(), signature.as_slice()].concat())
    }
}

pub struct WrappedVerifier {
    set: PrimitiveSet<Box<dyn Verifier>>,
}

impl WrappedVerifier {
    pub fn new(set: PrimitiveSet<Box<dyn Verifier>>) -> Self {
        Self { set }
    }
}

impl Verifier for WrappedVerifier {
    fn verify(&self, signature: &[u8], data: &[u8]) -> CryptoResult<()> {
        for (entry, raw_signature) in candidates(&self.set, signature) {
            let input = legacy_input(data, entry.output_prefix_type);
            if entry.primitive.verify(raw_signature, &input).is_ok() {
                return Ok(());
            }
        }
        Err(CryptoError::InvalidSignature)
    }
}
