//! Primitive capability traits and the tagged values built from keysets.
//!
//! Key managers hand out a [`KeyPrimitive`] for a single key. Keyset-level
//! wrappers combine those into a [`Primitive`], which is what callers use.

use crate::error::CryptoResult;
use crate::keyset::KeysetHandle;
use crate::prf::PrfSet;
use crate::proto::KeyData;
use std::fmt;

/// Authenticated encryption with associated data.
pub trait Aead: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>>;
    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// AEAD whose ciphertext depends only on key, plaintext and associated data.
pub trait DeterministicAead: Send + Sync {
    fn encrypt_deterministically(
        &self,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> CryptoResult<Vec<u8>>;
    fn decrypt_deterministically(
        &self,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> CryptoResult<Vec<u8>>;
}

pub trait Mac: Send + Sync {
    fn compute_mac(&self, data: &[u8]) -> CryptoResult<Vec<u8>>;
    /// Returns `Ok(())` only for a valid tag.
    fn verify_mac(&self, mac: &[u8], data: &[u8]) -> CryptoResult<()>;
}

pub trait Signer: Send + Sync {
    fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>>;
}

pub trait Verifier: Send + Sync {
    /// Returns `Ok(())` only for a valid signature.
    fn verify(&self, signature: &[u8], data: &[u8]) -> CryptoResult<()>;
}

pub trait HybridEncrypt: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], context_info: &[u8]) -> CryptoResult<Vec<u8>>;
}

pub trait HybridDecrypt: Send + Sync {
    fn decrypt(&self, ciphertext: &[u8], context_info: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// Pseudorandom function with caller-chosen output length.
pub trait Prf: Send + Sync {
    fn compute(&self, input: &[u8], output_length: usize) -> CryptoResult<Vec<u8>>;
}

/// Derives one key from a salt. Implemented per key by derivation key managers.
pub trait KeyDeriver: Send + Sync {
    fn derive_key_data(&self, salt: &[u8]) -> CryptoResult<KeyData>;
}

/// Derives a whole keyset from a salt.
pub trait KeysetDeriver: Send + Sync {
    fn derive_keyset(&self, salt: &[u8]) -> CryptoResult<KeysetHandle>;
}

/// Primitive families a keyset can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Aead,
    DeterministicAead,
    Mac,
    Signer,
    Verifier,
    HybridEncrypt,
    HybridDecrypt,
    PrfSet,
    KeysetDeriver,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Aead => "Aead",
            PrimitiveKind::DeterministicAead => "DeterministicAead",
            PrimitiveKind::Mac => "Mac",
            PrimitiveKind::Signer => "PublicKeySign",
            PrimitiveKind::Verifier => "PublicKeyVerify",
            PrimitiveKind::HybridEncrypt => "HybridEncrypt",
            PrimitiveKind::HybridDecrypt => "HybridDecrypt",
            PrimitiveKind::PrfSet => "PrfSet",
            PrimitiveKind::KeysetDeriver => "KeysetDeriver",
        };
        f.write_str(name)
    }
}

/// Primitive for a single key, as produced by a key manager.
pub enum KeyPrimitive {
    Aead(Box<dyn Aead>),
    DeterministicAead(Box<dyn DeterministicAead>),
    Mac(Box<dyn Mac>),
    Signer(Box<dyn Signer>),
    Verifier(Box<dyn Verifier>),
    HybridEncrypt(Box<dyn HybridEncrypt>),
    HybridDecrypt(Box<dyn HybridDecrypt>),
    Prf(Box<dyn Prf>),
    KeyDeriver(Box<dyn KeyDeriver>),
}

/// Keyset-level primitive, one variant per family.
pub enum Primitive {
    Aead(Box<dyn Aead>),
    DeterministicAead(Box<dyn DeterministicAead>),
    Mac(Box<dyn Mac>),
    Signer(Box<dyn Signer>),
    Verifier(Box<dyn Verifier>),
    HybridEncrypt(Box<dyn HybridEncrypt>),
    HybridDecrypt(Box<dyn HybridDecrypt>),
    PrfSet(PrfSet),
    KeysetDeriver(Box<dyn KeysetDeriver>),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Aead(_) => PrimitiveKind::Aead,
            Primitive::DeterministicAead(_) => PrimitiveKind::DeterministicAead,
            Primitive::Mac(_) => PrimitiveKind::Mac,
            Primitive::Signer(_) => PrimitiveKind::Signer,
            Primitive::Verifier(_) => PrimitiveKind::Verifier,
            Primitive::HybridEncrypt(_) => PrimitiveKind::HybridEncrypt,
            Primitive::HybridDecrypt(_) => PrimitiveKind::HybridDecrypt,
            Primitive::PrfSet(_) => PrimitiveKind::PrfSet,
            Primitive::KeysetDeriver(_) => PrimitiveKind::KeysetDeriver,
        }
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Primitive::{}", self.kind())
    }
}
