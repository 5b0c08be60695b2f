//! Keyset-driven cryptographic primitives.
//!
//! Keys travel as serialized keysets (binary protobuf or JSON) whose format
//! is shared with the other language implementations under test. A
//! [`KeysetHandle`] validates a keyset, and
//! [`KeysetHandle::primitive`] combines its keys into one primitive per
//! family: AEAD, deterministic AEAD, MAC, signatures, hybrid encryption,
//! PRF sets and keyset derivation.
//!
//! # Output prefixes
//!
//! | prefix type | bytes prepended                  |
//! |-------------|----------------------------------|
//! | TINK        | `0x01` + key id (4 bytes BE)     |
//! | LEGACY      | `0x00` + key id (4 bytes BE)     |
//! | CRUNCHY     | `0x00` + key id (4 bytes BE)     |
//! | RAW         | nothing                          |

pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/google.crypto.tink.rs"));
}

pub mod aead;
pub mod daead;
pub mod error;
pub mod hybrid;
pub mod keyderivation;
pub mod keyset;
pub mod kms;
pub mod mac;
pub mod prf;
pub mod primitive;
pub mod primitive_set;
pub mod registry;
pub mod signature;
mod util;

pub use error::{CryptoError, CryptoResult};
pub use keyset::KeysetHandle;
pub use kms::{FakeKmsClient, KmsClient, KmsClientRegistry};
pub use prf::PrfSet;
pub use primitive::{
    Aead, DeterministicAead, HybridDecrypt, HybridEncrypt, KeysetDeriver, Mac, Prf, Primitive,
    PrimitiveKind, Signer, Verifier,
};
pub use registry::{KeyManager, KeyManagerRegistry};
