//! Keyset derivation: each key of a deriver keyset turns a salt into one
//! derived key, and the derived keys form a new keyset with the same ids,
//! statuses, output prefixes and primary.

mod prf_based;

pub use self::prf_based::{PrfBasedDeriverKeyManager, PRF_BASED_DERIVER_TYPE_URL};

use crate::error::{CryptoError, CryptoResult};
use crate::keyset::KeysetHandle;
use crate::primitive::{KeyDeriver, KeysetDeriver};
use crate::primitive_set::PrimitiveSet;
use crate::proto::{keyset, Keyset};
use zeroize::Zeroizing;

/// Pseudorandom bytes consumed front to back by key managers deriving keys.
pub struct KeyMaterialStream {
    buffer: Zeroizing<Vec<u8>>,
    position: usize,
}

impl KeyMaterialStream {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self {
            buffer: Zeroizing::new(buffer),
            position: 0,
        }
    }

    /// Next `len` bytes of the stream.
    pub fn read(&mut self, len: usize) -> CryptoResult<Vec<u8>> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.buffer.len())
            .ok_or_else(|| CryptoError::Derivation("key material stream exhausted".to_string()))?;
        let out = self.buffer[self.position..end].to_vec();
        self.position = end;
        Ok(out)
    }
}

pub struct WrappedKeysetDeriver {
    set: PrimitiveSet<Box<dyn KeyDeriver>>,
}

impl WrappedKeysetDeriver {
    pub fn new(set: PrimitiveSet<Box<dyn KeyDeriver>>) -> Self {
        Self { set }
    }
}

impl KeysetDeriver for WrappedKeysetDeriver {
    fn derive_keyset(&self, salt: &[u8]) -> CryptoResult<KeysetHandle> {
        let mut keys = Vec::with_capacity(self.set.entries().len());
        for entry in self.set.entries() {
            let key_data = entry.primitive.derive_key_data(salt)?;
            keys.push(keyset::Key {
                key_data: Some(key_data),
                status: entry.status as i32,
                key_id: entry.key_id,
                output_prefix_type: entry.output_prefix_type as i32,
            });
        }
        KeysetHandle::from_keyset(Keyset {
            primary_key_id: self.set.primary().key_id,
            key: keys,
        })
    }
}
