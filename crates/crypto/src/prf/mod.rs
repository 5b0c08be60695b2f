//! PRF key types and the keyset-level [`PrfSet`].
//!
//! PRF keysets must use RAW output prefixes: a PRF output is never
//! prefixed, so keys are addressed by id instead.

mod aes_cmac_prf;
mod hkdf_prf;
mod hmac_prf;

pub use self::aes_cmac_prf::{AesCmacPrf, AesCmacPrfKeyManager, AES_CMAC_PRF_TYPE_URL};
pub use self::hkdf_prf::{HkdfPrf, HkdfPrfKeyManager, HKDF_PRF_TYPE_URL};
pub use self::hmac_prf::{HmacPrf, HmacPrfKeyManager, HMAC_PRF_TYPE_URL};

use crate::error::{CryptoError, CryptoResult};
use crate::primitive::Prf;
use crate::primitive_set::PrimitiveSet;
use crate::proto::OutputPrefixType;

pub(crate) fn check_output_length(requested: usize, max: usize) -> CryptoResult<()> {
    if requested > max {
        return Err(CryptoError::Prf(format!(
            "output length {} exceeds maximum {}",
            requested, max
        )));
    }
    Ok(())
}

/// Every enabled PRF of a keyset, addressable by key id.
pub struct PrfSet {
    primary_id: u32,
    prfs: Vec<(u32, Box<dyn Prf>)>,
}

impl PrfSet {
    pub fn new(set: PrimitiveSet<Box<dyn Prf>>) -> CryptoResult<Self> {
        if let Some(entry) = set
            .entries()
            .iter()
            .find(|entry| entry.output_prefix_type != OutputPrefixType::Raw)
        {
            return Err(CryptoError::InvalidKeyset(format!(
                "PRF key {} must use the RAW output prefix",
                entry.key_id
            )));
        }
        let primary_id = set.primary().key_id;
        let prfs = set
            .into_entries()
            .into_iter()
            .map(|entry| (entry.key_id, entry.primitive))
            .collect();
        Ok(Self { primary_id, prfs })
    }

    pub fn primary_id(&self) -> u32 {
        self.primary_id
    }

    /// Key ids in keyset order.
    pub fn key_ids(&self) -> Vec<u32> {
        self.prfs.iter().map(|(id, _)| *id).collect()
    }

    pub fn get(&self, key_id: u32) -> Option<&dyn Prf> {
        self.prfs
            .iter()
            .find(|(id, _)| *id == key_id)
            .map(|(_, prf)| prf.as_ref())
    }

    pub fn compute_primary(&self, input: &[u8], output_length: usize) -> CryptoResult<Vec<u8>> {
        self.get(self.primary_id)
            .ok_or_else(|| CryptoError::Prf("primary PRF missing".to_string()))?
            .compute(input, output_length)
    }
}
