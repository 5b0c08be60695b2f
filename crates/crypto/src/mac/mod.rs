//! MAC key types and the keyset-level MAC wrapper.
//!
//! LEGACY keys authenticate `data || 0x00` instead of `data`.

pub(crate) mod aes_cmac;
mod hmac;

pub use self::aes_cmac::{AesCmac, AesCmacKeyManager, AES_CMAC_TYPE_URL};
pub use self::hmac::{HmacMac, HmacKeyManager, HMAC_TYPE_URL};
pub(crate) use self::hmac::{hash_output_size, hmac_digest};

use crate::error::{CryptoError, CryptoResult};
use crate::primitive::Mac;
use crate::primitive_set::{candidates, PrimitiveSet};
use crate::proto::OutputPrefixType;
use std::borrow::Cow;

pub(crate) fn legacy_input(data: &[u8], prefix_type: OutputPrefixType) -> Cow<'_, [u8]> {
    if prefix_type == OutputPrefixType::Legacy {
        let mut extended = Vec::with_capacity(data.len() + 1);
        extended.extend_from_slice(data);
        extended.push(0x00);
        Cow::Owned(extended)
    } else {
        Cow::Borrowed(data)
    }
}

pub struct WrappedMac {
    set: PrimitiveSet<Box<dyn Mac>>,
}

impl WrappedMac {
    pub fn new(set: PrimitiveSet<Box<dyn Mac>>) -> Self {
        Self { set }
    }
}

impl Mac for WrappedMac {
    fn compute_mac(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let primary = self.set.primary();
        let input = legacy_input(data, primary.output_prefix_type);
        let tag = primary.primitive.compute_mac(&input)?;
        Ok([primary.prefix.as_slice(), tag.as_slice()].concat())
    }

    fn verify_mac(&self, mac: &[u8], data: &[u8]) -> CryptoResult<()> {
        for (entry, tag) in candidates(&self.set, mac) {
            let input = legacy_input(data, entry.output_prefix_type);
            if entry.primitive.verify_mac(tag, &input).is_ok() {
                return Ok(());
            }
        }
        Err(CryptoError::InvalidMac)
    }
}
