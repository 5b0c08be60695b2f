//! AES-CMAC (RFC 4493) with a 32-byte key.

use crate::error::{CryptoError, CryptoResult};
use crate::keyderivation::KeyMaterialStream;
use crate::primitive::{KeyPrimitive, Mac, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{AesCmacKey, AesCmacKeyFormat, AesCmacParams, KeyData};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::{random_bytes, validate_version};
use aes::Aes256;
use cmac::{Cmac, Mac as DigestMac};
use prost::Message;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

pub const AES_CMAC_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.AesCmacKey";

pub(crate) const CMAC_KEY_SIZE: usize = 32;
pub(crate) const CMAC_BLOCK_SIZE: usize = 16;
const MIN_TAG_SIZE: usize = 10;

/// Full 16-byte CMAC of `data`.
pub(crate) fn cmac_digest(key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut mac = <Cmac<Aes256> as DigestMac>::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKey("invalid AES-CMAC key".to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn check_key_size(size: usize) -> CryptoResult<()> {
    if size != CMAC_KEY_SIZE {
        return Err(CryptoError::InvalidKey(format!(
            "AES-CMAC key must be {} bytes, got {}",
            CMAC_KEY_SIZE, size
        )));
    }
    Ok(())
}

fn check_tag_size(tag_size: usize) -> CryptoResult<()> {
    if !(MIN_TAG_SIZE..=CMAC_BLOCK_SIZE).contains(&tag_size) {
        return Err(CryptoError::UnsupportedParameters(format!(
            "AES-CMAC tag size {} outside [{}, {}]",
            tag_size, MIN_TAG_SIZE, CMAC_BLOCK_SIZE
        )));
    }
    Ok(())
}

pub struct AesCmac {
    key: Zeroizing<Vec<u8>>,
    tag_size: usize,
}

impl AesCmac {
    pub fn new(key: &[u8], tag_size: usize) -> CryptoResult<Self> {
        check_key_size(key.len())?;
        check_tag_size(tag_size)?;
        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
            tag_size,
        })
    }
}

impl Mac for AesCmac {
    fn compute_mac(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut tag = cmac_digest(&self.key, data)?;
        tag.truncate(self.tag_size);
        Ok(tag)
    }

    fn verify_mac(&self, mac: &[u8], data: &[u8]) -> CryptoResult<()> {
        let expected = self.compute_mac(data)?;
        if expected.len() == mac.len() && bool::from(expected.ct_eq(mac)) {
            Ok(())
        } else {
            Err(CryptoError::InvalidMac)
        }
    }
}

pub struct AesCmacKeyManager;

impl AesCmacKeyManager {
    fn key_from_format(
        serialized_format: &[u8],
        key_value: impl FnOnce(usize) -> CryptoResult<Vec<u8>>,
    ) -> CryptoResult<KeyData> {
        let format = AesCmacKeyFormat::decode(serialized_format)?;
        let params: AesCmacParams = format.params.ok_or_else(|| {
            CryptoError::InvalidKeyFormat("AES-CMAC format has no parameters".to_string())
        })?;
        check_key_size(format.key_size as usize)?;
        check_tag_size(params.tag_size as usize)?;
        let key = AesCmacKey {
            version: 0,
            key_value: key_value(format.key_size as usize)?,
            params: Some(params),
        };
        Ok(key_data(AES_CMAC_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }
}

impl KeyManager for AesCmacKeyManager {
    fn type_url(&self) -> &'static str {
        AES_CMAC_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::Mac
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = AesCmacKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        let params = key
            .params
            .ok_or_else(|| CryptoError::InvalidKey("AES-CMAC key has no parameters".to_string()))?;
        let mac = AesCmac::new(&key.key_value, params.tag_size as usize)?;
        Ok(KeyPrimitive::Mac(Box::new(mac)))
    }

    fn new_key_data(&self, serialized_format: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        Self::key_from_format(serialized_format, |size| Ok(random_bytes(size)))
    }

    fn supports_derivation(&self) -> bool {
        true
    }

    fn derive_key_data(
        &self,
        serialized_format: &[u8],
        stream: &mut KeyMaterialStream,
    ) -> CryptoResult<KeyData> {
        Self::key_from_format(serialized_format, |size| stream.read(size))
    }
}
