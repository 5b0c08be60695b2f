//! HMAC with SHA-2 and a truncated tag.

use crate::error::{CryptoError, CryptoResult};
use crate::keyderivation::KeyMaterialStream;
use crate::primitive::{KeyPrimitive, Mac, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{HashType, HmacKey, HmacKeyFormat, HmacParams, KeyData};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::{random_bytes, validate_version};
use ::hmac::{Hmac, Mac as DigestMac};
use prost::Message;
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

pub const HMAC_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.HmacKey";

const MIN_KEY_SIZE: usize = 16;
const MIN_TAG_SIZE: usize = 10;

pub(crate) fn hash_output_size(hash: HashType) -> CryptoResult<usize> {
    match hash {
        HashType::Sha256 => Ok(32),
        HashType::Sha384 => Ok(48),
        HashType::Sha512 => Ok(64),
        other => Err(CryptoError::UnsupportedParameters(format!(
            "hash function {} is not supported",
            other.as_str_name()
        ))),
    }
}

/// Full-length HMAC of `data` under `key`.
pub(crate) fn hmac_digest(hash: HashType, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    macro_rules! digest {
        ($hash:ty) => {{
            let mut mac = <Hmac<$hash> as DigestMac>::new_from_slice(key)
                .map_err(|_| CryptoError::InvalidKey("invalid HMAC key".to_string()))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }};
    }

    match hash {
        HashType::Sha256 => digest!(Sha256),
        HashType::Sha384 => digest!(Sha384),
        HashType::Sha512 => digest!(Sha512),
        other => Err(CryptoError::UnsupportedParameters(format!(
            "hash function {} is not supported",
            other.as_str_name()
        ))),
    }
}

fn validate_params(params: &HmacParams, key_size: usize) -> CryptoResult<()> {
    let max_tag = hash_output_size(params.hash())?;
    let tag_size = params.tag_size as usize;
    if !(MIN_TAG_SIZE..=max_tag).contains(&tag_size) {
        return Err(CryptoError::UnsupportedParameters(format!(
            "HMAC tag size {} outside [{}, {}]",
            tag_size, MIN_TAG_SIZE, max_tag
        )));
    }
    if key_size < MIN_KEY_SIZE {
        return Err(CryptoError::InvalidKey(format!(
            "HMAC key must be at least {} bytes",
            MIN_KEY_SIZE
        )));
    }
    Ok(())
}

pub struct HmacMac {
    hash: HashType,
    key: Zeroizing<Vec<u8>>,
    tag_size: usize,
}

impl HmacMac {
    pub fn new(hash: HashType, key: &[u8], tag_size: usize) -> CryptoResult<Self> {
        validate_params(
            &HmacParams {
                hash: hash as i32,
                tag_size: tag_size as u32,
            },
            key.len(),
        )?;
        Ok(Self {
            hash,
            key: Zeroizing::new(key.to_vec()),
            tag_size,
        })
    }
}

impl Mac for HmacMac {
    fn compute_mac(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut tag = hmac_digest(self.hash, &self.key, data)?;
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

pub struct HmacKeyManager;

impl HmacKeyManager {
    fn key_from_format(
        serialized_format: &[u8],
        key_value: impl FnOnce(usize) -> CryptoResult<Vec<u8>>,
    ) -> CryptoResult<KeyData> {
        let format = HmacKeyFormat::decode(serialized_format)?;
        validate_version(format.version, 0)?;
        let params = format
            .params
            .ok_or_else(|| CryptoError::InvalidKeyFormat("HMAC format has no parameters".to_string()))?;
        validate_params(&params, format.key_size as usize)?;
        let key = HmacKey {
            version: 0,
            params: Some(params),
            key_value: key_value(format.key_size as usize)?,
        };
        Ok(key_data(HMAC_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }
}

impl KeyManager for HmacKeyManager {
    fn type_url(&self) -> &'static str {
        HMAC_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::Mac
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = HmacKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        let params = key
            .params
            .ok_or_else(|| CryptoError::InvalidKey("HMAC key has no parameters".to_string()))?;
        let mac = HmacMac::new(params.hash(), &key.key_value, params.tag_size as usize)?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc4231_case_2_sha256() {
        let tag = hmac_digest(HashType::Sha256, b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            hex::encode(tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_rfc4231_case_1() {
        let key = [0x0bu8; 20];
        assert_eq!(
            hex::encode(hmac_digest(HashType::Sha256, &key, b"Hi There").unwrap()),
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
        );
        assert_eq!(
            hex::encode(hmac_digest(HashType::Sha512, &key, b"Hi There").unwrap()),
            "87aa7cdea5ef619d4ff0b4241a1d6cb02379f4e2ce4ec2787ad0b30545e17cde\
             daa833b7d6b8a702038b274eaea3f4e4be9d914eeb61f1702e696c203a126854"
        );
    }

    // RFC 4231 test case 5: 128-bit truncated tags.
    #[test]
    fn test_rfc4231_truncated_tags() {
        let key = [0x0cu8; 20];
        let data = b"Test With Truncation";

        let sha256 = HmacMac::new(HashType::Sha256, &key, 16).unwrap();
        let tag = sha256.compute_mac(data).unwrap();
        assert_eq!(hex::encode(&tag), "a3b6167473100ee06e0c796c2955552b");
        assert!(sha256.verify_mac(&tag, data).is_ok());

        let sha512 = HmacMac::new(HashType::Sha512, &key, 16).unwrap();
        let tag = sha512.compute_mac(data).unwrap();
        assert_eq!(hex::encode(&tag), "415fad6271580a531d4179bc891d87a6");
        assert!(sha512.verify_mac(&tag, data).is_ok());
    }

    #[test]
    fn test_tag_truncation_and_verify() {
        let mac = HmacMac::new(HashType::Sha256, &[1u8; 32], 16).unwrap();
        let tag = mac.compute_mac(b"data").unwrap();
        assert_eq!(tag.len(), 16);
        assert!(mac.verify_mac(&tag, b"data").is_ok());
        assert!(mac.verify_mac(&tag, b"Data").is_err());
        assert!(mac.verify_mac(&tag[..15], b"data").is_err());
    }

    #[test]
    fn test_rejects_invalid_params() {
        assert!(HmacMac::new(HashType::Sha256, &[1u8; 32], 9).is_err());
        assert!(HmacMac::new(HashType::Sha256, &[1u8; 32], 33).is_err());
        assert!(HmacMac::new(HashType::Sha256, &[1u8; 8], 16).is_err());
        assert!(HmacMac::new(HashType::Sha1, &[1u8; 32], 16).is_err());
    }
}
