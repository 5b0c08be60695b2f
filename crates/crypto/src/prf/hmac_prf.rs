use crate::error::{CryptoError, CryptoResult};
use crate::keyderivation::KeyMaterialStream;
use crate::mac::{hash_output_size, hmac_digest};
use crate::primitive::{KeyPrimitive, Prf, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{HashType, HmacPrfKey, HmacPrfKeyFormat, KeyData};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::{random_bytes, validate_version};
use prost::Message;
use zeroize::Zeroizing;

pub const HMAC_PRF_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.HmacPrfKey";

const MIN_KEY_SIZE: usize = 16;

pub struct HmacPrf {
    hash: HashType,
    key: Zeroizing<Vec<u8>>,
}

impl HmacPrf {
    pub fn new(hash: HashType, key: &[u8]) -> CryptoResult<Self> {
        hash_output_size(hash)?;
        if key.len() < MIN_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "HMAC PRF key must be at least {} bytes",
                MIN_KEY_SIZE
            )));
        }
        Ok(Self {
            hash,
            key: Zeroizing::new(key.to_vec()),
        })
    }
}

impl Prf for HmacPrf {
    fn compute(&self, input: &[u8], output_length: usize) -> CryptoResult<Vec<u8>> {
        super::check_output_length(output_length, hash_output_size(self.hash)?)?;
        let mut output = hmac_digest(self.hash, &self.key, input)?;
        output.truncate(output_length);
        Ok(output)
    }
}

pub struct HmacPrfKeyManager;

impl HmacPrfKeyManager {
    fn key_from_format(
        serialized_format: &[u8],
        key_value: impl FnOnce(usize) -> CryptoResult<Vec<u8>>,
    ) -> CryptoResult<KeyData> {
        let format = HmacPrfKeyFormat::decode(serialized_format)?;
        validate_version(format.version, 0)?;
        let params = format.params.ok_or_else(|| {
            CryptoError::InvalidKeyFormat("HMAC PRF format has no parameters".to_string())
        })?;
        hash_output_size(params.hash())?;
        let key_size = format.key_size as usize;
        if key_size < MIN_KEY_SIZE {
            return Err(CryptoError::InvalidKeyFormat(format!(
                "HMAC PRF key size must be at least {}",
                MIN_KEY_SIZE
            )));
        }
        let key = HmacPrfKey {
            version: 0,
            params: Some(params),
            key_value: key_value(key_size)?,
        };
        Ok(key_data(HMAC_PRF_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }
}

impl KeyManager for HmacPrfKeyManager {
    fn type_url(&self) -> &'static str {
        HMAC_PRF_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::PrfSet
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = HmacPrfKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        let params = key
            .params
            .ok_or_else(|| CryptoError::InvalidKey("HMAC PRF key has no parameters".to_string()))?;
        Ok(KeyPrimitive::Prf(Box::new(HmacPrf::new(params.hash(), &key.key_value)?)))
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
    fn test_output_is_truncated_hmac() {
        let prf = HmacPrf::new(HashType::Sha256, &[1u8; 32]).unwrap();
        let full = prf.compute(b"input", 32).unwrap();
        let short = prf.compute(b"input", 16).unwrap();
        assert_eq!(&full[..16], short.as_slice());
    }

    #[test]
    fn test_rejects_oversized_output() {
        let prf = HmacPrf::new(HashType::Sha256, &[1u8; 32]).unwrap();
        assert!(prf.compute(b"input", 33).is_err());
        let prf = HmacPrf::new(HashType::Sha512, &[1u8; 64]).unwrap();
        assert_eq!(prf.compute(b"input", 64).unwrap().len(), 64);
    }
}
