//! HKDF used as a PRF: the PRF input is the HKDF `info`.

use crate::error::{CryptoError, CryptoResult};
use crate::keyderivation::KeyMaterialStream;
use crate::mac::hash_output_size;
use crate::primitive::{KeyPrimitive, Prf, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{HashType, HkdfPrfKey, HkdfPrfKeyFormat, HkdfPrfParams, KeyData};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::{random_bytes, validate_version};
use hkdf::Hkdf;
use prost::Message;
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

pub const HKDF_PRF_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.HkdfPrfKey";

const MIN_KEY_SIZE: usize = 32;

fn hkdf_expand(
    hash: HashType,
    key: &[u8],
    salt: &[u8],
    info: &[u8],
    length: usize,
) -> CryptoResult<Vec<u8>> {
    let salt = (!salt.is_empty()).then_some(salt);
    let mut okm = vec![0u8; length];
    let expanded = match hash {
        HashType::Sha256 => Hkdf::<Sha256>::new(salt, key).expand(info, &mut okm),
        HashType::Sha384 => Hkdf::<Sha384>::new(salt, key).expand(info, &mut okm),
        HashType::Sha512 => Hkdf::<Sha512>::new(salt, key).expand(info, &mut okm),
        other => {
            return Err(CryptoError::UnsupportedParameters(format!(
                "hash function {} is not supported",
                other.as_str_name()
            )))
        }
    };
    expanded.map_err(|_| CryptoError::Prf(format!("HKDF cannot produce {} bytes", length)))?;
    Ok(okm)
}

pub struct HkdfPrf {
    hash: HashType,
    key: Zeroizing<Vec<u8>>,
    salt: Vec<u8>,
}

impl HkdfPrf {
    pub fn new(hash: HashType, key: &[u8], salt: &[u8]) -> CryptoResult<Self> {
        hash_output_size(hash)?;
        if key.len() < MIN_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "HKDF PRF key must be at least {} bytes",
                MIN_KEY_SIZE
            )));
        }
        Ok(Self {
            hash,
            key: Zeroizing::new(key.to_vec()),
            salt: salt.to_vec(),
        })
    }

    pub(crate) fn from_key(key: &HkdfPrfKey) -> CryptoResult<Self> {
        validate_version(key.version, 0)?;
        let params = key
            .params
            .as_ref()
            .ok_or_else(|| CryptoError::InvalidKey("HKDF PRF key has no parameters".to_string()))?;
        Self::new(params.hash(), &key.key_value, &params.salt)
    }

    /// Largest output HKDF can produce with this hash.
    pub fn max_output_length(&self) -> usize {
        255 * hash_output_size(self.hash).unwrap_or(0)
    }

    /// Output stream for `input`, used as a source of derived key material.
    pub fn stream(&self, input: &[u8]) -> CryptoResult<KeyMaterialStream> {
        Ok(KeyMaterialStream::new(self.compute(
            input,
            self.max_output_length(),
        )?))
    }
}

impl Prf for HkdfPrf {
    fn compute(&self, input: &[u8], output_length: usize) -> CryptoResult<Vec<u8>> {
        super::check_output_length(output_length, self.max_output_length())?;
        hkdf_expand(self.hash, &self.key, &self.salt, input, output_length)
    }
}

pub struct HkdfPrfKeyManager;

impl HkdfPrfKeyManager {
    fn key_from_format(
        serialized_format: &[u8],
        key_value: impl FnOnce(usize) -> CryptoResult<Vec<u8>>,
    ) -> CryptoResult<KeyData> {
        let format = HkdfPrfKeyFormat::decode(serialized_format)?;
        validate_version(format.version, 0)?;
        let params: HkdfPrfParams = format.params.ok_or_else(|| {
            CryptoError::InvalidKeyFormat("HKDF PRF format has no parameters".to_string())
        })?;
        hash_output_size(params.hash())?;
        let key_size = format.key_size as usize;
        if key_size < MIN_KEY_SIZE {
            return Err(CryptoError::InvalidKeyFormat(format!(
                "HKDF PRF key size must be at least {}",
                MIN_KEY_SIZE
            )));
        }
        let key = HkdfPrfKey {
            version: 0,
            params: Some(params),
            key_value: key_value(key_size)?,
        };
        Ok(key_data(HKDF_PRF_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }
}

impl KeyManager for HkdfPrfKeyManager {
    fn type_url(&self) -> &'static str {
        HKDF_PRF_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::PrfSet
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = HkdfPrfKey::decode(serialized_key)?;
        Ok(KeyPrimitive::Prf(Box::new(HkdfPrf::from_key(&key)?)))
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
