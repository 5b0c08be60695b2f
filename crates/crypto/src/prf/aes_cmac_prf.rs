use crate::error::{CryptoError, CryptoResult};
use crate::keyderivation::KeyMaterialStream;
use crate::mac::aes_cmac::{check_key_size, cmac_digest, CMAC_BLOCK_SIZE};
use crate::primitive::{KeyPrimitive, Prf, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{AesCmacPrfKey, AesCmacPrfKeyFormat, KeyData};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::{random_bytes, validate_version};
use prost::Message;
use zeroize::Zeroizing;

pub const AES_CMAC_PRF_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.AesCmacPrfKey";

pub struct AesCmacPrf {
    key: Zeroizing<Vec<u8>>,
}

impl AesCmacPrf {
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        check_key_size(key.len())?;
        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
        })
    }
}

impl Prf for AesCmacPrf {
    fn compute(&self, input: &[u8], output_length: usize) -> CryptoResult<Vec<u8>> {
        super::check_output_length(output_length, CMAC_BLOCK_SIZE)?;
        let mut output = cmac_digest(&self.key, input)?;
        output.truncate(output_length);
        Ok(output)
    }
}

pub struct AesCmacPrfKeyManager;

impl AesCmacPrfKeyManager {
    fn key_from_format(
        serialized_format: &[u8],
        key_value: impl FnOnce(usize) -> CryptoResult<Vec<u8>>,
    ) -> CryptoResult<KeyData> {
        let format = AesCmacPrfKeyFormat::decode(serialized_format)?;
        validate_version(format.version, 0)?;
        check_key_size(format.key_size as usize).map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        let key = AesCmacPrfKey {
            version: 0,
            key_value: key_value(format.key_size as usize)?,
        };
        Ok(key_data(AES_CMAC_PRF_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }
}

impl KeyManager for AesCmacPrfKeyManager {
    fn type_url(&self) -> &'static str {
        AES_CMAC_PRF_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::PrfSet
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = AesCmacPrfKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        Ok(KeyPrimitive::Prf(Box::new(AesCmacPrf::new(&key.key_value)?)))
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
