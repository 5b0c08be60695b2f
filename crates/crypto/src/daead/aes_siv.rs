//! AES-SIV (RFC 5297) with a 64-byte key and the associated data as the
//! single header.

use crate::error::{CryptoError, CryptoResult};
use crate::keyderivation::KeyMaterialStream;
use crate::primitive::{DeterministicAead, KeyPrimitive, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{AesSivKey, AesSivKeyFormat, KeyData};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::{random_bytes, validate_version};
use aes_siv::siv::Aes256Siv;
use aes_siv::KeyInit;
use prost::Message;
use zeroize::Zeroizing;

pub const AES_SIV_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.AesSivKey";

const KEY_SIZE: usize = 64;

pub struct AesSiv {
    key: Zeroizing<Vec<u8>>,
}

impl AesSiv {
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        if key.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "AES-SIV key must be {} bytes, got {}",
                KEY_SIZE,
                key.len()
            )));
        }
        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
        })
    }

    fn cipher(&self) -> CryptoResult<Aes256Siv> {
        Aes256Siv::new_from_slice(&self.key)
            .map_err(|_| CryptoError::InvalidKey("invalid AES-SIV key".to_string()))
    }
}

impl DeterministicAead for AesSiv {
    fn encrypt_deterministically(
        &self,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        self.cipher()?
            .encrypt([associated_data], plaintext)
            .map_err(|_| CryptoError::Encryption("AES-SIV encryption failed".to_string()))
    }

    fn decrypt_deterministically(
        &self,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        self.cipher()?
            .decrypt([associated_data], ciphertext)
            .map_err(|_| CryptoError::Decryption("AES-SIV authentication failed".to_string()))
    }
}

pub struct AesSivKeyManager;

impl AesSivKeyManager {
    fn check_format(serialized_format: &[u8]) -> CryptoResult<()> {
        let format = AesSivKeyFormat::decode(serialized_format)?;
        validate_version(format.version, 0)?;
        if format.key_size as usize != KEY_SIZE {
            return Err(CryptoError::InvalidKeyFormat(format!(
                "AES-SIV key size must be {}, got {}",
                KEY_SIZE, format.key_size
            )));
        }
        Ok(())
    }
}

impl KeyManager for AesSivKeyManager {
    fn type_url(&self) -> &'static str {
        AES_SIV_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::DeterministicAead
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = AesSivKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        Ok(KeyPrimitive::DeterministicAead(Box::new(AesSiv::new(&key.key_value)?)))
    }

    fn new_key_data(&self, serialized_format: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        Self::check_format(serialized_format)?;
        let key = AesSivKey {
            version: 0,
            key_value: random_bytes(KEY_SIZE),
        };
        Ok(key_data(AES_SIV_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }

    fn supports_derivation(&self) -> bool {
        true
    }

    fn derive_key_data(
        &self,
        serialized_format: &[u8],
        stream: &mut KeyMaterialStream,
    ) -> CryptoResult<KeyData> {
        Self::check_format(serialized_format)?;
        let key = AesSivKey {
            version: 0,
            key_value: stream.read(KEY_SIZE)?,
        };
        Ok(key_data(AES_SIV_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }
}
