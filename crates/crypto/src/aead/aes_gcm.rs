//! AES-GCM with a random 12-byte IV prepended to each ciphertext.

use crate::error::{CryptoError, CryptoResult};
use crate::keyderivation::KeyMaterialStream;
use crate::primitive::{Aead, KeyPrimitive, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{AesGcmKey, AesGcmKeyFormat, KeyData};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::{random_bytes, validate_version};
use aes_gcm::aead::{Aead as _, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use prost::Message;

pub const AES_GCM_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.AesGcmKey";

const IV_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

enum Cipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

pub struct AesGcm {
    cipher: Cipher,
}

impl AesGcm {
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        let invalid = |_| CryptoError::InvalidKey("invalid AES-GCM key".to_string());
        let cipher = match key.len() {
            16 => Cipher::Aes128(Aes128Gcm::new_from_slice(key).map_err(invalid)?),
            32 => Cipher::Aes256(Aes256Gcm::new_from_slice(key).map_err(invalid)?),
            n => {
                return Err(CryptoError::InvalidKey(format!(
                    "AES-GCM key must be 16 or 32 bytes, got {}",
                    n
                )))
            }
        };
        Ok(Self { cipher })
    }
}

impl Aead for AesGcm {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let iv = random_bytes(IV_SIZE);
        let nonce = Nonce::from_slice(&iv);
        let payload = Payload {
            msg: plaintext,
            aad: associated_data,
        };
        let ciphertext = match &self.cipher {
            Cipher::Aes128(c) => c.encrypt(nonce, payload),
            Cipher::Aes256(c) => c.encrypt(nonce, payload),
        }
        .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".to_string()))?;

        let mut output = iv;
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        if ciphertext.len() < IV_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption("ciphertext too short".to_string()));
        }
        let (iv, body) = ciphertext.split_at(IV_SIZE);
        let nonce = Nonce::from_slice(iv);
        let payload = Payload {
            msg: body,
            aad: associated_data,
        };
        match &self.cipher {
            Cipher::Aes128(c) => c.decrypt(nonce, payload),
            Cipher::Aes256(c) => c.decrypt(nonce, payload),
        }
        .map_err(|_| CryptoError::Decryption("AES-GCM authentication failed".to_string()))
    }
}

fn validate_key_size(size: usize) -> CryptoResult<()> {
    match size {
        16 | 32 => Ok(()),
        n => Err(CryptoError::InvalidKeyFormat(format!(
            "AES-GCM key size must be 16 or 32, got {}",
            n
        ))),
    }
}

pub struct AesGcmKeyManager;

impl AesGcmKeyManager {
    fn key_from_format(format: &[u8], key_value: impl FnOnce(usize) -> CryptoResult<Vec<u8>>) -> CryptoResult<KeyData> {
        let format = AesGcmKeyFormat::decode(format)?;
        validate_version(format.version, 0)?;
        validate_key_size(format.key_size as usize)?;
        let key = AesGcmKey {
            version: 0,
            key_value: key_value(format.key_size as usize)?,
        };
        Ok(key_data(AES_GCM_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }
}

impl KeyManager for AesGcmKeyManager {
    fn type_url(&self) -> &'static str {
        AES_GCM_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::Aead
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = AesGcmKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        Ok(KeyPrimitive::Aead(Box::new(AesGcm::new(&key.key_value)?)))
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
