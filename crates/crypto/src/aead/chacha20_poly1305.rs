//! ChaCha20-Poly1305 (12-byte nonce) and XChaCha20-Poly1305 (24-byte nonce).
//! Both prepend the random nonce to the ciphertext.

use crate::error::{CryptoError, CryptoResult};
use crate::keyderivation::KeyMaterialStream;
use crate::primitive::{Aead, KeyPrimitive, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{ChaCha20Poly1305Key, KeyData, XChaCha20Poly1305Key, XChaCha20Poly1305KeyFormat};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::{random_bytes, validate_version};
use chacha20poly1305::aead::{Aead as _, KeyInit, Payload};
use chacha20poly1305::{Nonce, XNonce};
use prost::Message;

pub const CHACHA20_POLY1305_TYPE_URL: &str =
    "type.googleapis.com/google.crypto.tink.ChaCha20Poly1305Key";
pub const XCHACHA20_POLY1305_TYPE_URL: &str =
    "type.googleapis.com/google.crypto.tink.XChaCha20Poly1305Key";

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const XNONCE_SIZE: usize = 24;
const TAG_SIZE: usize = 16;

fn check_key(key: &[u8]) -> CryptoResult<()> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKey(format!(
            "ChaCha20-Poly1305 key must be {} bytes, got {}",
            KEY_SIZE,
            key.len()
        )));
    }
    Ok(())
}

pub struct ChaCha20Poly1305 {
    cipher: chacha20poly1305::ChaCha20Poly1305,
}

impl ChaCha20Poly1305 {
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        check_key(key)?;
        let cipher = chacha20poly1305::ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidKey("invalid ChaCha20-Poly1305 key".to_string()))?;
        Ok(Self { cipher })
    }
}

impl Aead for ChaCha20Poly1305 {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let nonce = random_bytes(NONCE_SIZE);
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|_| CryptoError::Encryption("ChaCha20-Poly1305 encryption failed".to_string()))?;
        let mut output = nonce;
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption("ciphertext too short".to_string()));
        }
        let (nonce, body) = ciphertext.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: body,
                    aad: associated_data,
                },
            )
            .map_err(|_| CryptoError::Decryption("ChaCha20-Poly1305 authentication failed".to_string()))
    }
}

pub struct XChaCha20Poly1305 {
    cipher: chacha20poly1305::XChaCha20Poly1305,
}

impl XChaCha20Poly1305 {
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        check_key(key)?;
        let cipher = chacha20poly1305::XChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidKey("invalid XChaCha20-Poly1305 key".to_string()))?;
        Ok(Self { cipher })
    }
}

impl Aead for XChaCha20Poly1305 {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let nonce = random_bytes(XNONCE_SIZE);
        let ciphertext = self
            .cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|_| CryptoError::Encryption("XChaCha20-Poly1305 encryption failed".to_string()))?;
        let mut output = nonce;
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        if ciphertext.len() < XNONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption("ciphertext too short".to_string()));
        }
        let (nonce, body) = ciphertext.split_at(XNONCE_SIZE);
        self.cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: body,
                    aad: associated_data,
                },
            )
            .map_err(|_| CryptoError::Decryption("XChaCha20-Poly1305 authentication failed".to_string()))
    }
}

pub struct ChaCha20Poly1305KeyManager;

impl KeyManager for ChaCha20Poly1305KeyManager {
    fn type_url(&self) -> &'static str {
        CHACHA20_POLY1305_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::Aead
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = ChaCha20Poly1305Key::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        Ok(KeyPrimitive::Aead(Box::new(ChaCha20Poly1305::new(&key.key_value)?)))
    }

    fn new_key_data(&self, _: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        let key = ChaCha20Poly1305Key {
            version: 0,
            key_value: random_bytes(KEY_SIZE),
        };
        Ok(key_data(CHACHA20_POLY1305_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }

    fn supports_derivation(&self) -> bool {
        true
    }

    fn derive_key_data(&self, _: &[u8], stream: &mut KeyMaterialStream) -> CryptoResult<KeyData> {
        let key = ChaCha20Poly1305Key {
            version: 0,
            key_value: stream.read(KEY_SIZE)?,
        };
        Ok(key_data(CHACHA20_POLY1305_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }
}

pub struct XChaCha20Poly1305KeyManager;

impl XChaCha20Poly1305KeyManager {
    fn check_format(serialized_format: &[u8]) -> CryptoResult<()> {
        let format = XChaCha20Poly1305KeyFormat::decode(serialized_format)?;
        validate_version(format.version, 0)
    }
}

impl KeyManager for XChaCha20Poly1305KeyManager {
    fn type_url(&self) -> &'static str {
        XCHACHA20_POLY1305_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::Aead
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = XChaCha20Poly1305Key::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        Ok(KeyPrimitive::Aead(Box::new(XChaCha20Poly1305::new(&key.key_value)?)))
    }

    fn new_key_data(&self, serialized_format: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        Self::check_format(serialized_format)?;
        let key = XChaCha20Poly1305Key {
            version: 0,
            key_value: random_bytes(KEY_SIZE),
        };
        Ok(key_data(XCHACHA20_POLY1305_TYPE_URL, &key, KeyMaterialType::Symmetric))
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
        let key = XChaCha20Poly1305Key {
            version: 0,
            key_value: stream.read(KEY_SIZE)?,
        };
        Ok(key_data(XCHACHA20_POLY1305_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chacha_roundtrip_and_layout() {
        let aead = ChaCha20Poly1305::new(&[3u8; 32]).unwrap();
        let ciphertext = aead.encrypt(b"hello", b"ad").unwrap();
        assert_eq!(ciphertext.len(), NONCE_SIZE + 5 + TAG_SIZE);
        assert_eq!(aead.decrypt(&ciphertext, b"ad").unwrap(), b"hello");
    }

    #[test]
    fn test_xchacha_layout_and_tamper() {
        let aead = XChaCha20Poly1305::new(&[4u8; 32]).unwrap();
        let mut ciphertext = aead.encrypt(b"hello", b"").unwrap();
        assert_eq!(ciphertext.len(), XNONCE_SIZE + 5 + TAG_SIZE);
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 1;
        assert!(aead.decrypt(&ciphertext, b"").is_err());
    }

    #[test]
    fn test_rejects_short_key() {
        assert!(ChaCha20Poly1305::new(&[0u8; 16]).is_err());
        assert!(XChaCha20Poly1305::new(&[0u8; 31]).is_err());
    }
}
