//! AEAD key types whose key material lives in a remote KMS.
//!
//! `KmsAeadKey` forwards every call to the KMS. `KmsEnvelopeAeadKey`
//! generates a fresh data key per message, wraps it with the KMS key and
//! stores it in front of the ciphertext:
//!
//! ```text
//! | wrapped DEK length (u32 BE) | wrapped DEK | DEK ciphertext |
//! ```

use crate::error::{CryptoError, CryptoResult};
use crate::primitive::{Aead, KeyPrimitive, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{
    KeyData, KeyTemplate, KmsAeadKey, KmsAeadKeyFormat, KmsEnvelopeAeadKey,
    KmsEnvelopeAeadKeyFormat,
};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::validate_version;
use prost::Message;

pub const KMS_AEAD_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.KmsAeadKey";
pub const KMS_ENVELOPE_AEAD_TYPE_URL: &str =
    "type.googleapis.com/google.crypto.tink.KmsEnvelopeAeadKey";

const DEK_LENGTH_SIZE: usize = 4;

fn remote_aead(registry: &KeyManagerRegistry, key_uri: &str) -> CryptoResult<Box<dyn Aead>> {
    registry.kms().find_for(key_uri)?.get_aead(key_uri)
}

pub struct KmsAeadKeyManager;

impl KeyManager for KmsAeadKeyManager {
    fn type_url(&self) -> &'static str {
        KMS_AEAD_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Remote
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::Aead
    }

    fn primitive(&self, serialized_key: &[u8], registry: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = KmsAeadKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        let params = key
            .params
            .ok_or_else(|| CryptoError::InvalidKey("KMS AEAD key has no parameters".to_string()))?;
        Ok(KeyPrimitive::Aead(remote_aead(registry, &params.key_uri)?))
    }

    fn new_key_data(&self, serialized_format: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        let format = KmsAeadKeyFormat::decode(serialized_format)?;
        if format.key_uri.is_empty() {
            return Err(CryptoError::InvalidKeyFormat("KMS key URI is empty".to_string()));
        }
        let key = KmsAeadKey {
            version: 0,
            params: Some(format),
        };
        Ok(key_data(KMS_AEAD_TYPE_URL, &key, KeyMaterialType::Remote))
    }
}

pub struct KmsEnvelopeAead {
    remote: Box<dyn Aead>,
    dek_template: KeyTemplate,
    registry: KeyManagerRegistry,
}

impl KmsEnvelopeAead {
    pub fn new(
        remote: Box<dyn Aead>,
        dek_template: KeyTemplate,
        registry: KeyManagerRegistry,
    ) -> CryptoResult<Self> {
        let manager = registry.get(&dek_template.type_url)?;
        if manager.primitive_kind() != PrimitiveKind::Aead
            || manager.key_material_type() != KeyMaterialType::Symmetric
        {
            return Err(CryptoError::UnsupportedParameters(format!(
                "{} cannot be used as an envelope data key",
                dek_template.type_url
            )));
        }
        Ok(Self {
            remote,
            dek_template,
            registry,
        })
    }

    fn dek_aead(&self, serialized_dek: &[u8]) -> CryptoResult<Box<dyn Aead>> {
        let manager = self.registry.get(&self.dek_template.type_url)?;
        match manager.primitive(serialized_dek, &self.registry)? {
            KeyPrimitive::Aead(aead) => Ok(aead),
            _ => Err(CryptoError::PrimitiveMismatch {
                type_url: self.dek_template.type_url.clone(),
                primitive: PrimitiveKind::Aead.to_string(),
            }),
        }
    }
}

impl Aead for KmsEnvelopeAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let dek = self.registry.new_key_data(&self.dek_template)?;
        let wrapped = self.remote.encrypt(&dek.value, &[])?;
        let payload = self.dek_aead(&dek.value)?.encrypt(plaintext, associated_data)?;

        let wrapped_len = u32::try_from(wrapped.len())
            .map_err(|_| CryptoError::Encryption("wrapped data key too large".to_string()))?;
        let mut output = Vec::with_capacity(DEK_LENGTH_SIZE + wrapped.len() + payload.len());
        output.extend_from_slice(&wrapped_len.to_be_bytes());
        output.extend_from_slice(&wrapped);
        output.extend_from_slice(&payload);
        Ok(output)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        if ciphertext.len() < DEK_LENGTH_SIZE {
            return Err(CryptoError::Decryption("ciphertext too short".to_string()));
        }
        let (len_bytes, rest) = ciphertext.split_at(DEK_LENGTH_SIZE);
        let mut len = [0u8; DEK_LENGTH_SIZE];
        len.copy_from_slice(len_bytes);
        let wrapped_len = u32::from_be_bytes(len) as usize;
        if wrapped_len == 0 || wrapped_len > rest.len() {
            return Err(CryptoError::Decryption("invalid wrapped data key length".to_string()));
        }
        let (wrapped, payload) = rest.split_at(wrapped_len);
        let dek = self.remote.decrypt(wrapped, &[])?;
        self.dek_aead(&dek)?.decrypt(payload, associated_data)
    }
}

pub struct KmsEnvelopeAeadKeyManager;

impl KeyManager for KmsEnvelopeAeadKeyManager {
    fn type_url(&self) -> &'static str {
        KMS_ENVELOPE_AEAD_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Remote
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::Aead
    }

    fn primitive(&self, serialized_key: &[u8], registry: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = KmsEnvelopeAeadKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        let params = key.params.ok_or_else(|| {
            CryptoError::InvalidKey("KMS envelope key has no parameters".to_string())
        })?;
        let dek_template = params.dek_template.ok_or_else(|| {
            CryptoError::InvalidKey("KMS envelope key has no data key template".to_string())
        })?;
        let remote = remote_aead(registry, &params.kek_uri)?;
        Ok(KeyPrimitive::Aead(Box::new(KmsEnvelopeAead::new(
            remote,
            dek_template,
            registry.clone(),
        )?)))
    }

    fn new_key_data(&self, serialized_format: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        let format = KmsEnvelopeAeadKeyFormat::decode(serialized_format)?;
        if format.kek_uri.is_empty() || format.dek_template.is_none() {
            return Err(CryptoError::InvalidKeyFormat(
                "KMS envelope format needs a KEK URI and a DEK template".to_string(),
            ));
        }
        let key = KmsEnvelopeAeadKey {
            version: 0,
            params: Some(format),
        };
        Ok(key_data(KMS_ENVELOPE_AEAD_TYPE_URL, &key, KeyMaterialType::Remote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aead::AesGcm;
    use crate::keyset::templates::named_template;

    fn envelope() -> KmsEnvelopeAead {
        let remote = Box::new(AesGcm::new(&[9u8; 32]).unwrap());
        let dek_template = named_template("AES128_GCM").unwrap();
        KmsEnvelopeAead::new(remote, dek_template, KeyManagerRegistry::local()).unwrap()
    }

    #[test]
    fn test_envelope_roundtrip() {
        let aead = envelope();
        let ciphertext = aead.encrypt(b"payload", b"ad").unwrap();
        assert_eq!(aead.decrypt(&ciphertext, b"ad").unwrap(), b"payload");
        assert!(aead.decrypt(&ciphertext, b"other").is_err());
    }

    #[test]
    fn test_envelope_rejects_bad_length_header() {
        let aead = envelope();
        let mut ciphertext = aead.encrypt(b"payload", b"").unwrap();
        ciphertext[0] = 0xff;
        assert!(aead.decrypt(&ciphertext, b"").is_err());
        assert!(aead.decrypt(&[0, 0], b"").is_err());
    }

    #[test]
    fn test_envelope_rejects_non_aead_dek() {
        let remote = Box::new(AesGcm::new(&[9u8; 32]).unwrap());
        let dek_template = named_template("HMAC_SHA256_128BITTAG").unwrap();
        assert!(KmsEnvelopeAead::new(remote, dek_template, KeyManagerRegistry::local()).is_err());
    }

    #[test]
    fn test_kms_aead_without_client_fails() {
        let key = KmsAeadKey {
            version: 0,
            params: Some(KmsAeadKeyFormat {
                key_uri: "aws-kms://arn:aws:kms:us-east-1:1:key/none".to_string(),
            }),
        };
        let err = KmsAeadKeyManager
            .primitive(&key.encode_to_vec(), &KeyManagerRegistry::local())
            .err()
            .unwrap();
        assert!(matches!(err, CryptoError::KmsClientNotFound { .. }));
    }
}
