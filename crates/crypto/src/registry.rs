//! Key managers and the registry that maps type URLs to them.
//!
//! A key manager knows one key type: how to parse its serialized key, turn
//! it into a primitive, generate fresh key material and, where the key type
//! allows, derive key material from a PRF stream or extract a public key.

use crate::aead::{
    AesGcmKeyManager, ChaCha20Poly1305KeyManager, KmsAeadKeyManager, KmsEnvelopeAeadKeyManager,
    XChaCha20Poly1305KeyManager,
};
use crate::daead::AesSivKeyManager;
use crate::error::{CryptoError, CryptoResult};
use crate::hybrid::{HpkePrivateKeyManager, HpkePublicKeyManager};
use crate::keyderivation::{KeyMaterialStream, PrfBasedDeriverKeyManager};
use crate::kms::KmsClientRegistry;
use crate::mac::{AesCmacKeyManager, HmacKeyManager};
use crate::prf::{AesCmacPrfKeyManager, HkdfPrfKeyManager, HmacPrfKeyManager};
use crate::primitive::{KeyPrimitive, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{KeyData, KeyTemplate};
use crate::signature::{
    EcdsaPrivateKeyManager, EcdsaPublicKeyManager, Ed25519PrivateKeyManager,
    Ed25519PublicKeyManager,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Prefix shared by every type URL this crate understands.
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/google.crypto.tink.";

pub trait KeyManager: Send + Sync {
    fn type_url(&self) -> &'static str;

    fn key_material_type(&self) -> KeyMaterialType;

    /// The primitive family a key of this type produces.
    fn primitive_kind(&self) -> PrimitiveKind;

    fn primitive(
        &self,
        serialized_key: &[u8],
        registry: &KeyManagerRegistry,
    ) -> CryptoResult<KeyPrimitive>;

    fn new_key_data(
        &self,
        serialized_format: &[u8],
        registry: &KeyManagerRegistry,
    ) -> CryptoResult<KeyData>;

    fn supports_derivation(&self) -> bool {
        false
    }

    fn derive_key_data(
        &self,
        _serialized_format: &[u8],
        _stream: &mut KeyMaterialStream,
    ) -> CryptoResult<KeyData> {
        Err(CryptoError::Derivation(format!(
            "key type {} does not support derivation",
            self.type_url()
        )))
    }

    fn public_key_data(&self, _serialized_private_key: &[u8]) -> CryptoResult<KeyData> {
        Err(CryptoError::InvalidKey(format!(
            "key type {} is not a private key",
            self.type_url()
        )))
    }
}

/// Builds a [`KeyData`] for a freshly encoded key proto.
pub(crate) fn key_data<M: prost::Message>(
    type_url: &str,
    key: &M,
    key_material_type: KeyMaterialType,
) -> KeyData {
    KeyData {
        type_url: type_url.to_string(),
        value: key.encode_to_vec(),
        key_material_type: key_material_type as i32,
    }
}

/// Immutable type URL to key manager lookup, plus the KMS clients that
/// remote-key managers resolve against.
///
/// Cloning is cheap; clones share the same managers and KMS clients.
#[derive(Clone)]
pub struct KeyManagerRegistry {
    managers: Arc<HashMap<&'static str, Arc<dyn KeyManager>>>,
    kms: Arc<KmsClientRegistry>,
}

impl KeyManagerRegistry {
    /// Registry with every supported key type, resolving remote keys
    /// through `kms`.
    pub fn new(kms: Arc<KmsClientRegistry>) -> Self {
        let managers: Vec<Arc<dyn KeyManager>> = vec![
            Arc::new(AesGcmKeyManager),
            Arc::new(ChaCha20Poly1305KeyManager),
            Arc::new(XChaCha20Poly1305KeyManager),
            Arc::new(KmsAeadKeyManager),
            Arc::new(KmsEnvelopeAeadKeyManager),
            Arc::new(AesSivKeyManager),
            Arc::new(HmacKeyManager),
            Arc::new(AesCmacKeyManager),
            Arc::new(HmacPrfKeyManager),
            Arc::new(HkdfPrfKeyManager),
            Arc::new(AesCmacPrfKeyManager),
            Arc::new(Ed25519PrivateKeyManager),
            Arc::new(Ed25519PublicKeyManager),
            Arc::new(EcdsaPrivateKeyManager),
            Arc::new(EcdsaPublicKeyManager),
            Arc::new(HpkePrivateKeyManager),
            Arc::new(HpkePublicKeyManager),
            Arc::new(PrfBasedDeriverKeyManager),
        ];

        let managers = managers
            .into_iter()
            .map(|manager| (manager.type_url(), manager))
            .collect();

        Self {
            managers: Arc::new(managers),
            kms,
        }
    }

    /// Registry without any KMS client. Remote keys fail to resolve.
    pub fn local() -> Self {
        Self::new(Arc::new(KmsClientRegistry::new()))
    }

    pub fn get(&self, type_url: &str) -> CryptoResult<Arc<dyn KeyManager>> {
        self.managers
            .get(type_url)
            .cloned()
            .ok_or_else(|| CryptoError::UnsupportedKeyType {
                type_url: type_url.to_string(),
            })
    }

    pub fn contains(&self, type_url: &str) -> bool {
        self.managers.contains_key(type_url)
    }

    pub fn kms(&self) -> &KmsClientRegistry {
        &self.kms
    }

    /// Sorted list of registered type URLs.
    pub fn type_urls(&self) -> Vec<&'static str> {
        let mut urls: Vec<_> = self.managers.keys().copied().collect();
        urls.sort_unstable();
        urls
    }

    /// Generates key material for `template`.
    pub fn new_key_data(&self, template: &KeyTemplate) -> CryptoResult<KeyData> {
        self.get(&template.type_url)?
            .new_key_data(&template.value, self)
    }

    /// Builds the single-key primitive for `key_data`, checking that the key
    /// type belongs to the requested family.
    pub fn primitive(&self, key_data: &KeyData, kind: PrimitiveKind) -> CryptoResult<KeyPrimitive> {
        let manager = self.get(&key_data.type_url)?;
        if manager.primitive_kind() != kind {
            return Err(CryptoError::PrimitiveMismatch {
                type_url: key_data.type_url.clone(),
                primitive: kind.to_string(),
            });
        }
        manager.primitive(&key_data.value, self)
    }
}

impl fmt::Debug for KeyManagerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManagerRegistry")
            .field("key_types", &self.type_urls())
            .field("kms_clients", &self.kms.len())
            .finish()
    }
}
