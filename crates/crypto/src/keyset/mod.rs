//! Validated keysets and their serialized forms.
//!
//! # Validation
//!
//! A keyset is accepted only when:
//! - it contains at least one key,
//! - every non-destroyed key has key data, a known status and a known
//!   output prefix type,
//! - at least one key is enabled,
//! - exactly one enabled key carries the primary key id.
//!
//! Key types are not checked here; that needs a [`KeyManagerRegistry`].

pub mod json;
pub mod templates;

use crate::aead::WrappedAead;
use crate::daead::WrappedDeterministicAead;
use crate::error::{CryptoError, CryptoResult};
use crate::hybrid::{WrappedHybridDecrypt, WrappedHybridEncrypt};
use crate::keyderivation::WrappedKeysetDeriver;
use crate::mac::WrappedMac;
use crate::prf::PrfSet;
use crate::primitive::{Aead, KeyPrimitive, Primitive, PrimitiveKind};
use crate::primitive_set::PrimitiveSet;
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{
    keyset, keyset_info, EncryptedKeyset, KeyStatusType, KeyTemplate, Keyset, KeysetInfo,
    OutputPrefixType,
};
use crate::registry::KeyManagerRegistry;
use crate::signature::{WrappedSigner, WrappedVerifier};
use prost::Message;
use std::fmt;

fn validate_key(key: &keyset::Key) -> CryptoResult<()> {
    if key.status() == KeyStatusType::Destroyed {
        return Ok(());
    }
    let key_data = key.key_data.as_ref().ok_or_else(|| {
        CryptoError::InvalidKeyset(format!("key {} has no key data", key.key_id))
    })?;
    if key_data.type_url.is_empty() {
        return Err(CryptoError::InvalidKeyset(format!(
            "key {} has an empty type URL",
            key.key_id
        )));
    }
    if KeyStatusType::try_from(key.status).unwrap_or(KeyStatusType::UnknownStatus)
        == KeyStatusType::UnknownStatus
    {
        return Err(CryptoError::InvalidKeyset(format!(
            "key {} has unknown status",
            key.key_id
        )));
    }
    if OutputPrefixType::try_from(key.output_prefix_type).unwrap_or(OutputPrefixType::UnknownPrefix)
        == OutputPrefixType::UnknownPrefix
    {
        return Err(CryptoError::InvalidKeyset(format!(
            "key {} has unknown output prefix type",
            key.key_id
        )));
    }
    Ok(())
}

/// Structural keyset checks shared by every way of obtaining a handle.
pub fn validate(keyset: &Keyset) -> CryptoResult<()> {
    if keyset.key.is_empty() {
        return Err(CryptoError::InvalidKeyset(
            "keyset must contain at least one key".to_string(),
        ));
    }

    let mut enabled = 0usize;
    let mut primaries = 0usize;
    let mut disabled_primary = false;
    for key in &keyset.key {
        validate_key(key)?;
        let is_enabled = key.status == KeyStatusType::Enabled as i32;
        if is_enabled {
            enabled += 1;
        }
        if key.key_id == keyset.primary_key_id {
            if is_enabled {
                primaries += 1;
            } else {
                disabled_primary = true;
            }
        }
    }

    if enabled == 0 {
        return Err(CryptoError::InvalidKeyset(
            "keyset must contain at least one enabled key".to_string(),
        ));
    }
    match primaries {
        1 => Ok(()),
        0 if disabled_primary => Err(CryptoError::InvalidKeyset(
            "primary key is not enabled".to_string(),
        )),
        0 => Err(CryptoError::InvalidKeyset(
            "keyset does not contain a valid primary key".to_string(),
        )),
        _ => Err(CryptoError::InvalidKeyset(
            "keyset contains multiple primary keys".to_string(),
        )),
    }
}

/// A keyset that passed structural validation.
#[derive(Clone)]
pub struct KeysetHandle {
    keyset: Keyset,
}

impl KeysetHandle {
    pub fn from_keyset(keyset: Keyset) -> CryptoResult<Self> {
        validate(&keyset)?;
        Ok(Self { keyset })
    }

    /// Parses a binary keyset.
    pub fn read(serialized: &[u8]) -> CryptoResult<Self> {
        if serialized.is_empty() {
            return Err(CryptoError::InvalidKeyset("keyset is empty".to_string()));
        }
        Self::from_keyset(Keyset::decode(serialized)?)
    }

    /// Parses a JSON keyset.
    pub fn read_json(json_keyset: &str) -> CryptoResult<Self> {
        Self::from_keyset(json::keyset_from_json(json_keyset)?)
    }

    pub fn read_encrypted(
        encrypted: &EncryptedKeyset,
        master: &dyn Aead,
        associated_data: &[u8],
    ) -> CryptoResult<Self> {
        let serialized = master
            .decrypt(&encrypted.encrypted_keyset, associated_data)
            .map_err(|e| CryptoError::InvalidKeyset(format!("cannot decrypt keyset: {}", e)))?;
        Self::read(&serialized)
    }

    /// Parses a binary `EncryptedKeyset` and decrypts it with `master`.
    pub fn read_encrypted_binary(
        serialized: &[u8],
        master: &dyn Aead,
        associated_data: &[u8],
    ) -> CryptoResult<Self> {
        Self::read_encrypted(&EncryptedKeyset::decode(serialized)?, master, associated_data)
    }

    /// Parses a JSON `EncryptedKeyset` and decrypts it with `master`.
    pub fn read_encrypted_json(
        json_keyset: &str,
        master: &dyn Aead,
        associated_data: &[u8],
    ) -> CryptoResult<Self> {
        Self::read_encrypted(
            &json::encrypted_keyset_from_json(json_keyset)?,
            master,
            associated_data,
        )
    }

    /// New keyset with a single fresh key, which is also the primary.
    pub fn generate(template: &KeyTemplate, registry: &KeyManagerRegistry) -> CryptoResult<Self> {
        let output_prefix_type = OutputPrefixType::try_from(template.output_prefix_type)
            .unwrap_or(OutputPrefixType::UnknownPrefix);
        if output_prefix_type == OutputPrefixType::UnknownPrefix {
            return Err(CryptoError::InvalidKeyFormat(
                "template has unknown output prefix type".to_string(),
            ));
        }
        let key_data = registry.new_key_data(template)?;
        let key_id = new_key_id();
        Self::from_keyset(Keyset {
            primary_key_id: key_id,
            key: vec![keyset::Key {
                key_data: Some(key_data),
                status: KeyStatusType::Enabled as i32,
                key_id,
                output_prefix_type: output_prefix_type as i32,
            }],
        })
    }

    pub fn keyset(&self) -> &Keyset {
        &self.keyset
    }

    pub fn keys(&self) -> &[keyset::Key] {
        &self.keyset.key
    }

    pub fn primary_key_id(&self) -> u32 {
        self.keyset.primary_key_id
    }

    /// Key metadata without key material.
    pub fn keyset_info(&self) -> KeysetInfo {
        KeysetInfo {
            primary_key_id: self.keyset.primary_key_id,
            key_info: self
                .keyset
                .key
                .iter()
                .map(|key| keyset_info::KeyInfo {
                    type_url: key
                        .key_data
                        .as_ref()
                        .map(|d| d.type_url.clone())
                        .unwrap_or_default(),
                    status: key.status,
                    key_id: key.key_id,
                    output_prefix_type: key.output_prefix_type,
                })
                .collect(),
        }
    }

    /// Keyset holding the public keys of every private key in this one.
    pub fn public_handle(&self, registry: &KeyManagerRegistry) -> CryptoResult<Self> {
        let mut keys = Vec::with_capacity(self.keyset.key.len());
        for key in &self.keyset.key {
            let key_data = key.key_data.as_ref().ok_or_else(|| {
                CryptoError::InvalidKeyset(format!("key {} has no key data", key.key_id))
            })?;
            if key_data.key_material_type() != KeyMaterialType::AsymmetricPrivate {
                return Err(CryptoError::InvalidKeyset(format!(
                    "key {} is not a private key",
                    key.key_id
                )));
            }
            let public = registry
                .get(&key_data.type_url)?
                .public_key_data(&key_data.value)?;
            keys.push(keyset::Key {
                key_data: Some(public),
                ..key.clone()
            });
        }
        Self::from_keyset(Keyset {
            primary_key_id: self.keyset.primary_key_id,
            key: keys,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.keyset.encode_to_vec()
    }

    pub fn to_json(&self) -> CryptoResult<String> {
        json::keyset_to_json(&self.keyset)
    }

    pub fn encrypt(&self, master: &dyn Aead, associated_data: &[u8]) -> CryptoResult<EncryptedKeyset> {
        Ok(EncryptedKeyset {
            encrypted_keyset: master.encrypt(&self.serialize(), associated_data)?,
            keyset_info: Some(self.keyset_info()),
        })
    }

    pub fn write_encrypted(&self, master: &dyn Aead, associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(self.encrypt(master, associated_data)?.encode_to_vec())
    }

    pub fn write_encrypted_json(
        &self,
        master: &dyn Aead,
        associated_data: &[u8],
    ) -> CryptoResult<String> {
        json::encrypted_keyset_to_json(&self.encrypt(master, associated_data)?)
    }

    /// Builds the keyset-level primitive of the requested family.
    pub fn primitive(
        &self,
        kind: PrimitiveKind,
        registry: &KeyManagerRegistry,
    ) -> CryptoResult<Primitive> {
        let handle = self;
        macro_rules! primitive_set {
            ($variant:ident) => {
                PrimitiveSet::build(handle, kind, registry, |primitive| match primitive {
                    KeyPrimitive::$variant(inner) => Some(inner),
                    _ => None,
                })?
            };
        }

        let primitive = match kind {
            PrimitiveKind::Aead => Primitive::Aead(Box::new(WrappedAead::new(primitive_set!(Aead)))),
            PrimitiveKind::DeterministicAead => Primitive::DeterministicAead(Box::new(
                WrappedDeterministicAead::new(primitive_set!(DeterministicAead)),
            )),
            PrimitiveKind::Mac => Primitive::Mac(Box::new(WrappedMac::new(primitive_set!(Mac)))),
            PrimitiveKind::Signer => {
                Primitive::Signer(Box::new(WrappedSigner::new(primitive_set!(Signer))))
            }
            PrimitiveKind::Verifier => {
                Primitive::Verifier(Box::new(WrappedVerifier::new(primitive_set!(Verifier))))
            }
            PrimitiveKind::HybridEncrypt => Primitive::HybridEncrypt(Box::new(
                WrappedHybridEncrypt::new(primitive_set!(HybridEncrypt)),
            )),
            PrimitiveKind::HybridDecrypt => Primitive::HybridDecrypt(Box::new(
                WrappedHybridDecrypt::new(primitive_set!(HybridDecrypt)),
            )),
            PrimitiveKind::PrfSet => Primitive::PrfSet(PrfSet::new(primitive_set!(Prf))?),
            PrimitiveKind::KeysetDeriver => Primitive::KeysetDeriver(Box::new(
                WrappedKeysetDeriver::new(primitive_set!(KeyDeriver)),
            )),
        };
        Ok(primitive)
    }
}

impl fmt::Debug for KeysetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("KeysetHandle")
            .field("keyset_info", &self.keyset_info())
            .finish()
    }
}

fn new_key_id() -> u32 {
    loop {
        let id = rand::random::<u32>();
        if id != 0 {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyset::templates::named_template;
    use crate::proto::KeyData;

    fn key(id: u32, status: KeyStatusType, prefix: OutputPrefixType) -> keyset::Key {
        keyset::Key {
            key_data: Some(KeyData {
                type_url: crate::aead::AES_GCM_TYPE_URL.to_string(),
                value: vec![0x1a, 0x10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                key_material_type: KeyMaterialType::Symmetric as i32,
            }),
            status: status as i32,
            key_id: id,
            output_prefix_type: prefix as i32,
        }
    }

    fn message(err: CryptoError) -> String {
        err.to_string()
    }

    #[test]
    fn test_empty_bytes_rejected() {
        let err = KeysetHandle::read(&[]).unwrap_err();
        assert!(message(err).contains("empty"));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(KeysetHandle::read(&[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_keyset_without_keys_rejected() {
        let keyset = Keyset {
            primary_key_id: 1,
            key: vec![],
        };
        assert!(KeysetHandle::from_keyset(keyset).is_err());
    }

    #[test]
    fn test_missing_primary_rejected() {
        let keyset = Keyset {
            primary_key_id: 99,
            key: vec![key(1, KeyStatusType::Enabled, OutputPrefixType::Tink)],
        };
        let err = KeysetHandle::from_keyset(keyset).unwrap_err();
        assert!(message(err).contains("primary"));
    }

    #[test]
    fn test_disabled_primary_rejected() {
        let keyset = Keyset {
            primary_key_id: 1,
            key: vec![
                key(1, KeyStatusType::Disabled, OutputPrefixType::Tink),
                key(2, KeyStatusType::Enabled, OutputPrefixType::Tink),
            ],
        };
        let err = KeysetHandle::from_keyset(keyset).unwrap_err();
        assert!(message(err).contains("not enabled"));
    }

    #[test]
    fn test_duplicate_primary_rejected() {
        let keyset = Keyset {
            primary_key_id: 1,
            key: vec![
                key(1, KeyStatusType::Enabled, OutputPrefixType::Tink),
                key(1, KeyStatusType::Enabled, OutputPrefixType::Raw),
            ],
        };
        assert!(KeysetHandle::from_keyset(keyset).is_err());
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        let keyset = Keyset {
            primary_key_id: 1,
            key: vec![key(1, KeyStatusType::Enabled, OutputPrefixType::UnknownPrefix)],
        };
        assert!(KeysetHandle::from_keyset(keyset).is_err());
    }

    #[test]
    fn test_destroyed_key_without_material_allowed() {
        let mut destroyed = key(2, KeyStatusType::Destroyed, OutputPrefixType::Tink);
        destroyed.key_data = None;
        let keyset = Keyset {
            primary_key_id: 1,
            key: vec![key(1, KeyStatusType::Enabled, OutputPrefixType::Tink), destroyed],
        };
        assert!(KeysetHandle::from_keyset(keyset).is_ok());
    }

    #[test]
    fn test_serialize_read_roundtrip() {
        let registry = KeyManagerRegistry::local();
        let handle =
            KeysetHandle::generate(&named_template("AES256_GCM").unwrap(), &registry).unwrap();
        let again = KeysetHandle::read(&handle.serialize()).unwrap();
        assert_eq!(handle.keyset(), again.keyset());
        assert_ne!(handle.primary_key_id(), 0);
    }

    #[test]
    fn test_public_handle_of_symmetric_keyset_fails() {
        let registry = KeyManagerRegistry::local();
        let handle =
            KeysetHandle::generate(&named_template("AES128_GCM").unwrap(), &registry).unwrap();
        assert!(handle.public_handle(&registry).is_err());
    }

    #[test]
    fn test_public_handle_keeps_ids() {
        let registry = KeyManagerRegistry::local();
        let handle = KeysetHandle::generate(&named_template("ED25519").unwrap(), &registry).unwrap();
        let public = handle.public_handle(&registry).unwrap();
        assert_eq!(public.primary_key_id(), handle.primary_key_id());
        let data = public.keys()[0].key_data.as_ref().unwrap();
        assert_eq!(data.key_material_type(), KeyMaterialType::AsymmetricPublic);
    }

    #[test]
    fn test_encrypted_keyset_roundtrip_binds_associated_data() {
        let registry = KeyManagerRegistry::local();
        let master = crate::aead::AesGcm::new(&[4u8; 16]).unwrap();
        let handle = KeysetHandle::generate(&named_template("HMAC_SHA256_128BITTAG").unwrap(), &registry)
            .unwrap();

        let encrypted = handle.write_encrypted(&master, b"ad").unwrap();
        let again = KeysetHandle::read_encrypted_binary(&encrypted, &master, b"ad").unwrap();
        assert_eq!(handle.keyset(), again.keyset());
        assert!(KeysetHandle::read_encrypted_binary(&encrypted, &master, b"other").is_err());

        let json = handle.write_encrypted_json(&master, b"").unwrap();
        let again = KeysetHandle::read_encrypted_json(&json, &master, b"").unwrap();
        assert_eq!(handle.keyset(), again.keyset());
    }

    #[test]
    fn test_debug_hides_key_material() {
        let registry = KeyManagerRegistry::local();
        let handle =
            KeysetHandle::generate(&named_template("AES128_GCM").unwrap(), &registry).unwrap();
        let rendered = format!("{:?}", handle);
        assert!(rendered.contains("keyset_info"));
        assert!(!rendered.contains("key_value"));
    }
}
