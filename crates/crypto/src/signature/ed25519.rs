use crate::error::{CryptoError, CryptoResult};
use crate::keyderivation::KeyMaterialStream;
use crate::primitive::{KeyPrimitive, PrimitiveKind, Signer, Verifier};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{Ed25519KeyFormat, Ed25519PrivateKey, Ed25519PublicKey, KeyData};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::{random_bytes, validate_version};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use prost::Message;

pub const ED25519_PRIVATE_KEY_TYPE_URL: &str =
    "type.googleapis.com/google.crypto.tink.Ed25519PrivateKey";
pub const ED25519_PUBLIC_KEY_TYPE_URL: &str =
    "type.googleapis.com/google.crypto.tink.Ed25519PublicKey";

const KEY_SIZE: usize = 32;

fn to_array(bytes: &[u8], what: &str) -> CryptoResult<[u8; KEY_SIZE]> {
    bytes.try_into().map_err(|_| {
        CryptoError::InvalidKey(format!(
            "Ed25519 {} must be {} bytes, got {}",
            what,
            KEY_SIZE,
            bytes.len()
        ))
    })
}

pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    pub fn new(seed: &[u8]) -> CryptoResult<Self> {
        Ok(Self {
            key: SigningKey::from_bytes(&to_array(seed, "private key")?),
        })
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(self.key.sign(data).to_bytes().to_vec())
    }
}

pub struct Ed25519Verifier {
    key: VerifyingKey,
}

impl Ed25519Verifier {
    pub fn new(public_key: &[u8]) -> CryptoResult<Self> {
        let key = VerifyingKey::from_bytes(&to_array(public_key, "public key")?)
            .map_err(|e| CryptoError::InvalidKey(format!("invalid Ed25519 public key: {}", e)))?;
        Ok(Self { key })
    }
}

impl Verifier for Ed25519Verifier {
    fn verify(&self, signature: &[u8], data: &[u8]) -> CryptoResult<()> {
        let signature =
            Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;
        self.key
            .verify(data, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

fn private_key_data(seed: Vec<u8>) -> CryptoResult<KeyData> {
    let signing = SigningKey::from_bytes(&to_array(&seed, "private key")?);
    let key = Ed25519PrivateKey {
        version: 0,
        key_value: seed,
        public_key: Some(Ed25519PublicKey {
            version: 0,
            key_value: signing.verifying_key().to_bytes().to_vec(),
        }),
    };
    Ok(key_data(
        ED25519_PRIVATE_KEY_TYPE_URL,
        &key,
        KeyMaterialType::AsymmetricPrivate,
    ))
}

pub struct Ed25519PrivateKeyManager;

impl KeyManager for Ed25519PrivateKeyManager {
    fn type_url(&self) -> &'static str {
        ED25519_PRIVATE_KEY_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPrivate
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::Signer
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = Ed25519PrivateKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        Ok(KeyPrimitive::Signer(Box::new(Ed25519Signer::new(&key.key_value)?)))
    }

    fn new_key_data(&self, serialized_format: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        let format = Ed25519KeyFormat::decode(serialized_format)?;
        validate_version(format.version, 0)?;
        private_key_data(random_bytes(KEY_SIZE))
    }

    fn supports_derivation(&self) -> bool {
        true
    }

    fn derive_key_data(
        &self,
        serialized_format: &[u8],
        stream: &mut KeyMaterialStream,
    ) -> CryptoResult<KeyData> {
        let format = Ed25519KeyFormat::decode(serialized_format)?;
        validate_version(format.version, 0)?;
        private_key_data(stream.read(KEY_SIZE)?)
    }

    fn public_key_data(&self, serialized_private_key: &[u8]) -> CryptoResult<KeyData> {
        let key = Ed25519PrivateKey::decode(serialized_private_key)?;
        let public_key = key
            .public_key
            .ok_or_else(|| CryptoError::InvalidKey("Ed25519 private key has no public key".to_string()))?;
        Ok(key_data(
            ED25519_PUBLIC_KEY_TYPE_URL,
            &public_key,
            KeyMaterialType::AsymmetricPublic,
        ))
    }
}

pub struct Ed25519PublicKeyManager;

impl KeyManager for Ed25519PublicKeyManager {
    fn type_url(&self) -> &'static str {
        ED25519_PUBLIC_KEY_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPublic
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::Verifier
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = Ed25519PublicKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        Ok(KeyPrimitive::Verifier(Box::new(Ed25519Verifier::new(&key.key_value)?)))
    }

    fn new_key_data(&self, _: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        Err(CryptoError::InvalidKeyFormat(
            "public keys are obtained from private keys".to_string(),
        ))
    }
}
