//! HPKE (RFC 9180) base mode with DHKEM(X25519, HKDF-SHA256), HKDF-SHA256
//! and one of AES-128-GCM, AES-256-GCM or ChaCha20-Poly1305.
//!
//! The context info is the HPKE `info`, the AEAD associated data is empty
//! and the ciphertext is `encapsulated key || sealed payload`.

use crate::error::{CryptoError, CryptoResult};
use crate::primitive::{HybridDecrypt, HybridEncrypt, KeyPrimitive, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{
    HpkeAead, HpkeKdf, HpkeKem, HpkeKeyFormat, HpkeParams, HpkePrivateKey, HpkePublicKey, KeyData,
};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::validate_version;
use ::hpke::kdf::HkdfSha256;
use ::hpke::{Deserializable, Kem as _, OpModeR, OpModeS, Serializable};
use prost::Message;
use zeroize::Zeroizing;

pub const HPKE_PRIVATE_KEY_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.HpkePrivateKey";
pub const HPKE_PUBLIC_KEY_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.HpkePublicKey";

type Kem = ::hpke::kem::X25519HkdfSha256;
type PublicKey = <Kem as ::hpke::Kem>::PublicKey;
type PrivateKey = <Kem as ::hpke::Kem>::PrivateKey;
type EncappedKey = <Kem as ::hpke::Kem>::EncappedKey;

const ENCAPSULATED_KEY_SIZE: usize = 32;

fn hpke_error(err: ::hpke::HpkeError) -> String {
    err.to_string()
}

fn validate_params(params: Option<&HpkeParams>) -> CryptoResult<HpkeAead> {
    let params =
        params.ok_or_else(|| CryptoError::InvalidKey("HPKE key has no parameters".to_string()))?;
    if params.kem() != HpkeKem::DhkemX25519HkdfSha256 {
        return Err(CryptoError::UnsupportedParameters(format!(
            "HPKE KEM {} is not supported",
            params.kem().as_str_name()
        )));
    }
    if params.kdf() != HpkeKdf::HkdfSha256 {
        return Err(CryptoError::UnsupportedParameters(format!(
            "HPKE KDF {} is not supported",
            params.kdf().as_str_name()
        )));
    }
    match params.aead() {
        HpkeAead::AeadUnknown => Err(CryptoError::UnsupportedParameters(
            "HPKE AEAD is unknown".to_string(),
        )),
        aead => Ok(aead),
    }
}

fn seal<A: ::hpke::aead::Aead>(
    recipient: &PublicKey,
    info: &[u8],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let (encapsulated, mut ctx) = ::hpke::setup_sender::<A, HkdfSha256, Kem, _>(
        &OpModeS::Base,
        recipient,
        info,
        &mut rand::rngs::OsRng,
    )
    .map_err(|e| CryptoError::Encryption(hpke_error(e)))?;
    let sealed = ctx
        .seal(plaintext, &[])
        .map_err(|e| CryptoError::Encryption(hpke_error(e)))?;
    Ok([encapsulated.to_bytes().as_slice(), sealed.as_slice()].concat())
}

fn open<A: ::hpke::aead::Aead>(
    recipient: &PrivateKey,
    info: &[u8],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    if ciphertext.len() < ENCAPSULATED_KEY_SIZE {
        return Err(CryptoError::Decryption("ciphertext too short".to_string()));
    }
    let (encapsulated, sealed) = ciphertext.split_at(ENCAPSULATED_KEY_SIZE);
    let encapsulated = EncappedKey::from_bytes(encapsulated)
        .map_err(|e| CryptoError::Decryption(hpke_error(e)))?;
    let mut ctx =
        ::hpke::setup_receiver::<A, HkdfSha256, Kem>(&OpModeR::Base, recipient, &encapsulated, info)
            .map_err(|e| CryptoError::Decryption(hpke_error(e)))?;
    ctx.open(sealed, &[])
        .map_err(|e| CryptoError::Decryption(hpke_error(e)))
}

pub struct HpkeEncrypt {
    recipient: PublicKey,
    aead: HpkeAead,
}

impl HpkeEncrypt {
    pub fn new(public_key: &HpkePublicKey) -> CryptoResult<Self> {
        let aead = validate_params(public_key.params.as_ref())?;
        let recipient = PublicKey::from_bytes(&public_key.public_key)
            .map_err(|e| CryptoError::InvalidKey(hpke_error(e)))?;
        Ok(Self { recipient, aead })
    }
}

impl HybridEncrypt for HpkeEncrypt {
    fn encrypt(&self, plaintext: &[u8], context_info: &[u8]) -> CryptoResult<Vec<u8>> {
        match self.aead {
            HpkeAead::Aes128Gcm => seal::<::hpke::aead::AesGcm128>(&self.recipient, context_info, plaintext),
            HpkeAead::Aes256Gcm => seal::<::hpke::aead::AesGcm256>(&self.recipient, context_info, plaintext),
            HpkeAead::Chacha20Poly1305 => {
                seal::<::hpke::aead::ChaCha20Poly1305>(&self.recipient, context_info, plaintext)
            }
            HpkeAead::AeadUnknown => Err(CryptoError::UnsupportedParameters(
                "HPKE AEAD is unknown".to_string(),
            )),
        }
    }
}

pub struct HpkeDecrypt {
    recipient: PrivateKey,
    aead: HpkeAead,
}

impl HpkeDecrypt {
    pub fn new(private_key: &HpkePrivateKey) -> CryptoResult<Self> {
        let public_key = private_key
            .public_key
            .as_ref()
            .ok_or_else(|| CryptoError::InvalidKey("HPKE private key has no public key".to_string()))?;
        let aead = validate_params(public_key.params.as_ref())?;
        let recipient = PrivateKey::from_bytes(&private_key.private_key)
            .map_err(|e| CryptoError::InvalidKey(hpke_error(e)))?;
        Ok(Self { recipient, aead })
    }
}

impl HybridDecrypt for HpkeDecrypt {
    fn decrypt(&self, ciphertext: &[u8], context_info: &[u8]) -> CryptoResult<Vec<u8>> {
        match self.aead {
            HpkeAead::Aes128Gcm => open::<::hpke::aead::AesGcm128>(&self.recipient, context_info, ciphertext),
            HpkeAead::Aes256Gcm => open::<::hpke::aead::AesGcm256>(&self.recipient, context_info, ciphertext),
            HpkeAead::Chacha20Poly1305 => {
                open::<::hpke::aead::ChaCha20Poly1305>(&self.recipient, context_info, ciphertext)
            }
            HpkeAead::AeadUnknown => Err(CryptoError::UnsupportedParameters(
                "HPKE AEAD is unknown".to_string(),
            )),
        }
    }
}

pub struct HpkePrivateKeyManager;

impl KeyManager for HpkePrivateKeyManager {
    fn type_url(&self) -> &'static str {
        HPKE_PRIVATE_KEY_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPrivate
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::HybridDecrypt
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = HpkePrivateKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        Ok(KeyPrimitive::HybridDecrypt(Box::new(HpkeDecrypt::new(&key)?)))
    }

    fn new_key_data(&self, serialized_format: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        let format = HpkeKeyFormat::decode(serialized_format)?;
        validate_params(format.params.as_ref())?;

        let (private_key, public_key) = Kem::gen_keypair(&mut rand::rngs::OsRng);
        let private_bytes = Zeroizing::new(private_key.to_bytes().to_vec());
        let key = HpkePrivateKey {
            version: 0,
            public_key: Some(HpkePublicKey {
                version: 0,
                params: format.params,
                public_key: public_key.to_bytes().to_vec(),
            }),
            private_key: private_bytes.to_vec(),
        };
        Ok(key_data(
            HPKE_PRIVATE_KEY_TYPE_URL,
            &key,
            KeyMaterialType::AsymmetricPrivate,
        ))
    }

    fn public_key_data(&self, serialized_private_key: &[u8]) -> CryptoResult<KeyData> {
        let key = HpkePrivateKey::decode(serialized_private_key)?;
        let public_key = key
            .public_key
            .ok_or_else(|| CryptoError::InvalidKey("HPKE private key has no public key".to_string()))?;
        Ok(key_data(
            HPKE_PUBLIC_KEY_TYPE_URL,
            &public_key,
            KeyMaterialType::AsymmetricPublic,
        ))
    }
}

pub struct HpkePublicKeyManager;

impl KeyManager for HpkePublicKeyManager {
    fn type_url(&self) -> &'static str {
        HPKE_PUBLIC_KEY_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPublic
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::HybridEncrypt
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = HpkePublicKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        Ok(KeyPrimitive::HybridEncrypt(Box::new(HpkeEncrypt::new(&key)?)))
    }

    fn new_key_data(&self, _: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        Err(CryptoError::InvalidKeyFormat(
            "public keys are obtained from private keys".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_pair(aead: HpkeAead) -> (HpkeEncrypt, HpkeDecrypt) {
        let format = HpkeKeyFormat {
            params: Some(HpkeParams {
                kem: HpkeKem::DhkemX25519HkdfSha256 as i32,
                kdf: HpkeKdf::HkdfSha256 as i32,
                aead: aead as i32,
            }),
        };
        let registry = KeyManagerRegistry::local();
        let data = HpkePrivateKeyManager
            .new_key_data(&format.encode_to_vec(), &registry)
            .unwrap();
        let private = HpkePrivateKey::decode(data.value.as_slice()).unwrap();
        let encrypt = HpkeEncrypt::new(private.public_key.as_ref().unwrap()).unwrap();
        (encrypt, HpkeDecrypt::new(&private).unwrap())
    }

    #[test]
    fn test_roundtrip_for_every_aead() {
        for aead in [HpkeAead::Aes128Gcm, HpkeAead::Aes256Gcm, HpkeAead::Chacha20Poly1305] {
            let (encrypt, decrypt) = key_pair(aead);
            let ciphertext = encrypt.encrypt(b"secret", b"context").unwrap();
            assert_eq!(ciphertext.len(), ENCAPSULATED_KEY_SIZE + 6 + 16);
            assert_eq!(decrypt.decrypt(&ciphertext, b"context").unwrap(), b"secret");
        }
    }

    #[test]
    fn test_context_info_is_bound() {
        let (encrypt, decrypt) = key_pair(HpkeAead::Aes128Gcm);
        let ciphertext = encrypt.encrypt(b"secret", b"context").unwrap();
        assert!(decrypt.decrypt(&ciphertext, b"other").is_err());
        assert!(decrypt.decrypt(&ciphertext[..10], b"context").is_err());
    }

    #[test]
    fn test_rejects_p256_kem() {
        let params = HpkeParams {
            kem: HpkeKem::DhkemP256HkdfSha256 as i32,
            kdf: HpkeKdf::HkdfSha256 as i32,
            aead: HpkeAead::Aes128Gcm as i32,
        };
        assert!(validate_params(Some(&params)).is_err());
    }
}
