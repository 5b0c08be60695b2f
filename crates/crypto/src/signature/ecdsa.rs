//! ECDSA over NIST P-256 with SHA-256, DER or IEEE P1363 encoded.

use crate::error::{CryptoError, CryptoResult};
use crate::primitive::{KeyPrimitive, PrimitiveKind, Signer, Verifier};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{
    EcdsaKeyFormat, EcdsaParams, EcdsaPrivateKey, EcdsaPublicKey, EcdsaSignatureEncoding,
    EllipticCurveType, HashType, KeyData,
};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::{fixed_width, validate_version};
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::{EncodedPoint, FieldBytes};
use prost::Message;

pub const ECDSA_PRIVATE_KEY_TYPE_URL: &str =
    "type.googleapis.com/google.crypto.tink.EcdsaPrivateKey";
pub const ECDSA_PUBLIC_KEY_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.EcdsaPublicKey";

const FIELD_SIZE: usize = 32;

fn validate_params(params: Option<&EcdsaParams>) -> CryptoResult<EcdsaSignatureEncoding> {
    let params = params
        .ok_or_else(|| CryptoError::InvalidKey("ECDSA key has no parameters".to_string()))?;
    if params.curve() != EllipticCurveType::NistP256 {
        return Err(CryptoError::UnsupportedParameters(format!(
            "ECDSA curve {} is not supported",
            params.curve().as_str_name()
        )));
    }
    if params.hash_type() != HashType::Sha256 {
        return Err(CryptoError::UnsupportedParameters(format!(
            "ECDSA P-256 requires SHA256, got {}",
            params.hash_type().as_str_name()
        )));
    }
    match params.encoding() {
        EcdsaSignatureEncoding::UnknownEncoding => Err(CryptoError::UnsupportedParameters(
            "ECDSA signature encoding is unknown".to_string(),
        )),
        encoding => Ok(encoding),
    }
}

fn verifying_key(public_key: &EcdsaPublicKey) -> CryptoResult<VerifyingKey> {
    let x: [u8; FIELD_SIZE] = fixed_width(&public_key.x)?;
    let y: [u8; FIELD_SIZE] = fixed_width(&public_key.y)?;
    let point = EncodedPoint::from_affine_coordinates(
        FieldBytes::from_slice(&x),
        FieldBytes::from_slice(&y),
        false,
    );
    VerifyingKey::from_encoded_point(&point)
        .map_err(|_| CryptoError::InvalidKey("ECDSA public point is not on P-256".to_string()))
}

fn public_key_proto(key: &VerifyingKey, params: EcdsaParams) -> CryptoResult<EcdsaPublicKey> {
    let point = key.to_encoded_point(false);
    let (x, y) = point
        .x()
        .zip(point.y())
        .ok_or_else(|| CryptoError::InvalidKey("ECDSA public key is the identity".to_string()))?;
    Ok(EcdsaPublicKey {
        version: 0,
        params: Some(params),
        x: x.to_vec(),
        y: y.to_vec(),
    })
}

pub struct EcdsaSigner {
    key: SigningKey,
    encoding: EcdsaSignatureEncoding,
}

impl EcdsaSigner {
    pub fn new(scalar: &[u8], encoding: EcdsaSignatureEncoding) -> CryptoResult<Self> {
        let scalar: [u8; FIELD_SIZE] = fixed_width(scalar)?;
        let key = SigningKey::from_slice(&scalar)
            .map_err(|_| CryptoError::InvalidKey("invalid ECDSA P-256 private key".to_string()))?;
        Ok(Self { key, encoding })
    }
}

impl Signer for EcdsaSigner {
    fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let signature: Signature = self
            .key
            .try_sign(data)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(match self.encoding {
            EcdsaSignatureEncoding::Der => signature.to_der().as_bytes().to_vec(),
            _ => signature.to_bytes().to_vec(),
        })
    }
}

pub struct EcdsaVerifier {
    key: VerifyingKey,
    encoding: EcdsaSignatureEncoding,
}

impl EcdsaVerifier {
    pub fn new(public_key: &EcdsaPublicKey) -> CryptoResult<Self> {
        let encoding = validate_params(public_key.params.as_ref())?;
        Ok(Self {
            key: verifying_key(public_key)?,
            encoding,
        })
    }
}

impl Verifier for EcdsaVerifier {
    fn verify(&self, signature: &[u8], data: &[u8]) -> CryptoResult<()> {
        let signature = match self.encoding {
            EcdsaSignatureEncoding::Der => Signature::from_der(signature),
            _ => Signature::from_slice(signature),
        }
        .map_err(|_| CryptoError::InvalidSignature)?;
        self.key
            .verify(data, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

pub struct EcdsaPrivateKeyManager;

impl KeyManager for EcdsaPrivateKeyManager {
    fn type_url(&self) -> &'static str {
        ECDSA_PRIVATE_KEY_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPrivate
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::Signer
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = EcdsaPrivateKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        let public_key = key
            .public_key
            .ok_or_else(|| CryptoError::InvalidKey("ECDSA private key has no public key".to_string()))?;
        let encoding = validate_params(public_key.params.as_ref())?;
        Ok(KeyPrimitive::Signer(Box::new(EcdsaSigner::new(
            &key.key_value,
            encoding,
        )?)))
    }

    fn new_key_data(&self, serialized_format: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        let format = EcdsaKeyFormat::decode(serialized_format)?;
        validate_version(format.version, 0)?;
        validate_params(format.params.as_ref())?;
        let params = format.params.unwrap_or_default();

        let signing = SigningKey::random(&mut rand::rngs::OsRng);
        let key = EcdsaPrivateKey {
            version: 0,
            public_key: Some(public_key_proto(signing.verifying_key(), params)?),
            key_value: signing.to_bytes().to_vec(),
        };
        Ok(key_data(
            ECDSA_PRIVATE_KEY_TYPE_URL,
            &key,
            KeyMaterialType::AsymmetricPrivate,
        ))
    }

    fn public_key_data(&self, serialized_private_key: &[u8]) -> CryptoResult<KeyData> {
        let key = EcdsaPrivateKey::decode(serialized_private_key)?;
        let public_key = key
            .public_key
            .ok_or_else(|| CryptoError::InvalidKey("ECDSA private key has no public key".to_string()))?;
        Ok(key_data(
            ECDSA_PUBLIC_KEY_TYPE_URL,
            &public_key,
            KeyMaterialType::AsymmetricPublic,
        ))
    }
}

pub struct EcdsaPublicKeyManager;

impl KeyManager for EcdsaPublicKeyManager {
    fn type_url(&self) -> &'static str {
        ECDSA_PUBLIC_KEY_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPublic
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::Verifier
    }

    fn primitive(&self, serialized_key: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = EcdsaPublicKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        Ok(KeyPrimitive::Verifier(Box::new(EcdsaVerifier::new(&key)?)))
    }

    fn new_key_data(&self, _: &[u8], _: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        Err(CryptoError::InvalidKeyFormat(
            "public keys are obtained from private keys".to_string(),
        ))
    }
}
