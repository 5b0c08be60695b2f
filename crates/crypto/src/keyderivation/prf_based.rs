//! Derivation key backed by an HKDF PRF key. The salt is the PRF input and
//! the PRF output stream is the key material for the derived key template.

use crate::error::{CryptoError, CryptoResult};
use crate::prf::{HkdfPrf, HKDF_PRF_TYPE_URL};
use crate::primitive::{KeyDeriver, KeyPrimitive, PrimitiveKind};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{
    HkdfPrfKey, KeyData, KeyTemplate, PrfBasedDeriverKey, PrfBasedDeriverKeyFormat,
    PrfBasedDeriverParams,
};
use crate::registry::{key_data, KeyManager, KeyManagerRegistry};
use crate::util::validate_version;
use prost::Message;
use std::sync::Arc;

pub const PRF_BASED_DERIVER_TYPE_URL: &str =
    "type.googleapis.com/google.crypto.tink.PrfBasedDeriverKey";

fn derived_template(params: Option<&PrfBasedDeriverParams>) -> CryptoResult<&KeyTemplate> {
    params
        .and_then(|p| p.derived_key_template.as_ref())
        .ok_or_else(|| CryptoError::InvalidKey("deriver key has no derived key template".to_string()))
}

fn derivation_manager(
    registry: &KeyManagerRegistry,
    template: &KeyTemplate,
) -> CryptoResult<Arc<dyn KeyManager>> {
    let manager = registry.get(&template.type_url)?;
    if !manager.supports_derivation() {
        return Err(CryptoError::UnsupportedParameters(format!(
            "key type {} cannot be derived",
            template.type_url
        )));
    }
    Ok(manager)
}

struct PrfBasedDeriver {
    prf: HkdfPrf,
    template: KeyTemplate,
    manager: Arc<dyn KeyManager>,
}

impl KeyDeriver for PrfBasedDeriver {
    fn derive_key_data(&self, salt: &[u8]) -> CryptoResult<KeyData> {
        let mut stream = self.prf.stream(salt)?;
        self.manager
            .derive_key_data(&self.template.value, &mut stream)
    }
}

pub struct PrfBasedDeriverKeyManager;

impl KeyManager for PrfBasedDeriverKeyManager {
    fn type_url(&self) -> &'static str {
        PRF_BASED_DERIVER_TYPE_URL
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::Symmetric
    }

    fn primitive_kind(&self) -> PrimitiveKind {
        PrimitiveKind::KeysetDeriver
    }

    fn primitive(&self, serialized_key: &[u8], registry: &KeyManagerRegistry) -> CryptoResult<KeyPrimitive> {
        let key = PrfBasedDeriverKey::decode(serialized_key)?;
        validate_version(key.version, 0)?;
        let prf_key = key
            .prf_key
            .as_ref()
            .ok_or_else(|| CryptoError::InvalidKey("deriver key has no PRF key".to_string()))?;
        if prf_key.type_url != HKDF_PRF_TYPE_URL {
            return Err(CryptoError::UnsupportedParameters(format!(
                "PRF key type {} cannot drive key derivation",
                prf_key.type_url
            )));
        }
        let prf = HkdfPrf::from_key(&HkdfPrfKey::decode(prf_key.value.as_slice())?)?;
        let template = derived_template(key.params.as_ref())?.clone();
        let manager = derivation_manager(registry, &template)?;
        Ok(KeyPrimitive::KeyDeriver(Box::new(PrfBasedDeriver {
            prf,
            template,
            manager,
        })))
    }

    fn new_key_data(&self, serialized_format: &[u8], registry: &KeyManagerRegistry) -> CryptoResult<KeyData> {
        let format = PrfBasedDeriverKeyFormat::decode(serialized_format)?;
        let prf_template = format.prf_key_template.as_ref().ok_or_else(|| {
            CryptoError::InvalidKeyFormat("deriver format has no PRF key template".to_string())
        })?;
        if prf_template.type_url != HKDF_PRF_TYPE_URL {
            return Err(CryptoError::UnsupportedParameters(format!(
                "PRF key type {} cannot drive key derivation",
                prf_template.type_url
            )));
        }
        derivation_manager(registry, derived_template(format.params.as_ref())?)?;

        let key = PrfBasedDeriverKey {
            version: 0,
            prf_key: Some(registry.new_key_data(prf_template)?),
            params: format.params,
        };
        Ok(key_data(PRF_BASED_DERIVER_TYPE_URL, &key, KeyMaterialType::Symmetric))
    }
}
