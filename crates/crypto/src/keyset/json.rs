//! JSON keyset format shared by every language implementation.
//!
//! ```json
//! {
//!   "primaryKeyId": 42,
//!   "key": [{
//!     "keyData": {"typeUrl": "...", "value": "<base64>", "keyMaterialType": "SYMMETRIC"},
//!     "status": "ENABLED",
//!     "keyId": 42,
//!     "outputPrefixType": "TINK"
//!   }]
//! }
//! ```

use crate::error::{CryptoError, CryptoResult};
use crate::proto::key_data::KeyMaterialType;
use crate::proto::{keyset, keyset_info, EncryptedKeyset, KeyData, KeyStatusType, Keyset, KeysetInfo, OutputPrefixType};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonKeyset {
    #[serde(default)]
    primary_key_id: u32,
    #[serde(default)]
    key: Vec<JsonKey>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonKey {
    key_data: Option<JsonKeyData>,
    status: String,
    key_id: u32,
    output_prefix_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonKeyData {
    type_url: String,
    value: String,
    key_material_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonEncryptedKeyset {
    encrypted_keyset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    keyset_info: Option<JsonKeysetInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonKeysetInfo {
    #[serde(default)]
    primary_key_id: u32,
    #[serde(default)]
    key_info: Vec<JsonKeyInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonKeyInfo {
    type_url: String,
    status: String,
    key_id: u32,
    output_prefix_type: String,
}

fn json_error(err: serde_json::Error) -> CryptoError {
    CryptoError::Json(err.to_string())
}

fn status_from_name(name: &str) -> CryptoResult<i32> {
    KeyStatusType::from_str_name(name)
        .map(|s| s as i32)
        .ok_or_else(|| CryptoError::Json(format!("unknown key status '{}'", name)))
}

fn prefix_from_name(name: &str) -> CryptoResult<i32> {
    OutputPrefixType::from_str_name(name)
        .map(|p| p as i32)
        .ok_or_else(|| CryptoError::Json(format!("unknown output prefix type '{}'", name)))
}

fn status_name(status: i32) -> &'static str {
    KeyStatusType::try_from(status)
        .unwrap_or(KeyStatusType::UnknownStatus)
        .as_str_name()
}

fn prefix_name(prefix: i32) -> &'static str {
    OutputPrefixType::try_from(prefix)
        .unwrap_or(OutputPrefixType::UnknownPrefix)
        .as_str_name()
}

fn decode_base64(field: &str, value: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| CryptoError::Json(format!("{} is not valid base64: {}", field, e)))
}

pub fn keyset_to_json(keyset: &Keyset) -> CryptoResult<String> {
    let json = JsonKeyset {
        primary_key_id: keyset.primary_key_id,
        key: keyset
            .key
            .iter()
            .map(|key| JsonKey {
                key_data: key.key_data.as_ref().map(|data| JsonKeyData {
                    type_url: data.type_url.clone(),
                    value: STANDARD.encode(&data.value),
                    key_material_type: data.key_material_type().as_str_name().to_string(),
                }),
                status: status_name(key.status).to_string(),
                key_id: key.key_id,
                output_prefix_type: prefix_name(key.output_prefix_type).to_string(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&json).map_err(json_error)
}

pub fn keyset_from_json(input: &str) -> CryptoResult<Keyset> {
    let json: JsonKeyset = serde_json::from_str(input).map_err(json_error)?;
    let mut keys = Vec::with_capacity(json.key.len());
    for key in json.key {
        let key_data = match key.key_data {
            Some(data) => Some(KeyData {
                value: decode_base64("keyData.value", &data.value)?,
                key_material_type: KeyMaterialType::from_str_name(&data.key_material_type)
                    .map(|t| t as i32)
                    .ok_or_else(|| {
                        CryptoError::Json(format!(
                            "unknown key material type '{}'",
                            data.key_material_type
                        ))
                    })?,
                type_url: data.type_url,
            }),
            None => None,
        };
        keys.push(keyset::Key {
            key_data,
            status: status_from_name(&key.status)?,
            key_id: key.key_id,
            output_prefix_type: prefix_from_name(&key.output_prefix_type)?,
        });
    }
    Ok(Keyset {
        primary_key_id: json.primary_key_id,
        key: keys,
    })
}

fn info_to_json(info: &KeysetInfo) -> JsonKeysetInfo {
    JsonKeysetInfo {
        primary_key_id: info.primary_key_id,
        key_info: info
            .key_info
            .iter()
            .map(|k| JsonKeyInfo {
                type_url: k.type_url.clone(),
                status: status_name(k.status).to_string(),
                key_id: k.key_id,
                output_prefix_type: prefix_name(k.output_prefix_type).to_string(),
            })
            .collect(),
    }
}

fn info_from_json(info: JsonKeysetInfo) -> CryptoResult<KeysetInfo> {
    let key_info = info
        .key_info
        .into_iter()
        .map(|k| {
            Ok(keyset_info::KeyInfo {
                status: status_from_name(&k.status)?,
                output_prefix_type: prefix_from_name(&k.output_prefix_type)?,
                type_url: k.type_url,
                key_id: k.key_id,
            })
        })
        .collect::<CryptoResult<Vec<_>>>()?;
    Ok(KeysetInfo {
        primary_key_id: info.primary_key_id,
        key_info,
    })
}

pub fn encrypted_keyset_to_json(encrypted: &EncryptedKeyset) -> CryptoResult<String> {
    let json = JsonEncryptedKeyset {
        encrypted_keyset: STANDARD.encode(&encrypted.encrypted_keyset),
        keyset_info: encrypted.keyset_info.as_ref().map(info_to_json),
    };
    serde_json::to_string_pretty(&json).map_err(json_error)
}

pub fn encrypted_keyset_from_json(input: &str) -> CryptoResult<EncryptedKeyset> {
    let json: JsonEncryptedKeyset = serde_json::from_str(input).map_err(json_error)?;
    Ok(EncryptedKeyset {
        encrypted_keyset: decode_base64("encryptedKeyset", &json.encrypted_keyset)?,
        keyset_info: json.keyset_info.map(info_from_json).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "primaryKeyId": 42,
        "key": [{
            "keyData": {
                "typeUrl": "type.googleapis.com/google.crypto.tink.AesGcmKey",
                "value": "GhCS/1+ejWpx68NfGt6ziYHd",
                "keyMaterialType": "SYMMETRIC"
            },
            "status": "ENABLED",
            "keyId": 42,
            "outputPrefixType": "TINK"
        }]
    }"#;

    #[test]
    fn test_parse_sample() {
        let keyset = keyset_from_json(SAMPLE).unwrap();
        assert_eq!(keyset.primary_key_id, 42);
        assert_eq!(keyset.key.len(), 1);
        let key = &keyset.key[0];
        assert_eq!(key.status(), KeyStatusType::Enabled);
        assert_eq!(key.output_prefix_type(), OutputPrefixType::Tink);
        let data = key.key_data.as_ref().unwrap();
        assert_eq!(data.key_material_type(), KeyMaterialType::Symmetric);
        assert_eq!(data.value.len(), 18);
    }

    #[test]
    fn test_json_roundtrip_preserves_keyset() {
        let keyset = keyset_from_json(SAMPLE).unwrap();
        let again = keyset_from_json(&keyset_to_json(&keyset).unwrap()).unwrap();
        assert_eq!(keyset, again);
    }

    #[test]
    fn test_rejects_unknown_status_and_bad_base64() {
        assert!(keyset_from_json(&SAMPLE.replace("ENABLED", "SLEEPING")).is_err());
        assert!(keyset_from_json(&SAMPLE.replace("GhCS/1+ejWpx68NfGt6ziYHd", "%%%")).is_err());
        assert!(keyset_from_json("not json").is_err());
    }

    #[test]
    fn test_encrypted_keyset_json() {
        let encrypted = EncryptedKeyset {
            encrypted_keyset: vec![1, 2, 3],
            keyset_info: Some(KeysetInfo {
                primary_key_id: 7,
                key_info: vec![keyset_info::KeyInfo {
                    type_url: "t".to_string(),
                    status: KeyStatusType::Enabled as i32,
                    key_id: 7,
                    output_prefix_type: OutputPrefixType::Raw as i32,
                }],
            }),
        };
        let json = encrypted_keyset_to_json(&encrypted).unwrap();
        assert!(json.contains("\"encryptedKeyset\": \"AQID\""));
        assert_eq!(encrypted_keyset_from_json(&json).unwrap(), encrypted);
    }
}
