//! Turns an [`AnnotatedKeyset`] into a validated [`KeysetHandle`].
//!
//! Resolution never caches: every call parses the request's bytes again and
//! the returned handle belongs to the caller.

use crate::error::{HarnessError, HarnessResult};
use crate::proto::AnnotatedKeyset;
use crosscheck_crypto::{KeyManagerRegistry, KeysetHandle};
use tracing::debug;

/// Resolves the keyset carried by a request.
///
/// When `kms_key_uri` is set the bytes are an encrypted keyset that is
/// unwrapped with the AEAD of the KMS client claiming that URI. Every key
/// in the result must have a registered key manager.
pub fn resolve(
    annotated: Option<&AnnotatedKeyset>,
    registry: &KeyManagerRegistry,
) -> HarnessResult<KeysetHandle> {
    let annotated =
        annotated.ok_or_else(|| HarnessError::Resolution("missing annotated keyset".to_string()))?;
    if !annotated.annotations.is_empty() {
        debug!(annotations = ?annotated.annotations, "resolving annotated keyset");
    }
    if annotated.serialized_keyset.is_empty() {
        return Err(HarnessError::Resolution("keyset is empty".to_string()));
    }

    let handle = if annotated.kms_key_uri.is_empty() {
        KeysetHandle::read(&annotated.serialized_keyset)
            .map_err(|e| HarnessError::Resolution(e.to_string()))?
    } else {
        read_kms_wrapped(annotated, registry)?
    };

    for key in handle.keys() {
        if let Some(key_data) = &key.key_data {
            if !registry.contains(&key_data.type_url) {
                return Err(HarnessError::Resolution(format!(
                    "key {} has unknown key type {}",
                    key.key_id, key_data.type_url
                )));
            }
        }
    }
    Ok(handle)
}

/// Parses a binary keyset that is not KMS-wrapped.
pub fn resolve_bytes(serialized: &[u8], registry: &KeyManagerRegistry) -> HarnessResult<KeysetHandle> {
    resolve(
        Some(&AnnotatedKeyset {
            serialized_keyset: serialized.to_vec(),
            ..Default::default()
        }),
        registry,
    )
}

fn read_kms_wrapped(
    annotated: &AnnotatedKeyset,
    registry: &KeyManagerRegistry,
) -> HarnessResult<KeysetHandle> {
    let key_uri = annotated.kms_key_uri.as_str();
    let master = registry
        .kms()
        .find_for(key_uri)
        .and_then(|client| client.get_aead(key_uri))
        .map_err(|e| HarnessError::Resolution(e.to_string()))?;
    let associated_data = annotated.associated_data.as_deref().unwrap_or_default();
    debug!(key_uri, "unwrapping KMS-encrypted keyset");
    KeysetHandle::read_encrypted_binary(
        &annotated.serialized_keyset,
        master.as_ref(),
        associated_data,
    )
    .map_err(|e| HarnessError::Resolution(e.to_string()))
}
