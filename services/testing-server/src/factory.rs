//! Typed primitive construction from a resolved handle.

use crate::error::{HarnessError, HarnessResult};
use crosscheck_crypto::{
    Aead, DeterministicAead, HybridDecrypt, HybridEncrypt, KeyManagerRegistry, KeysetDeriver,
    KeysetHandle, Mac, PrfSet, Primitive, PrimitiveKind, Signer, Verifier,
};

/// Builds the primitive of `kind`, mapping every failure to
/// [`HarnessError::Construction`].
pub fn build(
    handle: &KeysetHandle,
    kind: PrimitiveKind,
    registry: &KeyManagerRegistry,
) -> HarnessResult<Primitive> {
    handle
        .primitive(kind, registry)
        .map_err(|e| HarnessError::Construction(e.to_string()))
}

macro_rules! typed_builder {
    ($(#[$doc:meta])* $name:ident, $kind:ident, $variant:ident, $out:ty) => {
        $(#[$doc])*
        pub fn $name(handle: &KeysetHandle, registry: &KeyManagerRegistry) -> HarnessResult<$out> {
            match build(handle, PrimitiveKind::$kind, registry)? {
                Primitive::$variant(primitive) => Ok(primitive),
                other => Err(HarnessError::Construction(format!(
                    "expected {} but built {}",
                    PrimitiveKind::$kind,
                    other.kind()
                ))),
            }
        }
    };
}

typed_builder!(aead, Aead, Aead, Box<dyn Aead>);
typed_builder!(
    deterministic_aead,
    DeterministicAead,
    DeterministicAead,
    Box<dyn DeterministicAead>
);
typed_builder!(mac, Mac, Mac, Box<dyn Mac>);
typed_builder!(signer, Signer, Signer, Box<dyn Signer>);
typed_builder!(verifier, Verifier, Verifier, Box<dyn Verifier>);
typed_builder!(hybrid_encrypt, HybridEncrypt, HybridEncrypt, Box<dyn HybridEncrypt>);
typed_builder!(hybrid_decrypt, HybridDecrypt, HybridDecrypt, Box<dyn HybridDecrypt>);
typed_builder!(
    /// Every enabled key must be a RAW PRF key.
    prf_set,
    PrfSet,
    PrfSet,
    PrfSet
);
typed_builder!(keyset_deriver, KeysetDeriver, KeysetDeriver, Box<dyn KeysetDeriver>);
