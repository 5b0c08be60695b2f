//! Per-keyset collection of single-key primitives, indexed by output prefix.

use crate::error::{CryptoError, CryptoResult};
use crate::keyset::KeysetHandle;
use crate::primitive::{KeyPrimitive, PrimitiveKind};
use crate::proto::{KeyStatusType, OutputPrefixType};
use crate::registry::KeyManagerRegistry;

/// Length of the TINK, LEGACY and CRUNCHY output prefixes.
pub const NON_RAW_PREFIX_SIZE: usize = 5;
pub const TINK_START_BYTE: u8 = 0x01;
pub const LEGACY_START_BYTE: u8 = 0x00;

/// Bytes prepended to every output of a key with the given prefix type.
pub fn output_prefix(key_id: u32, prefix_type: OutputPrefixType) -> CryptoResult<Vec<u8>> {
    let start = match prefix_type {
        OutputPrefixType::Tink => TINK_START_BYTE,
        OutputPrefixType::Legacy | OutputPrefixType::Crunchy => LEGACY_START_BYTE,
        OutputPrefixType::Raw => return Ok(Vec::new()),
        OutputPrefixType::UnknownPrefix => {
            return Err(CryptoError::InvalidKeyset(format!(
                "key {} has unknown output prefix type",
                key_id
            )))
        }
    };
    let mut prefix = Vec::with_capacity(NON_RAW_PREFIX_SIZE);
    prefix.push(start);
    prefix.extend_from_slice(&key_id.to_be_bytes());
    Ok(prefix)
}

pub struct Entry<P> {
    pub key_id: u32,
    pub status: KeyStatusType,
    pub output_prefix_type: OutputPrefixType,
    pub prefix: Vec<u8>,
    pub type_url: String,
    pub primitive: P,
}

pub struct PrimitiveSet<P> {
    entries: Vec<Entry<P>>,
    primary: usize,
}

impl<P> PrimitiveSet<P> {
    /// Builds one primitive per enabled key of `handle`, in keyset order.
    ///
    /// Fails when any enabled key belongs to another family or cannot be
    /// turned into a primitive.
    pub(crate) fn build(
        handle: &KeysetHandle,
        kind: PrimitiveKind,
        registry: &KeyManagerRegistry,
        extract: impl Fn(KeyPrimitive) -> Option<P>,
    ) -> CryptoResult<Self> {
        let primary_id = handle.primary_key_id();
        let mut entries = Vec::new();
        let mut primary = None;

        for key in handle.keys() {
            if key.status() != KeyStatusType::Enabled {
                continue;
            }
            let key_data = key.key_data.as_ref().ok_or_else(|| {
                CryptoError::InvalidKeyset(format!("key {} has no key data", key.key_id))
            })?;
            let primitive = extract(registry.primitive(key_data, kind)?).ok_or_else(|| {
                CryptoError::PrimitiveMismatch {
                    type_url: key_data.type_url.clone(),
                    primitive: kind.to_string(),
                }
            })?;

            if key.key_id == primary_id {
                primary = Some(entries.len());
            }
            entries.push(Entry {
                key_id: key.key_id,
                status: key.status(),
                output_prefix_type: key.output_prefix_type(),
                prefix: output_prefix(key.key_id, key.output_prefix_type())?,
                type_url: key_data.type_url.clone(),
                primitive,
            });
        }

        let primary = primary.ok_or_else(|| {
            CryptoError::InvalidKeyset("primary key is not among the enabled keys".to_string())
        })?;
        Ok(Self { entries, primary })
    }

    pub fn primary(&self) -> &Entry<P> {
        &self.entries[self.primary]
    }

    pub fn entries(&self) -> &[Entry<P>] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry<P>> {
        self.entries
    }

    /// Non-raw entries whose prefix equals `prefix`.
    pub fn entries_with_prefix<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = &'a Entry<P>> {
        self.entries
            .iter()
            .filter(move |entry| !entry.prefix.is_empty() && entry.prefix == prefix)
    }

    pub fn raw_entries(&self) -> impl Iterator<Item = &Entry<P>> {
        self.entries.iter().filter(|entry| entry.prefix.is_empty())
    }
}

/// Candidate entries for an input carrying an output prefix: first those
/// whose prefix matches, then the raw ones applied to the whole input.
pub(crate) fn candidates<'a, P>(
    set: &'a PrimitiveSet<P>,
    input: &'a [u8],
) -> impl Iterator<Item = (&'a Entry<P>, &'a [u8])> {
    let prefixed = (input.len() > NON_RAW_PREFIX_SIZE)
        .then(|| {
            let (prefix, rest) = input.split_at(NON_RAW_PREFIX_SIZE);
            set.entries_with_prefix(prefix).map(move |entry| (entry, rest))
        })
        .into_iter()
        .flatten();
    prefixed.chain(set.raw_entries().map(move |entry| (entry, input)))
}
