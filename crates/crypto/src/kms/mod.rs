//! KMS client abstraction and the ordered client registry.
//!
//! A client claims key URIs (usually by prefix) and turns a claimed URI into
//! a remote [`Aead`]. Lookup walks clients in registration order and returns
//! the first one that claims the URI.

mod fake;

pub use self::fake::{FakeKmsClient, FAKE_KMS_PREFIX};

use crate::error::{CryptoError, CryptoResult};
use crate::primitive::Aead;
use std::sync::Arc;

pub trait KmsClient: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn supports(&self, key_uri: &str) -> bool;

    fn get_aead(&self, key_uri: &str) -> CryptoResult<Box<dyn Aead>>;
}

#[derive(Default)]
pub struct KmsClientRegistry {
    clients: Vec<Arc<dyn KmsClient>>,
}

impl KmsClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: KmsClient + 'static>(&mut self, client: C) {
        tracing::debug!(client = client.name(), "registered KMS client");
        self.clients.push(Arc::new(client));
    }

    /// First registered client that claims `key_uri`.
    pub fn find_for(&self, key_uri: &str) -> CryptoResult<Arc<dyn KmsClient>> {
        self.clients
            .iter()
            .find(|client| client.supports(key_uri))
            .cloned()
            .ok_or_else(|| CryptoError::KmsClientNotFound {
                key_uri: key_uri.to_string(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
