//! Shared, read-only state handed to every service.

use crate::error::{HarnessError, HarnessResult};
use crosscheck_core::KmsConfig;
use crosscheck_crypto::{FakeKmsClient, KeyManagerRegistry, KmsClientRegistry};
use crosscheck_kms::{AwsKmsClient, GcpKmsClient, HcVaultClient};
use std::sync::Arc;
use tracing::info;

/// Key managers plus the KMS client registry they consult. Built once at
/// startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct HarnessContext {
    key_managers: KeyManagerRegistry,
}

impl HarnessContext {
    pub fn new(kms: KmsClientRegistry) -> Self {
        Self {
            key_managers: KeyManagerRegistry::new(Arc::new(kms)),
        }
    }

    /// Context with only the fake KMS client registered.
    pub fn with_fake_kms() -> Self {
        let mut kms = KmsClientRegistry::new();
        kms.register(FakeKmsClient::new());
        Self::new(kms)
    }

    pub fn key_managers(&self) -> &KeyManagerRegistry {
        &self.key_managers
    }

    pub fn kms(&self) -> &KmsClientRegistry {
        self.key_managers.kms()
    }
}

/// Registers the fake client, then every remote backend `config` enables.
/// Any backend that fails to initialise aborts startup.
pub async fn build_kms_registry(config: &KmsConfig) -> HarnessResult<KmsClientRegistry> {
    let mut registry = KmsClientRegistry::new();
    registry.register(FakeKmsClient::new());

    if let Some(gcp) = &config.gcp {
        let client = GcpKmsClient::new(
            gcp.key_uri.as_deref(),
            gcp.credentials_path.as_deref(),
            gcp.endpoint.as_deref(),
        )
        .await
        .map_err(|e| HarnessError::Configuration(format!("GCP KMS client: {}", e)))?;
        registry.register(client);
    }

    if let Some(aws) = &config.aws {
        let client = AwsKmsClient::new(
            aws.key_uri.as_deref(),
            aws.credentials_path.as_deref(),
            aws.endpoint.as_deref(),
        )
        .await
        .map_err(|e| HarnessError::Configuration(format!("AWS KMS client: {}", e)))?;
        registry.register(client);
    }

    if let Some(vault) = &config.hcvault {
        let client = HcVaultClient::new(&vault.key_uri_prefix, &vault.token, vault.tls_skip_verify)
            .map_err(|e| HarnessError::Configuration(format!("Vault client: {}", e)))?;
        registry.register(client);
    }

    info!(clients = ?registry.names(), "KMS client registry built");
    Ok(registry)
}
