//! Remote KMS clients for the crosscheck testing server.
//!
//! Every client implements [`crosscheck_crypto::KmsClient`] and is registered
//! in the server's [`crosscheck_crypto::KmsClientRegistry`] at startup.
//! Each client claims the key URIs starting with its configured prefix.
//!
//! # Backends
//!
//! | Prefix        | Client             | Transport                      |
//! |---------------|--------------------|--------------------------------|
//! | `gcp-kms://`  | [`GcpKmsClient`]   | Cloud KMS REST with `gcp_auth` |
//! | `aws-kms://`  | [`AwsKmsClient`]   | `aws-sdk-kms`                  |
//! | `hcvault://`  | [`HcVaultClient`]  | Vault transit over HTTPS       |
//!
//! The [`crosscheck_crypto::Aead`] trait is synchronous, so remote calls are
//! driven to completion through [`rt::block_on`].

pub mod aws;
pub mod error;
pub mod gcp;
pub mod hcvault;
pub mod rt;

pub use aws::{AwsKmsClient, AWS_KMS_PREFIX};
pub use error::{KmsError, KmsResult};
pub use gcp::{GcpKmsClient, GCP_KMS_PREFIX};
pub use hcvault::{HcVaultClient, HCVAULT_PREFIX};
