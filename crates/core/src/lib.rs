//! Core functionality shared by the crosscheck conformance servers.
//!
//! This crate provides configuration loading, the shared error type and
//! logging initialization used by every binary in the workspace.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    AwsKmsConfig, Config, GcpKmsConfig, HcVaultConfig, KmsConfig, LogFormat, ServerConfig,
};
pub use error::{CoreError, Result};
