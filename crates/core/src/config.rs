//! Configuration management for crosscheck servers.
//!
//! Configuration is read from an optional TOML file and then overridden by
//! command-line flags. Every section has defaults so an empty file is valid.
//!
//! ```toml
//! [server]
//! port = 23456
//!
//! [logging]
//! format = "json"
//!
//! [kms.gcp]
//! key_uri = "gcp-kms://projects/tink-test/locations/global/keyRings/unit-test/cryptoKeys/aead-key"
//! credentials_path = "/etc/crosscheck/gcp_credentials.json"
//!
//! [kms.aws]
//! key_uri = "aws-kms://arn:aws:kms:us-east-2:000000000000:key/abc"
//! credentials_path = "/etc/crosscheck/aws_credentials.ini"
//!
//! [kms.hcvault]
//! key_uri_prefix = "hcvault://vault.internal:8200/"
//! token = "s.xxxxx"
//! tls_skip_verify = true
//! ```

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Port the testing servers listen on unless told otherwise.
pub const DEFAULT_PORT: u16 = 23456;

/// URI prefix of Google Cloud KMS key URIs.
pub const GCP_KMS_URI_PREFIX: &str = "gcp-kms://";

/// URI prefix of AWS KMS key URIs.
pub const AWS_KMS_URI_PREFIX: &str = "aws-kms://";

/// URI prefix of HashiCorp Vault transit key URIs.
pub const HCVAULT_URI_PREFIX: &str = "hcvault://";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub kms: KmsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "[::]".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(CoreError::InvalidConfig {
                field: "logging.format",
                reason: format!("unknown log format '{}'", other),
            }),
        }
    }
}

/// Remote KMS backends. A missing section means the backend is not registered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KmsConfig {
    pub gcp: Option<GcpKmsConfig>,
    pub aws: Option<AwsKmsConfig>,
    pub hcvault: Option<HcVaultConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpKmsConfig {
    /// Restricts the client to URIs starting with this one. When unset the
    /// client accepts every `gcp-kms://` URI.
    pub key_uri: Option<String>,
    /// Service account JSON file. When unset the application default
    /// credentials are used.
    pub credentials_path: Option<PathBuf>,
    /// Endpoint override, mostly for local KMS emulators.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsKmsConfig {
    /// Restricts the client to URIs starting with this one. When unset the
    /// client accepts every `aws-kms://` URI.
    pub key_uri: Option<String>,
    /// Credentials file with `aws_access_key_id` / `aws_secret_access_key`.
    /// When unset the default AWS provider chain is used.
    pub credentials_path: Option<PathBuf>,
    /// Endpoint override, mostly for local KMS emulators.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HcVaultConfig {
    pub key_uri_prefix: String,
    pub token: String,
    pub tls_skip_verify: bool,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self::default()
    }

    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind_address.trim().is_empty() {
            return Err(CoreError::InvalidConfig {
                field: "server.bind_address",
                reason: "must not be empty".to_string(),
            });
        }

        if let Some(gcp) = &self.kms.gcp {
            if let Some(uri) = &gcp.key_uri {
                if !uri.to_ascii_lowercase().starts_with(GCP_KMS_URI_PREFIX) {
                    return Err(CoreError::InvalidConfig {
                        field: "kms.gcp.key_uri",
                        reason: format!("must start with {}", GCP_KMS_URI_PREFIX),
                    });
                }
            }
        }

        if let Some(aws) = &self.kms.aws {
            if let Some(uri) = &aws.key_uri {
                if !uri.to_ascii_lowercase().starts_with(AWS_KMS_URI_PREFIX) {
                    return Err(CoreError::InvalidConfig {
                        field: "kms.aws.key_uri",
                        reason: format!("must start with {}", AWS_KMS_URI_PREFIX),
                    });
                }
            }
        }

        if let Some(vault) = &self.kms.hcvault {
            if !vault
                .key_uri_prefix
                .to_ascii_lowercase()
                .starts_with(HCVAULT_URI_PREFIX)
            {
                return Err(CoreError::InvalidConfig {
                    field: "kms.hcvault.key_uri_prefix",
                    reason: format!("must start with {}", HCVAULT_URI_PREFIX),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.kms.gcp.is_none());
        assert!(config.kms.aws.is_none());
        assert!(config.kms.hcvault.is_none());
    }

    #[test]
    fn test_full_config_parses() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 9000

            [logging]
            format = "json"

            [kms.gcp]
            credentials_path = "/etc/gcp.json"

            [kms.aws]
            key_uri = "aws-kms://arn:aws:kms:us-east-2:000000000000:key/abc"

            [kms.hcvault]
            key_uri_prefix = "hcvault://localhost:8200/"
            token = "root"
            tls_skip_verify = true
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.format, LogFormat::Json);
        let gcp = config.kms.gcp.unwrap();
        assert!(gcp.key_uri.is_none());
        assert_eq!(gcp.credentials_path.unwrap(), PathBuf::from("/etc/gcp.json"));
        let aws = config.kms.aws.unwrap();
        assert!(aws.credentials_path.is_none());
        assert!(config.kms.hcvault.unwrap().tls_skip_verify);
    }

    #[test]
    fn test_rejects_foreign_gcp_uri() {
        let err = Config::from_toml_str(
            r#"
            [kms.gcp]
            key_uri = "aws-kms://arn:aws:kms:us-east-2:000000000000:key/abc"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("kms.gcp.key_uri"));
    }

    #[test]
    fn test_rejects_foreign_aws_uri() {
        let err = Config::from_toml_str(
            r#"
            [kms.aws]
            key_uri = "gcp-kms://projects/p/locations/l/keyRings/r/cryptoKeys/k"
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidConfig {
                field: "kms.aws.key_uri",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_vault_prefix() {
        let err = Config::from_toml_str(
            r#"
            [kms.hcvault]
            key_uri_prefix = "https://vault:8200/"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("kms.hcvault.key_uri_prefix"));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4000").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_file("/nonexistent/crosscheck.toml").unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
