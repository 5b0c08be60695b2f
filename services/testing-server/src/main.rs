//! crosscheck testing server binary.

use anyhow::{Context, Result};
use clap::Parser;
use crosscheck_core::config::{AwsKmsConfig, Config, GcpKmsConfig, HcVaultConfig};
use crosscheck_core::{logging, LogFormat};
use crosscheck_testing_server::context::build_kms_registry;
use crosscheck_testing_server::{build_router, HarnessContext};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "crosscheck-testing-server", version, about = "Cross-language conformance testing server")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "CROSSCHECK_PORT")]
    port: Option<u16>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log format (text or json).
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// GCP service account file. Enables the GCP KMS client.
    #[arg(long)]
    gcp_credentials_path: Option<PathBuf>,

    /// Restrict the GCP KMS client to URIs with this prefix. Enables the GCP
    /// KMS client.
    #[arg(long)]
    gcp_key_uri: Option<String>,

    /// AWS credentials file. Enables the AWS KMS client.
    #[arg(long)]
    aws_credentials_path: Option<PathBuf>,

    /// Restrict the AWS KMS client to URIs with this prefix. Enables the AWS
    /// KMS client.
    #[arg(long)]
    aws_key_uri: Option<String>,

    /// Vault key URI prefix, e.g. `hcvault://vault:8200/`.
    #[arg(long, requires = "hcvault_token")]
    hcvault_key_uri_prefix: Option<String>,

    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    hcvault_token: Option<String>,

    #[arg(long)]
    hcvault_tls_skip_verify: bool,
}

impl Args {
    /// File configuration with command-line overrides applied.
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Config::default_config(),
        };

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if self.gcp_credentials_path.is_some() || self.gcp_key_uri.is_some() {
            let gcp = config.kms.gcp.get_or_insert_with(GcpKmsConfig::default);
            if let Some(path) = &self.gcp_credentials_path {
                gcp.credentials_path = Some(path.clone());
            }
            if let Some(uri) = &self.gcp_key_uri {
                gcp.key_uri = Some(uri.clone());
            }
        }
        if self.aws_credentials_path.is_some() || self.aws_key_uri.is_some() {
            let aws = config.kms.aws.get_or_insert_with(AwsKmsConfig::default);
            if let Some(path) = &self.aws_credentials_path {
                aws.credentials_path = Some(path.clone());
            }
            if let Some(uri) = &self.aws_key_uri {
                aws.key_uri = Some(uri.clone());
            }
        }
        if let Some(prefix) = &self.hcvault_key_uri_prefix {
            config.kms.hcvault = Some(HcVaultConfig {
                key_uri_prefix: prefix.clone(),
                token: self.hcvault_token.clone().unwrap_or_default(),
                tls_skip_verify: self.hcvault_tls_skip_verify,
            });
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.resolve_config()?;
    logging::init_with_format(config.logging.format);

    let kms = build_kms_registry(&config.kms)
        .await
        .context("failed to initialise KMS clients")?;
    let context = Arc::new(HarnessContext::new(kms));

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.bind_address, config.server.port
            )
        })?;
    info!(%addr, version = env!("CARGO_PKG_VERSION"), "testing server listening");

    build_router(context)
        .serve(addr)
        .await
        .context("gRPC server failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["crosscheck-testing-server"]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.server.port, crosscheck_core::config::DEFAULT_PORT);
        assert!(config.kms.gcp.is_none());
        assert!(config.kms.aws.is_none());
        assert!(config.kms.hcvault.is_none());
    }

    #[test]
    fn test_gcp_flags() {
        let args = Args::parse_from([
            "crosscheck-testing-server",
            "--gcp-credentials-path",
            "/etc/gcp.json",
            "--gcp-key-uri",
            "gcp-kms://projects/tink-test/locations/global/keyRings/unit-test/cryptoKeys/aead-key",
        ]);
        let gcp = args.resolve_config().unwrap().kms.gcp.unwrap();
        assert_eq!(gcp.credentials_path.unwrap(), PathBuf::from("/etc/gcp.json"));
        assert!(gcp.key_uri.unwrap().starts_with("gcp-kms://projects/tink-test/"));
    }

    #[test]
    fn test_gcp_key_uri_with_wrong_scheme_is_rejected() {
        let args = Args::parse_from([
            "crosscheck-testing-server",
            "--gcp-key-uri",
            "aws-kms://arn:aws:kms:us-east-1:1:key/k",
        ]);
        assert!(args.resolve_config().is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 1000\n\n[logging]\nformat = \"json\"").unwrap();
        let args = Args::parse_from([
            "crosscheck-testing-server",
            "--config",
            file.path().to_str().unwrap(),
            "--port",
            "2000",
            "--aws-key-uri",
            "aws-kms://arn:aws:kms:us-east-1:1:key/k",
        ]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.server.port, 2000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.kms.aws.unwrap().key_uri.as_deref(),
            Some("aws-kms://arn:aws:kms:us-east-1:1:key/k")
        );
    }

    #[test]
    fn test_vault_flags() {
        let args = Args::parse_from([
            "crosscheck-testing-server",
            "--hcvault-key-uri-prefix",
            "hcvault://vault:8200/",
            "--hcvault-token",
            "s.token",
            "--hcvault-tls-skip-verify",
        ]);
        let vault = args.resolve_config().unwrap().kms.hcvault.unwrap();
        assert_eq!(vault.key_uri_prefix, "hcvault://vault:8200/");
        assert!(vault.tls_skip_verify);
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        assert!(Args::try_parse_from(["crosscheck-testing-server", "--log-format", "xml"]).is_err());
    }
}
