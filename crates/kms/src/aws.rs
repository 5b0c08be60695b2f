//! AWS KMS client.
//!
//! Key URIs have the form `aws-kms://arn:aws:kms:<region>:<account>:key/<id>`
//! (aliases work as well). Each AEAD talks to the region named by its ARN.
//! A client bound to a key URI claims every URI starting with it; an
//! unbound client claims every `aws-kms://` URI.
//! Associated data is bound through the KMS encryption context as the
//! hex-encoded value of the `associatedData` entry.

use crate::error::{KmsError, KmsResult};
use crate::rt;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_kms::config::{Credentials, Region};
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::Client;
use crosscheck_crypto::{Aead, CryptoError, CryptoResult, KmsClient};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub const AWS_KMS_PREFIX: &str = "aws-kms://";

const ENCRYPTION_CONTEXT_KEY: &str = "associatedData";

pub struct AwsKmsClient {
    key_uri_prefix: String,
    shared: SdkConfig,
    credentials: Option<Credentials>,
    endpoint: Option<String>,
}

impl AwsKmsClient {
    /// Loads the shared AWS configuration and, when given, static
    /// credentials from `credentials_path`.
    pub async fn new(
        key_uri: Option<&str>,
        credentials_path: Option<&Path>,
        endpoint: Option<&str>,
    ) -> KmsResult<Self> {
        let credentials = match credentials_path {
            Some(path) => Some(load_credentials(path)?),
            None => None,
        };
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let client = Self::with_sdk_config(shared, key_uri, credentials, endpoint)?;
        info!(
            prefix = %client.key_uri_prefix,
            static_credentials = client.credentials.is_some(),
            "AWS KMS client ready"
        );
        Ok(client)
    }

    pub fn with_sdk_config(
        shared: SdkConfig,
        key_uri: Option<&str>,
        credentials: Option<Credentials>,
        endpoint: Option<&str>,
    ) -> KmsResult<Self> {
        let key_uri_prefix = match key_uri {
            None => AWS_KMS_PREFIX.to_string(),
            Some(uri) if uri.to_ascii_lowercase().starts_with(AWS_KMS_PREFIX) => uri.to_string(),
            Some(uri) => {
                return Err(KmsError::InvalidKeyUri {
                    uri: uri.to_string(),
                    reason: format!("must start with {}", AWS_KMS_PREFIX),
                })
            }
        };
        Ok(Self {
            key_uri_prefix,
            shared,
            credentials,
            endpoint: endpoint.map(str::to_string),
        })
    }

    fn client_for(&self, region: &str) -> Client {
        let mut builder =
            aws_sdk_kms::config::Builder::from(&self.shared).region(Region::new(region.to_string()));
        if let Some(credentials) = &self.credentials {
            builder = builder.credentials_provider(credentials.clone());
        }
        if let Some(endpoint) = self.endpoint.as_deref() {
            builder = builder.endpoint_url(endpoint);
        }
        Client::from_conf(builder.build())
    }
}

impl KmsClient for AwsKmsClient {
    fn name(&self) -> &str {
        "aws-kms"
    }

    fn supports(&self, key_uri: &str) -> bool {
        key_uri.starts_with(&self.key_uri_prefix)
    }

    fn get_aead(&self, key_uri: &str) -> CryptoResult<Box<dyn Aead>> {
        if !self.supports(key_uri) {
            return Err(KmsError::UnsupportedKeyUri {
                uri: key_uri.to_string(),
            }
            .into());
        }
        let arn = key_arn(key_uri)?;
        let region = arn_region(arn).ok_or_else(|| KmsError::InvalidKeyUri {
            uri: key_uri.to_string(),
            reason: "ARN has no region".to_string(),
        })?;
        debug!(region, "building AWS KMS AEAD");
        Ok(Box::new(AwsKmsAead {
            client: self.client_for(region),
            key_arn: arn.to_string(),
        }))
    }
}

/// Remote AEAD backed by one AWS KMS key.
struct AwsKmsAead {
    client: Client,
    key_arn: String,
}

fn encryption_context(associated_data: &[u8]) -> Option<HashMap<String, String>> {
    if associated_data.is_empty() {
        return None;
    }
    Some(HashMap::from([(
        ENCRYPTION_CONTEXT_KEY.to_string(),
        hex::encode(associated_data),
    )]))
}

impl Aead for AwsKmsAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let client = self.client.clone();
        let key_id = self.key_arn.clone();
        let plaintext = plaintext.to_vec();
        let context = encryption_context(associated_data);
        let output = rt::block_on(async move {
            client
                .encrypt()
                .key_id(key_id)
                .plaintext(Blob::new(plaintext))
                .set_encryption_context(context)
                .send()
                .await
        })
        .map_err(|err| KmsError::Request {
            backend: "aws-kms",
            message: format!("encrypt: {err}"),
        })?;
        let ciphertext = output.ciphertext_blob().ok_or(KmsError::MalformedResponse {
            backend: "aws-kms",
            field: "ciphertext",
        })?;
        Ok(ciphertext.as_ref().to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let client = self.client.clone();
        let key_id = self.key_arn.clone();
        let ciphertext = ciphertext.to_vec();
        let context = encryption_context(associated_data);
        let output = rt::block_on(async move {
            client
                .decrypt()
                .key_id(key_id)
                .ciphertext_blob(Blob::new(ciphertext))
                .set_encryption_context(context)
                .send()
                .await
        })
        .map_err(|err| CryptoError::Decryption(format!("aws-kms decrypt: {err}")))?;

        // Alias ARNs resolve to the key ARN in the response.
        let is_key_arn = self.key_arn.contains(":key/");
        if is_key_arn && output.key_id() != Some(self.key_arn.as_str()) {
            return Err(CryptoError::Decryption(
                "ciphertext was produced by a different AWS KMS key".to_string(),
            ));
        }
        let plaintext = output.plaintext().ok_or(KmsError::MalformedResponse {
            backend: "aws-kms",
            field: "plaintext",
        })?;
        Ok(plaintext.as_ref().to_vec())
    }
}

fn key_arn(key_uri: &str) -> KmsResult<&str> {
    key_uri
        .strip_prefix(AWS_KMS_PREFIX)
        .filter(|arn| arn.starts_with("arn:"))
        .ok_or_else(|| KmsError::InvalidKeyUri {
            uri: key_uri.to_string(),
            reason: format!("expected {}arn:...", AWS_KMS_PREFIX),
        })
}

/// `arn:<partition>:kms:<region>:<account>:<resource>`
fn arn_region(arn: &str) -> Option<&str> {
    let mut parts = arn.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("arn"), Some(_), Some("kms"), Some(region)) if !region.is_empty() => Some(region),
        _ => None,
    }
}

/// Reads static credentials from either an AWS shared-credentials style
/// INI file (`aws_access_key_id` / `aws_secret_access_key`, first profile
/// wins) or a properties file (`accessKey` / `secretKey`).
pub fn load_credentials(path: &Path) -> KmsResult<Credentials> {
    let content = std::fs::read_to_string(path)?;
    parse_credentials(&content)
}

fn parse_credentials(content: &str) -> KmsResult<Credentials> {
    let mut access_key = None;
    let mut secret_key = None;
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            if access_key.is_some() && secret_key.is_some() {
                break;
            }
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "aws_access_key_id" | "accessKey" => access_key = Some(value),
            "aws_secret_access_key" | "secretKey" => secret_key = Some(value),
            _ => {}
        }
    }
    match (access_key, secret_key) {
        (Some(access), Some(secret)) if !access.is_empty() && !secret.is_empty() => Ok(
            Credentials::new(access, secret, None, None, "crosscheck-credentials-file"),
        ),
        _ => Err(KmsError::Credentials(
            "credentials file needs an access key id and a secret access key".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY_URI: &str =
        "aws-kms://arn:aws:kms:us-east-2:235739564943:key/3ee50705-5a82-4f5b-9753-05c4f473922f";

    fn client(key_uri: Option<&str>) -> AwsKmsClient {
        let shared = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .build();
        AwsKmsClient::with_sdk_config(shared, key_uri, None, None).unwrap()
    }

    #[test]
    fn test_arn_region() {
        assert_eq!(
            arn_region("arn:aws:kms:us-east-2:235739564943:key/abc"),
            Some("us-east-2")
        );
        assert_eq!(
            arn_region("arn:aws-cn:kms:cn-north-1:1:alias/test"),
            Some("cn-north-1")
        );
        assert_eq!(arn_region("arn:aws:s3:::bucket"), None);
        assert_eq!(arn_region("not-an-arn"), None);
    }

    #[test]
    fn test_key_arn_requires_prefix() {
        assert!(key_arn(KEY_URI).is_ok());
        assert!(key_arn("gcp-kms://projects/p").is_err());
        assert!(key_arn("aws-kms://key/abc").is_err());
    }

    #[test]
    fn test_unbound_client_supports_every_aws_uri() {
        let client = client(None);
        assert!(client.supports(KEY_URI));
        assert!(client.supports("aws-kms://arn:aws:kms:eu-west-1:1:key/other"));
        assert!(!client.supports("fake-kms://CM2b"));
    }

    #[test]
    fn test_bound_client_supports_only_its_key() {
        let client = client(Some(KEY_URI));
        assert!(client.supports(KEY_URI));
        assert!(!client.supports("aws-kms://arn:aws:kms:eu-west-1:1:key/other"));
        assert!(client
            .get_aead("aws-kms://arn:aws:kms:eu-west-1:1:key/other")
            .is_err());
    }

    #[test]
    fn test_bound_uri_acts_as_prefix() {
        let client = client(Some("aws-kms://arn:aws:kms:us-east-2:235739564943:"));
        assert!(client.supports(KEY_URI));
        assert!(client.supports("aws-kms://arn:aws:kms:us-east-2:235739564943:alias/test"));
        assert!(!client.supports("aws-kms://arn:aws:kms:eu-west-1:235739564943:key/abc"));
        assert!(client.get_aead(KEY_URI).is_ok());
    }

    #[test]
    fn test_claimed_but_malformed_uri_has_no_aead() {
        let client = client(None);
        assert!(client.supports("aws-kms://nope"));
        assert!(client.get_aead("aws-kms://nope").is_err());
    }

    #[test]
    fn test_bound_client_rejects_foreign_scheme() {
        let shared = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .build();
        assert!(AwsKmsClient::with_sdk_config(
            shared,
            Some("gcp-kms://projects/p"),
            None,
            None
        )
        .is_err());
    }

    #[test]
    fn test_encryption_context_only_with_associated_data() {
        assert!(encryption_context(b"").is_none());
        let context = encryption_context(b"\x01\xff").unwrap();
        assert_eq!(context.get("associatedData").unwrap(), "01ff");
    }

    #[test]
    fn test_parse_ini_credentials() {
        let credentials = parse_credentials(
            "# comment\n[default]\naws_access_key_id = AKIDEXAMPLE\naws_secret_access_key=secret\n\n[other]\naws_access_key_id = OTHER\n",
        )
        .unwrap();
        assert_eq!(credentials.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(credentials.secret_access_key(), "secret");
    }

    #[test]
    fn test_parse_properties_credentials() {
        let credentials = parse_credentials("accessKey=AKID\nsecretKey=s3cr3t\n").unwrap();
        assert_eq!(credentials.access_key_id(), "AKID");
    }

    #[test]
    fn test_parse_credentials_missing_secret() {
        assert!(parse_credentials("[default]\naws_access_key_id = AKID\n").is_err());
    }

    #[test]
    fn test_load_credentials_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[default]").unwrap();
        writeln!(file, "aws_access_key_id = AKID").unwrap();
        writeln!(file, "aws_secret_access_key = SECRET").unwrap();
        let credentials = load_credentials(file.path()).unwrap();
        assert_eq!(credentials.secret_access_key(), "SECRET");
        assert!(load_credentials(Path::new("/nonexistent/credentials")).is_err());
    }
}
