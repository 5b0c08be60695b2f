//! HashiCorp Vault transit client.
//!
//! Key URIs look like `hcvault://vault.example.com:8200/transit/keys/my-key`.
//! The path before `/keys/` is the transit mount, so
//! `.../transit/keys/my-key` encrypts with `POST /v1/transit/encrypt/my-key`.
//! Associated data is sent as the base64 `context` of the request.

use crate::error::{KmsError, KmsResult};
use crate::rt;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use crosscheck_crypto::{Aead, CryptoError, CryptoResult, KmsClient};
use serde_json::{json, Value};
use tracing::{debug, info};

pub const HCVAULT_PREFIX: &str = "hcvault://";

pub struct HcVaultClient {
    key_uri_prefix: String,
    token: String,
    http: reqwest::Client,
}

impl HcVaultClient {
    /// Client for every URI under `key_uri_prefix`.
    pub fn new(key_uri_prefix: &str, token: &str, tls_skip_verify: bool) -> KmsResult<Self> {
        if !key_uri_prefix.starts_with(HCVAULT_PREFIX) {
            return Err(KmsError::InvalidKeyUri {
                uri: key_uri_prefix.to_string(),
                reason: format!("prefix must start with {}", HCVAULT_PREFIX),
            });
        }
        if token.is_empty() {
            return Err(KmsError::Credentials("Vault token is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(tls_skip_verify)
            .build()
            .map_err(|err| KmsError::Setup(format!("Vault HTTP client: {err}")))?;
        info!(prefix = key_uri_prefix, tls_skip_verify, "Vault transit client ready");
        Ok(Self {
            key_uri_prefix: key_uri_prefix.to_string(),
            token: token.to_string(),
            http,
        })
    }
}

impl KmsClient for HcVaultClient {
    fn name(&self) -> &str {
        "hcvault"
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
        let endpoint = TransitEndpoint::parse(key_uri)?;
        debug!(base = %endpoint.base_url, "building Vault transit AEAD");
        Ok(Box::new(HcVaultAead {
            http: self.http.clone(),
            token: self.token.clone(),
            endpoint,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TransitEndpoint {
    base_url: String,
    encrypt_path: String,
    decrypt_path: String,
}

impl TransitEndpoint {
    fn parse(key_uri: &str) -> KmsResult<Self> {
        let invalid = |reason: &str| KmsError::InvalidKeyUri {
            uri: key_uri.to_string(),
            reason: reason.to_string(),
        };
        let rest = key_uri
            .strip_prefix(HCVAULT_PREFIX)
            .ok_or_else(|| invalid("missing hcvault:// scheme"))?;
        let (authority, path) = rest
            .split_once('/')
            .ok_or_else(|| invalid("missing key path"))?;
        if authority.is_empty() {
            return Err(invalid("missing Vault host"));
        }

        let segments: Vec<&str> = path.split('/').collect();
        let n = segments.len();
        if n < 3 || segments[n - 2] != "keys" || segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("path must be <mount>/keys/<key-name>"));
        }
        let mount = segments[..n - 2].join("/");
        let key_name = segments[n - 1];
        Ok(Self {
            base_url: format!("https://{}", authority),
            encrypt_path: format!("v1/{}/encrypt/{}", mount, key_name),
            decrypt_path: format!("v1/{}/decrypt/{}", mount, key_name),
        })
    }
}

/// Remote AEAD backed by one Vault transit key.
struct HcVaultAead {
    http: reqwest::Client,
    token: String,
    endpoint: TransitEndpoint,
}

impl HcVaultAead {
    fn call(&self, path: &str, body: Value, field: &'static str) -> KmsResult<String> {
        let request = self
            .http
            .post(format!("{}/{}", self.endpoint.base_url, path))
            .header("X-Vault-Token", &self.token)
            .json(&body);
        let response: Value = rt::block_on(async move {
            let response = request.send().await?.error_for_status()?;
            response.json::<Value>().await
        })
        .map_err(|err| KmsError::Request {
            backend: "hcvault",
            message: err.to_string(),
        })?;
        response
            .get("data")
            .and_then(|data| data.get(field))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(KmsError::MalformedResponse {
                backend: "hcvault",
                field,
            })
    }
}

impl Aead for HcVaultAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let body = json!({
            "plaintext": STANDARD.encode(plaintext),
            "context": STANDARD.encode(associated_data),
        });
        let ciphertext = self.call(&self.endpoint.encrypt_path, body, "ciphertext")?;
        Ok(ciphertext.into_bytes())
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let ciphertext = std::str::from_utf8(ciphertext)
            .map_err(|_| CryptoError::Decryption("Vault ciphertext is not UTF-8".to_string()))?;
        let body = json!({
            "ciphertext": ciphertext,
            "context": STANDARD.encode(associated_data),
        });
        let plaintext = self
            .call(&self.endpoint.decrypt_path, body, "plaintext")
            .map_err(|err| CryptoError::Decryption(err.to_string()))?;
        STANDARD
            .decode(plaintext)
            .map_err(|err| CryptoError::Decryption(format!("Vault plaintext: {err}")))
    }
}
