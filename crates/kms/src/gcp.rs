//! Google Cloud KMS client.
//!
//! Key URIs have the form
//! `gcp-kms://projects/<p>/locations/<l>/keyRings/<r>/cryptoKeys/<k>`.
//! Calls go to the Cloud KMS v1 REST API (`<name>:encrypt`, `<name>:decrypt`)
//! with an OAuth token from `gcp_auth`. Associated data is sent as
//! `additionalAuthenticatedData`.

use crate::error::{KmsError, KmsResult};
use crate::rt;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use crosscheck_crypto::{Aead, CryptoError, CryptoResult, KmsClient};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub const GCP_KMS_PREFIX: &str = "gcp-kms://";

pub const DEFAULT_ENDPOINT: &str = "https://cloudkms.googleapis.com";

const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloudkms"];

pub struct GcpKmsClient {
    key_uri_prefix: String,
    tokens: Arc<dyn TokenProvider>,
    http: reqwest::Client,
    endpoint: String,
}

impl GcpKmsClient {
    /// Uses the service account in `credentials_path`, or the default
    /// application credentials when it is unset. `key_uri` restricts the
    /// client to URIs starting with it.
    pub async fn new(
        key_uri: Option<&str>,
        credentials_path: Option<&Path>,
        endpoint: Option<&str>,
    ) -> KmsResult<Self> {
        let tokens: Arc<dyn TokenProvider> = match credentials_path {
            Some(path) => {
                let account = CustomServiceAccount::from_file(path)
                    .map_err(|err| KmsError::Credentials(format!("GCP service account: {err}")))?;
                Arc::new(account) as Arc<dyn TokenProvider>
            }
            None => gcp_auth::provider()
                .await
                .map_err(|err| KmsError::Credentials(format!("GCP default credentials: {err}")))?,
        };
        let client = Self::with_token_provider(key_uri, tokens, endpoint)?;
        info!(
            prefix = %client.key_uri_prefix,
            service_account = credentials_path.is_some(),
            "GCP KMS client ready"
        );
        Ok(client)
    }

    pub fn with_token_provider(
        key_uri: Option<&str>,
        tokens: Arc<dyn TokenProvider>,
        endpoint: Option<&str>,
    ) -> KmsResult<Self> {
        let key_uri_prefix = key_uri_prefix(key_uri)?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| KmsError::Setup(format!("GCP KMS HTTP client: {err}")))?;
        Ok(Self {
            key_uri_prefix,
            tokens,
            http,
            endpoint: endpoint
                .unwrap_or(DEFAULT_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

fn key_uri_prefix(key_uri: Option<&str>) -> KmsResult<String> {
    match key_uri {
        None => Ok(GCP_KMS_PREFIX.to_string()),
        Some(uri) if uri.to_ascii_lowercase().starts_with(GCP_KMS_PREFIX) => Ok(uri.to_string()),
        Some(uri) => Err(KmsError::InvalidKeyUri {
            uri: uri.to_string(),
            reason: format!("must start with {}", GCP_KMS_PREFIX),
        }),
    }
}

impl KmsClient for GcpKmsClient {
    fn name(&self) -> &str {
        "gcp-kms"
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
        let name = key_name(key_uri)?;
        debug!(key = name, "building GCP KMS AEAD");
        Ok(Box::new(GcpKmsAead {
            http: self.http.clone(),
            tokens: Arc::clone(&self.tokens),
            url_base: format!("{}/v1/{}", self.endpoint, name),
        }))
    }
}

/// `projects/<p>/locations/<l>/keyRings/<r>/cryptoKeys/<k>`
fn key_name(key_uri: &str) -> KmsResult<&str> {
    let invalid = || KmsError::InvalidKeyUri {
        uri: key_uri.to_string(),
        reason: "expected projects/*/locations/*/keyRings/*/cryptoKeys/*".to_string(),
    };
    let name = key_uri.strip_prefix(GCP_KMS_PREFIX).ok_or_else(invalid)?;
    let segments: Vec<&str> = name.split('/').collect();
    let layout = ["projects", "locations", "keyRings", "cryptoKeys"];
    let well_formed = segments.len() == 8
        && segments
            .chunks(2)
            .zip(layout)
            .all(|(pair, expected)| pair[0] == expected && !pair[1].is_empty());
    if well_formed {
        Ok(name)
    } else {
        Err(invalid())
    }
}

/// Remote AEAD backed by one Cloud KMS crypto key.
struct GcpKmsAead {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    url_base: String,
}

impl GcpKmsAead {
    fn call(&self, method: &str, body: Value) -> KmsResult<Value> {
        let tokens = Arc::clone(&self.tokens);
        let request = self
            .http
            .post(format!("{}:{}", self.url_base, method))
            .json(&body);
        rt::block_on(async move {
            let token = tokens.token(SCOPES).await.map_err(|err| err.to_string())?;
            let response = request
                .bearer_auth(token.as_str())
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|err| err.to_string())?;
            response.json::<Value>().await.map_err(|err| err.to_string())
        })
        .map_err(|message| KmsError::Request {
            backend: "gcp-kms",
            message: format!("{method}: {message}"),
        })
    }
}

fn request_body(field: &str, data: &[u8], associated_data: &[u8]) -> Value {
    json!({
        field: STANDARD.encode(data),
        "additionalAuthenticatedData": STANDARD.encode(associated_data),
    })
}

/// Empty byte fields are omitted from Cloud KMS JSON responses.
fn response_bytes(response: &Value, field: &'static str, required: bool) -> KmsResult<Vec<u8>> {
    match response.get(field).and_then(Value::as_str) {
        Some(encoded) => STANDARD.decode(encoded).map_err(|_| KmsError::MalformedResponse {
            backend: "gcp-kms",
            field,
        }),
        None if !required => Ok(Vec::new()),
        None => Err(KmsError::MalformedResponse {
            backend: "gcp-kms",
            field,
        }),
    }
}

impl Aead for GcpKmsAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let response = self.call("encrypt", request_body("plaintext", plaintext, associated_data))?;
        Ok(response_bytes(&response, "ciphertext", true)?)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> CryptoResult<Vec<u8>> {
        let response = self
            .call("decrypt", request_body("ciphertext", ciphertext, associated_data))
            .map_err(|err| CryptoError::Decryption(err.to_string()))?;
        response_bytes(&response, "plaintext", false)
            .map_err(|err| CryptoError::Decryption(err.to_string()))
    }
}
