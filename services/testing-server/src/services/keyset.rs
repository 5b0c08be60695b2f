//! Keyset management service used by drivers to produce test inputs.
//!
//! Every failure is reported in `err`, except an unknown reader or writer
//! type on the encrypted keyset RPCs, which is `INVALID_ARGUMENT`.

use super::run_blocking;
use crate::context::HarnessContext;
use crate::error::{HarnessError, HarnessResult};
use crate::factory;
use crate::proto::keyset_server::Keyset as KeysetApi;
use crate::proto::{
    keyset_from_json_response, keyset_generate_response, keyset_public_response,
    keyset_read_encrypted_response, keyset_template_response, keyset_to_json_response,
    keyset_write_encrypted_response, KeysetFromJsonRequest, KeysetFromJsonResponse,
    KeysetGenerateRequest, KeysetGenerateResponse, KeysetPublicRequest, KeysetPublicResponse,
    KeysetReadEncryptedRequest, KeysetReadEncryptedResponse, KeysetReaderType,
    KeysetTemplateRequest, KeysetTemplateResponse, KeysetToJsonRequest, KeysetToJsonResponse,
    KeysetWriteEncryptedRequest, KeysetWriteEncryptedResponse, KeysetWriterType,
};
use crate::resolver::resolve_bytes;
use crosscheck_crypto::keyset::templates::named_template;
use crosscheck_crypto::proto::KeyTemplate;
use crosscheck_crypto::{CryptoError, KeysetHandle};
use prost::Message;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

pub struct KeysetService {
    context: Arc<HarnessContext>,
}

impl KeysetService {
    pub fn new(context: Arc<HarnessContext>) -> Self {
        Self { context }
    }
}

fn log_failure<T>(operation: &'static str, outcome: HarnessResult<T>) -> Result<T, String> {
    outcome.map_err(|e| {
        debug!(operation, error = %e, "keyset operation failed");
        e.to_string()
    })
}

#[tonic::async_trait]
impl KeysetApi for KeysetService {
    async fn get_template(
        &self,
        request: Request<KeysetTemplateRequest>,
    ) -> Result<Response<KeysetTemplateResponse>, Status> {
        let name = request.into_inner().template_name;
        let result = match named_template(&name) {
            Some(template) => keyset_template_response::Result::KeyTemplate(template.encode_to_vec()),
            None => keyset_template_response::Result::Err(format!("unknown template name: {}", name)),
        };
        Ok(Response::new(KeysetTemplateResponse {
            result: Some(result),
        }))
    }

    async fn generate(
        &self,
        request: Request<KeysetGenerateRequest>,
    ) -> Result<Response<KeysetGenerateResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<Vec<u8>> {
            let template = KeyTemplate::decode(req.template.as_slice()).map_err(CryptoError::from)?;
            Ok(KeysetHandle::generate(&template, context.key_managers())?.serialize())
        })
        .await?;

        let result = match log_failure("generate", outcome) {
            Ok(keyset) => keyset_generate_response::Result::Keyset(keyset),
            Err(e) => keyset_generate_response::Result::Err(e),
        };
        Ok(Response::new(KeysetGenerateResponse {
            result: Some(result),
        }))
    }

    async fn public(
        &self,
        request: Request<KeysetPublicRequest>,
    ) -> Result<Response<KeysetPublicResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<Vec<u8>> {
            let registry = context.key_managers();
            let private = resolve_bytes(&req.private_keyset, registry)?;
            Ok(private.public_handle(registry)?.serialize())
        })
        .await?;

        let result = match log_failure("public", outcome) {
            Ok(keyset) => keyset_public_response::Result::PublicKeyset(keyset),
            Err(e) => keyset_public_response::Result::Err(e),
        };
        Ok(Response::new(KeysetPublicResponse {
            result: Some(result),
        }))
    }

    async fn to_json(
        &self,
        request: Request<KeysetToJsonRequest>,
    ) -> Result<Response<KeysetToJsonResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<String> {
            Ok(resolve_bytes(&req.keyset, context.key_managers())?.to_json()?)
        })
        .await?;

        let result = match log_failure("to_json", outcome) {
            Ok(json) => keyset_to_json_response::Result::JsonKeyset(json),
            Err(e) => keyset_to_json_response::Result::Err(e),
        };
        Ok(Response::new(KeysetToJsonResponse {
            result: Some(result),
        }))
    }

    async fn from_json(
        &self,
        request: Request<KeysetFromJsonRequest>,
    ) -> Result<Response<KeysetFromJsonResponse>, Status> {
        let req = request.into_inner();
        let outcome = run_blocking(move || -> HarnessResult<Vec<u8>> {
            Ok(KeysetHandle::read_json(&req.json_keyset)?.serialize())
        })
        .await?;

        let result = match log_failure("from_json", outcome) {
            Ok(keyset) => keyset_from_json_response::Result::Keyset(keyset),
            Err(e) => keyset_from_json_response::Result::Err(e),
        };
        Ok(Response::new(KeysetFromJsonResponse {
            result: Some(result),
        }))
    }

    async fn read_encrypted(
        &self,
        request: Request<KeysetReadEncryptedRequest>,
    ) -> Result<Response<KeysetReadEncryptedResponse>, Status> {
        let req = request.into_inner();
        let reader = match KeysetReaderType::try_from(req.keyset_reader_type) {
            Ok(reader @ (KeysetReaderType::Binary | KeysetReaderType::Json)) => reader,
            _ => {
                return Err(Status::invalid_argument(format!(
                    "unknown keyset reader type {}",
                    req.keyset_reader_type
                )))
            }
        };

        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<Vec<u8>> {
            let registry = context.key_managers();
            let master = factory::aead(&resolve_bytes(&req.master_keyset, registry)?, registry)?;
            let associated_data = req.associated_data.as_deref().unwrap_or_default();
            let handle = match reader {
                KeysetReaderType::Json => {
                    let json = std::str::from_utf8(&req.encrypted_keyset).map_err(|_| {
                        HarnessError::from(CryptoError::Json(
                            "encrypted keyset is not UTF-8".to_string(),
                        ))
                    })?;
                    KeysetHandle::read_encrypted_json(json, master.as_ref(), associated_data)?
                }
                _ => KeysetHandle::read_encrypted_binary(
                    &req.encrypted_keyset,
                    master.as_ref(),
                    associated_data,
                )?,
            };
            Ok(handle.serialize())
        })
        .await?;

        let result = match log_failure("read_encrypted", outcome) {
            Ok(keyset) => keyset_read_encrypted_response::Result::Keyset(keyset),
            Err(e) => keyset_read_encrypted_response::Result::Err(e),
        };
        Ok(Response::new(KeysetReadEncryptedResponse {
            result: Some(result),
        }))
    }

    async fn write_encrypted(
        &self,
        request: Request<KeysetWriteEncryptedRequest>,
    ) -> Result<Response<KeysetWriteEncryptedResponse>, Status> {
        let req = request.into_inner();
        let writer = match KeysetWriterType::try_from(req.keyset_writer_type) {
            Ok(writer @ (KeysetWriterType::Binary | KeysetWriterType::Json)) => writer,
            _ => {
                return Err(Status::invalid_argument(format!(
                    "unknown keyset writer type {}",
                    req.keyset_writer_type
                )))
            }
        };

        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<Vec<u8>> {
            let registry = context.key_managers();
            let handle = resolve_bytes(&req.keyset, registry)?;
            let master = factory::aead(&resolve_bytes(&req.master_keyset, registry)?, registry)?;
            let associated_data = req.associated_data.as_deref().unwrap_or_default();
            let encrypted = match writer {
                KeysetWriterType::Json => handle
                    .write_encrypted_json(master.as_ref(), associated_data)?
                    .into_bytes(),
                _ => handle.write_encrypted(master.as_ref(), associated_data)?,
            };
            Ok(encrypted)
        })
        .await?;

        let result = match log_failure("write_encrypted", outcome) {
            Ok(encrypted) => keyset_write_encrypted_response::Result::EncryptedKeyset(encrypted),
            Err(e) => keyset_write_encrypted_response::Result::Err(e),
        };
        Ok(Response::new(KeysetWriteEncryptedResponse {
            result: Some(result),
        }))
    }
}
