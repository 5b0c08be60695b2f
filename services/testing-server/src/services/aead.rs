//! AEAD service. Encrypt and Decrypt report keyset problems as a gRPC
//! status; only failures of the AEAD call itself go into `err`.

use super::{create, run_blocking};
use crate::context::HarnessContext;
use crate::error::HarnessResult;
use crate::factory;
use crate::proto::aead_server::Aead as AeadApi;
use crate::proto::{
    aead_decrypt_response, aead_encrypt_response, AeadDecryptRequest, AeadDecryptResponse,
    AeadEncryptRequest, AeadEncryptResponse, CreationRequest, CreationResponse,
};
use crate::resolver::resolve;
use crosscheck_crypto::{CryptoResult, PrimitiveKind};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

pub struct AeadService {
    context: Arc<HarnessContext>,
}

impl AeadService {
    pub fn new(context: Arc<HarnessContext>) -> Self {
        Self { context }
    }
}

#[tonic::async_trait]
impl AeadApi for AeadService {
    async fn create(
        &self,
        request: Request<CreationRequest>,
    ) -> Result<Response<CreationResponse>, Status> {
        create(&self.context, request.into_inner(), PrimitiveKind::Aead).await
    }

    async fn encrypt(
        &self,
        request: Request<AeadEncryptRequest>,
    ) -> Result<Response<AeadEncryptResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<CryptoResult<Vec<u8>>> {
            let registry = context.key_managers();
            let handle = resolve(req.annotated_keyset.as_ref(), registry)?;
            let aead = factory::aead(&handle, registry)?;
            Ok(aead.encrypt(&req.plaintext, &req.associated_data))
        })
        .await??;

        let result = match outcome {
            Ok(ciphertext) => aead_encrypt_response::Result::Ciphertext(ciphertext),
            Err(e) => {
                debug!(error = %e, "AEAD encrypt failed");
                aead_encrypt_response::Result::Err(e.to_string())
            }
        };
        Ok(Response::new(AeadEncryptResponse {
            result: Some(result),
        }))
    }

    async fn decrypt(
        &self,
        request: Request<AeadDecryptRequest>,
    ) -> Result<Response<AeadDecryptResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<CryptoResult<Vec<u8>>> {
            let registry = context.key_managers();
            let handle = resolve(req.annotated_keyset.as_ref(), registry)?;
            let aead = factory::aead(&handle, registry)?;
            Ok(aead.decrypt(&req.ciphertext, &req.associated_data))
        })
        .await??;

        let result = match outcome {
            Ok(plaintext) => aead_decrypt_response::Result::Plaintext(plaintext),
            Err(e) => {
                debug!(error = %e, "AEAD decrypt failed");
                aead_decrypt_response::Result::Err(e.to_string())
            }
        };
        Ok(Response::new(AeadDecryptResponse {
            result: Some(result),
        }))
    }
}
