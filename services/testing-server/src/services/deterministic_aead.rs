//! Deterministic AEAD service. Keyset problems surface as a gRPC status,
//! like the AEAD service.

use super::{create, run_blocking};
use crate::context::HarnessContext;
use crate::error::HarnessResult;
use crate::factory;
use crate::proto::deterministic_aead_server::DeterministicAead as DeterministicAeadApi;
use crate::proto::{
    deterministic_aead_decrypt_response, deterministic_aead_encrypt_response, CreationRequest,
    CreationResponse, DeterministicAeadDecryptRequest, DeterministicAeadDecryptResponse,
    DeterministicAeadEncryptRequest, DeterministicAeadEncryptResponse,
};
use crate::resolver::resolve;
use crosscheck_crypto::{CryptoResult, PrimitiveKind};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

pub struct DeterministicAeadService {
    context: Arc<HarnessContext>,
}

impl DeterministicAeadService {
    pub fn new(context: Arc<HarnessContext>) -> Self {
        Self { context }
    }
}

#[tonic::async_trait]
impl DeterministicAeadApi for DeterministicAeadService {
    async fn create(
        &self,
        request: Request<CreationRequest>,
    ) -> Result<Response<CreationResponse>, Status> {
        create(&self.context, request.into_inner(), PrimitiveKind::DeterministicAead).await
    }

    async fn encrypt_deterministically(
        &self,
        request: Request<DeterministicAeadEncryptRequest>,
    ) -> Result<Response<DeterministicAeadEncryptResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<CryptoResult<Vec<u8>>> {
            let registry = context.key_managers();
            let handle = resolve(req.annotated_keyset.as_ref(), registry)?;
            let daead = factory::deterministic_aead(&handle, registry)?;
            Ok(daead.encrypt_deterministically(&req.plaintext, &req.associated_data))
        })
        .await??;

        let result = match outcome {
            Ok(ciphertext) => deterministic_aead_encrypt_response::Result::Ciphertext(ciphertext),
            Err(e) => {
                debug!(error = %e, "deterministic encrypt failed");
                deterministic_aead_encrypt_response::Result::Err(e.to_string())
            }
        };
        Ok(Response::new(DeterministicAeadEncryptResponse {
            result: Some(result),
        }))
    }

    async fn decrypt_deterministically(
        &self,
        request: Request<DeterministicAeadDecryptRequest>,
    ) -> Result<Response<DeterministicAeadDecryptResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<CryptoResult<Vec<u8>>> {
            let registry = context.key_managers();
            let handle = resolve(req.annotated_keyset.as_ref(), registry)?;
            let daead = factory::deterministic_aead(&handle, registry)?;
            Ok(daead.decrypt_deterministically(&req.ciphertext, &req.associated_data))
        })
        .await??;

        let result = match outcome {
            Ok(plaintext) => deterministic_aead_decrypt_response::Result::Plaintext(plaintext),
            Err(e) => {
                debug!(error = %e, "deterministic decrypt failed");
                deterministic_aead_decrypt_response::Result::Err(e.to_string())
            }
        };
        Ok(Response::new(DeterministicAeadDecryptResponse {
            result: Some(result),
        }))
    }
}
