//! Hybrid encryption service. All failures are reported in `err`.

use super::{create, run_blocking};
use crate::context::HarnessContext;
use crate::error::HarnessResult;
use crate::factory;
use crate::proto::hybrid_server::Hybrid as HybridApi;
use crate::proto::{
    hybrid_decrypt_response, hybrid_encrypt_response, CreationRequest, CreationResponse,
    HybridDecryptRequest, HybridDecryptResponse, HybridEncryptRequest, HybridEncryptResponse,
};
use crate::resolver::resolve;
use crosscheck_crypto::PrimitiveKind;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

pub struct HybridService {
    context: Arc<HarnessContext>,
}

impl HybridService {
    pub fn new(context: Arc<HarnessContext>) -> Self {
        Self { context }
    }
}

#[tonic::async_trait]
impl HybridApi for HybridService {
    async fn create_hybrid_encrypt(
        &self,
        request: Request<CreationRequest>,
    ) -> Result<Response<CreationResponse>, Status> {
        create(&self.context, request.into_inner(), PrimitiveKind::HybridEncrypt).await
    }

    async fn create_hybrid_decrypt(
        &self,
        request: Request<CreationRequest>,
    ) -> Result<Response<CreationResponse>, Status> {
        create(&self.context, request.into_inner(), PrimitiveKind::HybridDecrypt).await
    }

    async fn encrypt(
        &self,
        request: Request<HybridEncryptRequest>,
    ) -> Result<Response<HybridEncryptResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<Vec<u8>> {
            let registry = context.key_managers();
            let handle = resolve(req.public_annotated_keyset.as_ref(), registry)?;
            let encrypter = factory::hybrid_encrypt(&handle, registry)?;
            Ok(encrypter.encrypt(&req.plaintext, &req.context_info)?)
        })
        .await?;

        let result = match outcome {
            Ok(ciphertext) => hybrid_encrypt_response::Result::Ciphertext(ciphertext),
            Err(e) => {
                debug!(error = %e, "hybrid encrypt failed");
                hybrid_encrypt_response::Result::Err(e.to_string())
            }
        };
        Ok(Response::new(HybridEncryptResponse {
            result: Some(result),
        }))
    }

    async fn decrypt(
        &self,
        request: Request<HybridDecryptRequest>,
    ) -> Result<Response<HybridDecryptResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<Vec<u8>> {
            let registry = context.key_managers();
            let handle = resolve(req.private_annotated_keyset.as_ref(), registry)?;
            let decrypter = factory::hybrid_decrypt(&handle, registry)?;
            Ok(decrypter.decrypt(&req.ciphertext, &req.context_info)?)
        })
        .await?;

        let result = match outcome {
            Ok(plaintext) => hybrid_decrypt_response::Result::Plaintext(plaintext),
            Err(e) => {
                debug!(error = %e, "hybrid decrypt failed");
                hybrid_decrypt_response::Result::Err(e.to_string())
            }
        };
        Ok(Response::new(HybridDecryptResponse {
            result: Some(result),
        }))
    }
}
