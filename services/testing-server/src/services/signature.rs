//! Digital signature service. All failures are reported in `err`;
//! verification fails closed.

use super::{create, run_blocking};
use crate::context::HarnessContext;
use crate::error::HarnessResult;
use crate::factory;
use crate::proto::signature_server::Signature as SignatureApi;
use crate::proto::{
    signature_sign_response, CreationRequest, CreationResponse, SignatureSignRequest,
    SignatureSignResponse, SignatureVerifyRequest, SignatureVerifyResponse,
};
use crate::resolver::resolve;
use crosscheck_crypto::PrimitiveKind;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

pub struct SignatureService {
    context: Arc<HarnessContext>,
}

impl SignatureService {
    pub fn new(context: Arc<HarnessContext>) -> Self {
        Self { context }
    }
}

#[tonic::async_trait]
impl SignatureApi for SignatureService {
    async fn create_public_key_sign(
        &self,
        request: Request<CreationRequest>,
    ) -> Result<Response<CreationResponse>, Status> {
        create(&self.context, request.into_inner(), PrimitiveKind::Signer).await
    }

    async fn create_public_key_verify(
        &self,
        request: Request<CreationRequest>,
    ) -> Result<Response<CreationResponse>, Status> {
        create(&self.context, request.into_inner(), PrimitiveKind::Verifier).await
    }

    async fn sign(
        &self,
        request: Request<SignatureSignRequest>,
    ) -> Result<Response<SignatureSignResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<Vec<u8>> {
            let registry = context.key_managers();
            let handle = resolve(req.private_annotated_keyset.as_ref(), registry)?;
            let signer = factory::signer(&handle, registry)?;
            Ok(signer.sign(&req.data)?)
        })
        .await?;

        let result = match outcome {
            Ok(signature) => signature_sign_response::Result::Signature(signature),
            Err(e) => {
                debug!(error = %e, "sign failed");
                signature_sign_response::Result::Err(e.to_string())
            }
        };
        Ok(Response::new(SignatureSignResponse {
            result: Some(result),
        }))
    }

    async fn verify(
        &self,
        request: Request<SignatureVerifyRequest>,
    ) -> Result<Response<SignatureVerifyResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<()> {
            let registry = context.key_managers();
            let handle = resolve(req.public_annotated_keyset.as_ref(), registry)?;
            let verifier = factory::verifier(&handle, registry)?;
            Ok(verifier.verify(&req.signature, &req.data)?)
        })
        .await?;

        let err = match outcome {
            Ok(()) => String::new(),
            Err(e) => {
                debug!(error = %e, "signature verification failed");
                e.to_string()
            }
        };
        Ok(Response::new(SignatureVerifyResponse { err }))
    }
}
