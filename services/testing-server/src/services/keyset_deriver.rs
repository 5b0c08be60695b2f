//! Keyset derivation service. All failures are reported in `err`.

use super::{create, run_blocking};
use crate::context::HarnessContext;
use crate::error::HarnessResult;
use crate::factory;
use crate::proto::keyset_deriver_server::KeysetDeriver as KeysetDeriverApi;
use crate::proto::{
    derive_keyset_response, CreationRequest, CreationResponse, DeriveKeysetRequest,
    DeriveKeysetResponse,
};
use crate::resolver::resolve;
use crosscheck_crypto::PrimitiveKind;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

pub struct KeysetDeriverService {
    context: Arc<HarnessContext>,
}

impl KeysetDeriverService {
    pub fn new(context: Arc<HarnessContext>) -> Self {
        Self { context }
    }
}

#[tonic::async_trait]
impl KeysetDeriverApi for KeysetDeriverService {
    async fn create(
        &self,
        request: Request<CreationRequest>,
    ) -> Result<Response<CreationResponse>, Status> {
        create(&self.context, request.into_inner(), PrimitiveKind::KeysetDeriver).await
    }

    async fn derive_keyset(
        &self,
        request: Request<DeriveKeysetRequest>,
    ) -> Result<Response<DeriveKeysetResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<Vec<u8>> {
            let registry = context.key_managers();
            let handle = resolve(req.annotated_keyset.as_ref(), registry)?;
            let deriver = factory::keyset_deriver(&handle, registry)?;
            Ok(deriver.derive_keyset(&req.salt)?.serialize())
        })
        .await?;

        let result = match outcome {
            Ok(derived) => derive_keyset_response::Result::DerivedKeyset(derived),
            Err(e) => {
                debug!(error = %e, "keyset derivation failed");
                derive_keyset_response::Result::Err(e.to_string())
            }
        };
        Ok(Response::new(DeriveKeysetResponse {
            result: Some(result),
        }))
    }
}
