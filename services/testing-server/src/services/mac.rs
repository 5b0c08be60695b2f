//! MAC service. All failures are reported in `err`; verification fails
//! closed.

use super::{create, run_blocking};
use crate::context::HarnessContext;
use crate::error::HarnessResult;
use crate::factory;
use crate::proto::mac_server::Mac as MacApi;
use crate::proto::{
    compute_mac_response, ComputeMacRequest, ComputeMacResponse, CreationRequest,
    CreationResponse, VerifyMacRequest, VerifyMacResponse,
};
use crate::resolver::resolve;
use crosscheck_crypto::PrimitiveKind;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

pub struct MacService {
    context: Arc<HarnessContext>,
}

impl MacService {
    pub fn new(context: Arc<HarnessContext>) -> Self {
        Self { context }
    }
}

#[tonic::async_trait]
impl MacApi for MacService {
    async fn create(
        &self,
        request: Request<CreationRequest>,
    ) -> Result<Response<CreationResponse>, Status> {
        create(&self.context, request.into_inner(), PrimitiveKind::Mac).await
    }

    async fn compute_mac(
        &self,
        request: Request<ComputeMacRequest>,
    ) -> Result<Response<ComputeMacResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<Vec<u8>> {
            let registry = context.key_managers();
            let handle = resolve(req.annotated_keyset.as_ref(), registry)?;
            let mac = factory::mac(&handle, registry)?;
            Ok(mac.compute_mac(&req.data)?)
        })
        .await?;

        let result = match outcome {
            Ok(mac_value) => compute_mac_response::Result::MacValue(mac_value),
            Err(e) => {
                debug!(error = %e, "compute MAC failed");
                compute_mac_response::Result::Err(e.to_string())
            }
        };
        Ok(Response::new(ComputeMacResponse {
            result: Some(result),
        }))
    }

    async fn verify_mac(
        &self,
        request: Request<VerifyMacRequest>,
    ) -> Result<Response<VerifyMacResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<()> {
            let registry = context.key_managers();
            let handle = resolve(req.annotated_keyset.as_ref(), registry)?;
            let mac = factory::mac(&handle, registry)?;
            Ok(mac.verify_mac(&req.mac_value, &req.data)?)
        })
        .await?;

        let err = match outcome {
            Ok(()) => String::new(),
            Err(e) => {
                debug!(error = %e, "MAC verification failed");
                e.to_string()
            }
        };
        Ok(Response::new(VerifyMacResponse { err }))
    }
}
