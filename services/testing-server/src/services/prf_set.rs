//! PRF set service. All failures are reported in `err`.

use super::{create, run_blocking};
use crate::context::HarnessContext;
use crate::error::{HarnessError, HarnessResult};
use crate::factory;
use crate::proto::prf_set_server::PrfSet as PrfSetApi;
use crate::proto::{
    prf_set_compute_response, prf_set_key_ids_response, CreationRequest, CreationResponse,
    PrfSetComputeRequest, PrfSetComputeResponse, PrfSetKeyIdsRequest, PrfSetKeyIdsResponse,
};
use crate::resolver::resolve;
use crosscheck_crypto::{CryptoError, PrimitiveKind};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::debug;

pub struct PrfSetService {
    context: Arc<HarnessContext>,
}

impl PrfSetService {
    pub fn new(context: Arc<HarnessContext>) -> Self {
        Self { context }
    }
}

#[tonic::async_trait]
impl PrfSetApi for PrfSetService {
    async fn create(
        &self,
        request: Request<CreationRequest>,
    ) -> Result<Response<CreationResponse>, Status> {
        create(&self.context, request.into_inner(), PrimitiveKind::PrfSet).await
    }

    async fn key_ids(
        &self,
        request: Request<PrfSetKeyIdsRequest>,
    ) -> Result<Response<PrfSetKeyIdsResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<prf_set_key_ids_response::Output> {
            let registry = context.key_managers();
            let handle = resolve(req.annotated_keyset.as_ref(), registry)?;
            let prf_set = factory::prf_set(&handle, registry)?;
            Ok(prf_set_key_ids_response::Output {
                primary_key_id: prf_set.primary_id(),
                key_id: prf_set.key_ids(),
            })
        })
        .await?;

        let result = match outcome {
            Ok(output) => prf_set_key_ids_response::Result::Output(output),
            Err(e) => {
                debug!(error = %e, "PRF key ids failed");
                prf_set_key_ids_response::Result::Err(e.to_string())
            }
        };
        Ok(Response::new(PrfSetKeyIdsResponse {
            result: Some(result),
        }))
    }

    async fn compute(
        &self,
        request: Request<PrfSetComputeRequest>,
    ) -> Result<Response<PrfSetComputeResponse>, Status> {
        let req = request.into_inner();
        let context = Arc::clone(&self.context);
        let outcome = run_blocking(move || -> HarnessResult<Vec<u8>> {
            let output_length = usize::try_from(req.output_length).map_err(|_| {
                CryptoError::Prf(format!("invalid output length {}", req.output_length))
            })?;
            let registry = context.key_managers();
            let handle = resolve(req.annotated_keyset.as_ref(), registry)?;
            let prf_set = factory::prf_set(&handle, registry)?;
            let prf = prf_set
                .get(req.key_id)
                .ok_or_else(|| HarnessError::from(CryptoError::Prf("Unknown key ID".to_string())))?;
            Ok(prf.compute(&req.input_data, output_length)?)
        })
        .await?;

        let result = match outcome {
            Ok(output) => prf_set_compute_response::Result::Output(output),
            Err(e) => {
                debug!(error = %e, "PRF compute failed");
                prf_set_compute_response::Result::Err(e.to_string())
            }
        };
        Ok(Response::new(PrfSetComputeResponse {
            result: Some(result),
        }))
    }
}
