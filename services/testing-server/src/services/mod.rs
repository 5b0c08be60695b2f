//! gRPC service implementations, one per primitive family.
//!
//! Handlers move resolution, construction and the primitive call onto the
//! blocking pool: KMS clients block on remote calls and the crypto is CPU
//! bound.

mod aead;
mod deterministic_aead;
mod hybrid;
mod keyset;
mod keyset_deriver;
mod mac;
mod metadata;
mod prf_set;
mod signature;

pub use self::aead::AeadService;
pub use self::deterministic_aead::DeterministicAeadService;
pub use self::hybrid::HybridService;
pub use self::keyset::KeysetService;
pub use self::keyset_deriver::KeysetDeriverService;
pub use self::mac::MacService;
pub use self::metadata::MetadataService;
pub use self::prf_set::PrfSetService;
pub use self::signature::SignatureService;

use crate::context::HarnessContext;
use crate::error::HarnessResult;
use crate::factory;
use crate::proto::{CreationRequest, CreationResponse};
use crate::resolver::resolve;
use crosscheck_crypto::PrimitiveKind;
use std::sync::Arc;
use tonic::{Response, Status};
use tracing::debug;

/// Runs `f` on the blocking pool. A panicking task becomes `INTERNAL`.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, Status>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Status::internal(format!("worker task failed: {}", e)))
}

/// Shared body of every Create RPC: resolve, build, discard.
pub(crate) async fn create(
    context: &Arc<HarnessContext>,
    request: CreationRequest,
    kind: PrimitiveKind,
) -> Result<Response<CreationResponse>, Status> {
    let context = Arc::clone(context);
    let outcome = run_blocking(move || -> HarnessResult<()> {
        let registry = context.key_managers();
        let handle = resolve(request.annotated_keyset.as_ref(), registry)?;
        factory::build(&handle, kind, registry)?;
        Ok(())
    })
    .await?;

    let err = match outcome {
        Ok(()) => String::new(),
        Err(e) => {
            debug!(primitive = %kind, error = %e, "create failed");
            e.to_string()
        }
    };
    Ok(Response::new(CreationResponse { err }))
}
