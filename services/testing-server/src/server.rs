//! Assembles every testing service into one tonic router.

use crate::context::HarnessContext;
use crate::proto::aead_server::AeadServer;
use crate::proto::deterministic_aead_server::DeterministicAeadServer;
use crate::proto::hybrid_server::HybridServer;
use crate::proto::keyset_deriver_server::KeysetDeriverServer;
use crate::proto::keyset_server::KeysetServer;
use crate::proto::mac_server::MacServer;
use crate::proto::metadata_server::MetadataServer;
use crate::proto::prf_set_server::PrfSetServer;
use crate::proto::signature_server::SignatureServer;
use crate::services::{
    AeadService, DeterministicAeadService, HybridService, KeysetDeriverService, KeysetService,
    MacService, MetadataService, PrfSetService, SignatureService,
};
use std::sync::Arc;
use tonic::transport::server::Router;
use tonic::transport::Server;

pub fn build_router(context: Arc<HarnessContext>) -> Router {
    Server::builder()
        .add_service(MetadataServer::new(MetadataService))
        .add_service(KeysetServer::new(KeysetService::new(Arc::clone(&context))))
        .add_service(AeadServer::new(AeadService::new(Arc::clone(&context))))
        .add_service(DeterministicAeadServer::new(DeterministicAeadService::new(
            Arc::clone(&context),
        )))
        .add_service(HybridServer::new(HybridService::new(Arc::clone(&context))))
        .add_service(MacServer::new(MacService::new(Arc::clone(&context))))
        .add_service(PrfSetServer::new(PrfSetService::new(Arc::clone(&context))))
        .add_service(SignatureServer::new(SignatureService::new(Arc::clone(
            &context,
        ))))
        .add_service(KeysetDeriverServer::new(KeysetDeriverService::new(context)))
}
