//! Cross-language conformance testing server.
//!
//! Exposes every primitive family of `crosscheck-crypto` over gRPC so an
//! external driver can run identical test vectors against several
//! implementations and compare the results byte for byte.
//!
//! # Request flow
//!
//! ```text
//! request -> service -> resolver (-> KMS registry) -> factory -> primitive -> response
//! ```
//!
//! Keysets are resolved and primitives built fresh for every request; nothing
//! is cached between calls. See `proto/testing_api.proto` for which failures
//! surface as gRPC statuses and which are returned in a response's `err`.

pub mod context;
pub mod error;
pub mod factory;
pub mod proto;
pub mod resolver;
pub mod server;
pub mod services;

pub use context::HarnessContext;
pub use error::HarnessError;
pub use server::build_router;
