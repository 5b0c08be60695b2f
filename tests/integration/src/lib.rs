//! Cross-instance integration tests.
//!
//! Two independently started testing servers stand in for two
//! implementations of the library. Anything one of them produces must be
//! accepted by the other, and deterministic outputs must match exactly:
//! - AEAD ciphertexts decrypt on the other instance
//! - deterministic AEAD ciphertexts are identical
//! - derived keysets are byte-identical
//! - signatures and MACs verify across instances

pub mod test_utils;

#[cfg(test)]
mod cross_instance_tests;
