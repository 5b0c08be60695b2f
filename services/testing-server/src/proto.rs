//! Generated gRPC types for the testing API.

tonic::include_proto!("crosscheck.testing");
