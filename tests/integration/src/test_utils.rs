//! Test utilities for cross-instance integration tests

use crosscheck_testing_server::proto::keyset_client::KeysetClient;
use crosscheck_testing_server::proto::{
    keyset_generate_response, keyset_public_response, keyset_template_response, AnnotatedKeyset,
    KeysetGenerateRequest, KeysetPublicRequest, KeysetTemplateRequest,
};
use crosscheck_testing_server::{build_router, HarnessContext};
use std::sync::{Arc, Once};
use tokio::time::Duration;

static TRACING: Once = Once::new();

/// Installs a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A testing server on an ephemeral port with only the fake KMS registered.
pub struct TestServer {
    pub url: String,
}

impl TestServer {
    pub async fn start() -> Self {
        init_tracing();
        let addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let context = Arc::new(HarnessContext::with_fake_kms());
        tokio::spawn(async move {
            build_router(context)
                .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
                .await
                .unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        tracing::debug!(url = %url, "test server started");
        Self { url }
    }

    /// New keyset from a named template, generated by this server.
    pub async fn generate(&self, template_name: &str) -> Vec<u8> {
        let mut client = KeysetClient::connect(self.url.clone())
            .await
            .expect("Failed to connect to server");
        let template = match client
            .get_template(KeysetTemplateRequest {
                template_name: template_name.to_string(),
            })
            .await
            .unwrap()
            .into_inner()
            .result
        {
            Some(keyset_template_response::Result::KeyTemplate(template)) => template,
            other => panic!("template {} unavailable: {:?}", template_name, other),
        };
        match client
            .generate(KeysetGenerateRequest { template })
            .await
            .unwrap()
            .into_inner()
            .result
        {
            Some(keyset_generate_response::Result::Keyset(keyset)) => keyset,
            other => panic!("generate {} failed: {:?}", template_name, other),
        }
    }

    pub async fn public(&self, private_keyset: Vec<u8>) -> Vec<u8> {
        let mut client = KeysetClient::connect(self.url.clone()).await.unwrap();
        match client
            .public(KeysetPublicRequest { private_keyset })
            .await
            .unwrap()
            .into_inner()
            .result
        {
            Some(keyset_public_response::Result::PublicKeyset(public)) => public,
            other => panic!("public failed: {:?}", other),
        }
    }
}

pub fn annotated(serialized_keyset: &[u8]) -> Option<AnnotatedKeyset> {
    Some(AnnotatedKeyset {
        serialized_keyset: serialized_keyset.to_vec(),
        ..Default::default()
    })
}
