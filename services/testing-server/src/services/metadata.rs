use crate::proto::metadata_server::Metadata;
use crate::proto::{ServerInfoRequest, ServerInfoResponse};
use tonic::{Request, Response, Status};

pub const SERVER_LANGUAGE: &str = "rust";

#[derive(Debug, Default)]
pub struct MetadataService;

#[tonic::async_trait]
impl Metadata for MetadataService {
    async fn get_server_info(
        &self,
        _request: Request<ServerInfoRequest>,
    ) -> Result<Response<ServerInfoResponse>, Status> {
        Ok(Response::new(ServerInfoResponse {
            language: SERVER_LANGUAGE.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_info() {
        let info = MetadataService
            .get_server_info(Request::new(ServerInfoRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(info.language, "rust");
        assert!(!info.version.is_empty());
    }
}
