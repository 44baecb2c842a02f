//! Integration tests using WireMock
//!
//! These tests run the client with its default reqwest transport against a
//! local mock server, covering the full request/response cycle.

mod cancellation;
mod requests;

use integrations_http_client::{HttpClient, HttpClientBuilder};
use wiremock::MockServer;

/// Starts a mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// A builder pointed at the mock server.
pub fn builder_for(server: &MockServer) -> HttpClientBuilder {
    HttpClient::builder().base_url(server.uri())
}

/// A client pointed at the mock server.
pub fn client_for(server: &MockServer) -> HttpClient {
    builder_for(server).build().expect("Failed to build client")
}
