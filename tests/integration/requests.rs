//! Request/response cycle against a live socket.

use futures::StreamExt;
use integrations_http_client::errors::codes;
use integrations_http_client::{
    BasicAuth, HttpClientError, MultipartForm, RequestConfig, ResponseData, ResponseType,
    SearchParams,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{
    body_json, body_string, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, ResponseTemplate};

use super::{builder_for, client_for, setup_mock_server};

#[tokio::test]
async fn test_get_json_with_params() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .and(header_regex("accept", "^application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "items": [1, 2, 3] }))
                .insert_header("X-Request-Id", "req-42"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .get("/items", RequestConfig::new().param("page", 2))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.status_text(), "OK");
    assert_eq!(response.data().as_json(), Some(&json!({ "items": [1, 2, 3] })));
    assert_eq!(response.header("x-request-id"), Some("req-42"));
}

#[tokio::test]
async fn test_post_json_body() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "name": "ada" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .post("/users", json!({ "name": "ada" }), None)
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let created: serde_json::Value = response.json().unwrap();
    assert_eq!(created["id"], 7);
}

#[tokio::test]
async fn test_url_encoded_form() {
    let server = setup_mock_server().await;

    Mock::given(method("PUT"))
        .and(path("/form"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("a=1&b=two+words"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let form = SearchParams::new().with("a", "1").with("b", "two words");
    let response = client_for(&server).put("/form", form, None).await.unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_multipart_form() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("hello from a file"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .expect(1)
        .mount(&server)
        .await;

    let form = MultipartForm::new().text("title", "notes").file(
        "file",
        "notes.txt",
        "text/plain",
        b"hello from a file".to_vec(),
    );
    let response = client_for(&server)
        .post("/upload", form, RequestConfig::new().response_type(ResponseType::Text))
        .await
        .unwrap();

    assert_eq!(response.data().as_text(), Some("stored"));
}

#[tokio::test]
async fn test_basic_auth_header() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("authorization", "Basic dXNlcjpzZWNyZXQ="))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .get(
            "/private",
            RequestConfig::new().auth(BasicAuth::new("user", "secret")),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_client_default_header_is_sent() {
    let server = setup_mock_server().await;

    Mock::given(method("DELETE"))
        .and(path("/items/1"))
        .and(header("x-tenant", "acme"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = builder_for(&server).header("X-Tenant", "acme").build().unwrap();
    client.delete("/items/1", None).await.unwrap();
}

#[tokio::test]
async fn test_not_found_is_rejected_with_response() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "nope" })))
        .mount(&server)
        .await;

    let err = client_for(&server).get("/missing", None).await.unwrap_err();

    assert!(err.is_http_client_error());
    assert_eq!(err.code(), Some(codes::ERR_BAD_REQUEST));
    assert_eq!(err.to_string(), "Request failed with status code 404");
    let response = err.response().unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(response.data().as_json(), Some(&json!({ "error": "nope" })));
}

#[tokio::test]
async fn test_server_error_is_rejected() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).get("/down", None).await.unwrap_err();
    assert_eq!(err.code(), Some(codes::ERR_BAD_RESPONSE));
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .get("/old", RequestConfig::new().response_type(ResponseType::Text))
        .await
        .unwrap();
    assert_eq!(response.data().as_text(), Some("moved"));
}

#[tokio::test]
async fn test_zero_redirect_limit_surfaces_redirect() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&server)
        .await;

    let client = builder_for(&server).max_redirects(0).build().unwrap();
    let err = client.get("/old", None).await.unwrap_err();

    let response = err.response().unwrap();
    assert_eq!(response.status(), 302);
    assert_eq!(response.header("location"), Some("/new"));
}

#[tokio::test]
async fn test_head_has_no_body() {
    let server = setup_mock_server().await;

    Mock::given(method("HEAD"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let response = client_for(&server).head("/ping", None).await.unwrap();
    assert_eq!(response.data().as_json(), Some(&serde_json::Value::Null));
}

#[tokio::test]
async fn test_stream_response() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 64 * 1024]))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .get(
            "/download",
            RequestConfig::new().response_type(ResponseType::Stream),
        )
        .await
        .unwrap();

    let mut stream = response.into_data().into_stream().unwrap();
    let mut total = 0;
    while let Some(chunk) = stream.next().await {
        total += chunk.unwrap().len();
    }
    assert_eq!(total, 64 * 1024);
}

#[tokio::test]
async fn test_array_buffer_response() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 159, 146, 150]))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .get(
            "/bin",
            RequestConfig::new().response_type(ResponseType::ArrayBuffer),
        )
        .await
        .unwrap();

    match response.data() {
        ResponseData::ArrayBuffer(bytes) => assert_eq!(bytes.as_ref(), &[0u8, 159, 146, 150]),
        other => panic!("unexpected data: {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let client = integrations_http_client::HttpClient::builder()
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();
    let err = client.get("/anything", None).await.unwrap_err();

    assert!(matches!(err, HttpClientError::Transport(_)));
    assert!(!err.is_cancel());
}
