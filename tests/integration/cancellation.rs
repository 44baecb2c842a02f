//! Timeouts and cancellation over a real connection.

use std::time::Duration;

use integrations_http_client::errors::codes;
use integrations_http_client::{is_cancel, CancelToken, RequestConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use super::{client_for, setup_mock_server};

async fn mount_slow_endpoint(server: &wiremock::MockServer) {
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_timeout_elapses() {
    let server = setup_mock_server().await;
    mount_slow_endpoint(&server).await;

    let client = client_for(&server);
    let err = client
        .get("/slow", RequestConfig::new().timeout_ms(100))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(codes::ECONNABORTED));
    assert_eq!(err.to_string(), "timeout of 100ms exceeded");
    assert!(!is_cancel(&err));
    assert_eq!(client.active_timers(), 0);
}

#[tokio::test]
async fn test_cancel_in_flight() {
    let server = setup_mock_server().await;
    mount_slow_endpoint(&server).await;

    let client = client_for(&server);
    let source = CancelToken::source();

    let canceller = source.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel(Some("user left"));
    });

    let started = std::time::Instant::now();
    let err = client
        .get("/slow", RequestConfig::new().cancel_token(source.token.clone()))
        .await
        .unwrap_err();

    assert!(is_cancel(&err));
    assert_eq!(err.cancel_reason().unwrap().message(), Some("user left"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancelled_token_never_reaches_server() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let source = CancelToken::source();
    source.cancel(Some("too early"));

    let err = client_for(&server)
        .get("/never", RequestConfig::new().cancel_token(source.token.clone()))
        .await
        .unwrap_err();

    assert!(is_cancel(&err));
    assert_eq!(err.to_string(), "Cancel: too early");
}
