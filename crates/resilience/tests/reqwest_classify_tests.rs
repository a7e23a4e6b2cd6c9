//! Classification of real reqwest errors, against a local mock server.

#![cfg(feature = "reqwest")]

use std::time::Duration;

use resilience::{FailureKind, RetryableError};

#[tokio::test]
async fn http_429_classifies_as_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .with_status(429)
        .with_body("Too Many Requests")
        .create_async()
        .await;

    let response = reqwest::get(format!("{}/search", server.url()))
        .await
        .expect("request should reach the mock server");
    let error = response
        .error_for_status()
        .expect_err("429 must be an error status");

    assert_eq!(error.failure_kind(), FailureKind::RateLimited);
    assert!(error.is_retryable());
    mock.assert_async().await;
}

#[tokio::test]
async fn http_500_classifies_as_transient() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/geocode")
        .with_status(500)
        .create_async()
        .await;

    let response = reqwest::get(format!("{}/geocode", server.url()))
        .await
        .expect("request should reach the mock server");
    let error = response
        .error_for_status()
        .expect_err("500 must be an error status");

    assert_eq!(error.failure_kind(), FailureKind::Transient);
}

#[tokio::test]
async fn http_401_classifies_as_permanent() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/listings")
        .with_status(401)
        .create_async()
        .await;

    let response = reqwest::get(format!("{}/listings", server.url()))
        .await
        .expect("request should reach the mock server");
    let error = response
        .error_for_status()
        .expect_err("401 must be an error status");

    assert_eq!(error.failure_kind(), FailureKind::Permanent);
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn client_timeout_classifies_as_transient() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/slow")
        .with_status(200)
        .with_chunked_body(|_| {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .create_async()
        .await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(50))
        .build()
        .expect("client builds");

    let error = client
        .get(format!("{}/slow", server.url()))
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .expect_err("request must time out");

    assert!(error.is_timeout() || error.is_connect());
    assert_eq!(error.failure_kind(), FailureKind::Transient);
}
