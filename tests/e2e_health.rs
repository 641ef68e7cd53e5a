//! E2E tests for health and metrics endpoints

mod common;

use common::TestServer;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_request_counter_records_route_and_status() {
    let server = TestServer::new().await;

    server.create_post("user-a", "observable").await;
    server
        .client
        .get(server.url("/api/community/posts"))
        .send()
        .await
        .unwrap();

    let body = server
        .client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    // Counted per matched route with the real status code
    assert!(body.contains("tidepool_http_requests_total"));
    assert!(body.contains(r#"endpoint="/api/community/posts""#));
    assert!(body.contains(r#"status="200""#));
}
