//! Wire-level checks with a plain HTTP client: status codes, error bodies
//! and headers.

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use brana_integration_tests::TestServer;

#[tokio::test]
async fn test_errors_are_json_messages() {
    let server = TestServer::spawn().await;
    let http = Client::new();

    let response = http
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({ "email": "nobody@example.com", "password": "whatever" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid credentials");

    let response = http
        .post(format!("{}/auth/register", server.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());

    let response = http
        .get(format!("{}/orders/abc", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_camel_case_wire_format() {
    let server = TestServer::spawn().await;
    let http = Client::new();
    let (token, _) = server.signup("meron").await;

    let response = http
        .post(format!("{}/artworks", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Adwa",
            "description": "Victory, 1896",
            "imageRef": "/images/adwa.jpg",
            "price": "1500.00"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["forSale"], true);
    assert_eq!(body["sold"], false);
    assert_eq!(body["likes"], 0);
    assert!(body["likedBy"].as_array().is_some_and(Vec::is_empty));
    assert_eq!(body["artist"]["username"], "meron");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = TestServer::spawn().await;
    let http = Client::new();

    let response = http
        .get(format!("{}/health", server.base_url))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "trace-me-123"
    );
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}
