//! Account and session flows against a live server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`bagrit-cli migrate`)
//! - The API server running (`cargo run -p bagrit-api`)
//! - `BAGRIT_TOKEN_SECRET` matching the server
//!
//! Run with: cargo test -p bagrit-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use bagrit_integration_tests::{PASSWORD, Session, base_url, client, unique_email};

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_unverified_user_cannot_sign_in() {
    let client = client();
    let base = base_url();
    let email = unique_email();

    let resp = client
        .post(format!("{base}/signup"))
        .json(&json!({
            "username": "integration",
            "email": email,
            "password": PASSWORD,
            "cPassword": PASSWORD,
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base}/signin"))
        .json(&json!({"email": email, "password": PASSWORD}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["message"], "Please verify your email first.");
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_profile_after_sign_in() {
    let session = Session::start().await;

    let resp = session.get("/user").send().await.expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["email"], session.email.as_str());
    assert_eq!(body["boughtProducts"], json!([]));
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_profile_without_session() {
    let resp = client()
        .get(format!("{}/user", base_url()))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
