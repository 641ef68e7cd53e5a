//! E2E tests for like toggling

mod common;

use common::TestServer;
use serde_json::Value;

async fn like_count(server: &TestServer, post_id: i64) -> i64 {
    let posts: Value = server
        .client
        .get(server.url("/api/community/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    posts
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"].as_i64() == Some(post_id))
        .unwrap()["like_count"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn test_toggle_like_without_auth() {
    let server = TestServer::new().await;
    let post_id = server.create_post("user-a", "Hello").await;

    let response = server
        .client
        .post(server.url(&format!("/api/community/posts/{}/like", post_id)))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_toggle_like_scenario() {
    let server = TestServer::new().await;

    // User A posts "Hello"
    let post_id = server.create_post("user-a", "Hello").await;
    assert_eq!(like_count(&server, post_id).await, 0);

    // User B likes it
    let response = server
        .post_as("user-b", &format!("/api/community/posts/{}/like", post_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["liked"], true);
    assert_eq!(like_count(&server, post_id).await, 1);

    // User B toggles again: un-liked, counter restored
    let json: Value = server
        .post_as("user-b", &format!("/api/community/posts/{}/like", post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["liked"], false);
    assert_eq!(like_count(&server, post_id).await, 0);
}

#[tokio::test]
async fn test_check_liked_reflects_committed_state() {
    let server = TestServer::new().await;
    let post_id = server.create_post("user-a", "Hello").await;

    let json: Value = server
        .get_as("user-b", &format!("/api/community/posts/{}/like", post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["liked"], false);

    server
        .post_as("user-b", &format!("/api/community/posts/{}/like", post_id))
        .send()
        .await
        .unwrap();

    let json: Value = server
        .get_as("user-b", &format!("/api/community/posts/{}/like", post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["liked"], true);

    // Other users are unaffected
    let json: Value = server
        .get_as("user-c", &format!("/api/community/posts/{}/like", post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["liked"], false);
}

#[tokio::test]
async fn test_likes_from_multiple_users_accumulate() {
    let server = TestServer::new().await;
    let post_id = server.create_post("user-a", "popular").await;

    for user in ["user-b", "user-c", "user-d"] {
        let json: Value = server
            .post_as(user, &format!("/api/community/posts/{}/like", post_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(json["liked"], true);
    }

    assert_eq!(like_count(&server, post_id).await, 3);
}
