//! E2E tests for comment operations

mod common;

use common::TestServer;
use serde_json::Value;

async fn comment_count(server: &TestServer, post_id: i64) -> i64 {
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
        .unwrap()["comment_count"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn test_create_comment_without_auth() {
    let server = TestServer::new().await;
    let post_id = server.create_post("user-a", "parent").await;

    let response = server
        .client
        .post(server.url(&format!("/api/community/posts/{}/comments", post_id)))
        .json(&serde_json::json!({ "content": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_comment_lifecycle_keeps_count_in_sync() {
    let server = TestServer::new().await;
    let post_id = server.create_post("user-a", "parent").await;

    // Two comments, oldest first on read
    let response = server
        .post_as("user-b", &format!("/api/community/posts/{}/comments", post_id))
        .json(&serde_json::json!({ "content": "first!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let first: Value = response.json().await.unwrap();
    let first_id = first["id"].as_i64().unwrap();

    server
        .post_as("user-c", &format!("/api/community/posts/{}/comments", post_id))
        .json(&serde_json::json!({ "content": "second" }))
        .send()
        .await
        .unwrap();

    assert_eq!(comment_count(&server, post_id).await, 2);

    let comments: Value = server
        .client
        .get(server.url(&format!("/api/community/posts/{}/comments", post_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let comments = comments.as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["content"], "first!");
    assert_eq!(comments[1]["content"], "second");

    // Delete the first comment; the counter follows
    let response = server
        .delete_as("user-b", &format!("/api/community/comments/{}", first_id))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["deleted"], true);
    assert_eq!(comment_count(&server, post_id).await, 1);
}

#[tokio::test]
async fn test_delete_comment_by_non_author_is_noop() {
    let server = TestServer::new().await;
    let post_id = server.create_post("user-a", "parent").await;

    let comment: Value = server
        .post_as("user-b", &format!("/api/community/posts/{}/comments", post_id))
        .json(&serde_json::json!({ "content": "keep me" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let comment_id = comment["id"].as_i64().unwrap();

    let response = server
        .delete_as("user-c", &format!("/api/community/comments/{}", comment_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["deleted"], false);

    assert_eq!(comment_count(&server, post_id).await, 1);
}

#[tokio::test]
async fn test_deleting_post_removes_its_comments() {
    let server = TestServer::new().await;
    let post_id = server.create_post("user-a", "parent").await;

    server
        .post_as("user-b", &format!("/api/community/posts/{}/comments", post_id))
        .json(&serde_json::json!({ "content": "gone soon" }))
        .send()
        .await
        .unwrap();

    server
        .delete_as("user-a", &format!("/api/community/posts/{}", post_id))
        .send()
        .await
        .unwrap();

    let comments: Value = server
        .client
        .get(server.url(&format!("/api/community/posts/{}/comments", post_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(comments.as_array().unwrap().len(), 0);
}
