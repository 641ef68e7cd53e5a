//! Community endpoints
//!
//! Posts, comments, likes, and the live event stream. Write endpoints
//! require an authenticated identity; reads of the feed are public.

use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{Comment, Post};
use crate::error::AppError;
use crate::metrics::EVENT_SUBSCRIBERS;
use crate::service::CommunityService;

fn community_service(state: &AppState) -> CommunityService {
    CommunityService::new(
        state.db.clone(),
        state.events.clone(),
        state.config.community.max_content_chars,
        state.config.community.max_tags_per_post,
    )
}

// =============================================================================
// Request / response bodies
// =============================================================================

/// Post creation request
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// Comment creation request
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct LikedResponse {
    pub liked: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    pub tag: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/community/posts
async fn create_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<Json<CreatedResponse>, AppError> {
    let id = community_service(&state)
        .create_post(&identity, &request.content, request.image_url, request.tags)
        .await?;

    Ok(Json(CreatedResponse { id }))
}

/// GET /api/community/posts
///
/// With `?tag=` the feed is filtered to posts carrying that tag.
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<Vec<Post>>, AppError> {
    let service = community_service(&state);
    let posts = match query.tag.as_deref() {
        Some(tag) => service.list_posts_by_tag(tag).await?,
        None => service.list_posts().await?,
    };

    Ok(Json(posts))
}

/// DELETE /api/community/posts/:id
async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Json<DeletedResponse>, AppError> {
    let deleted = community_service(&state)
        .delete_post(&identity, post_id)
        .await?;

    Ok(Json(DeletedResponse { deleted }))
}

/// POST /api/community/posts/:id/comments
async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(post_id): Path<i64>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<Json<CreatedResponse>, AppError> {
    let id = community_service(&state)
        .create_comment(&identity, post_id, &request.content)
        .await?;

    Ok(Json(CreatedResponse { id }))
}

/// GET /api/community/posts/:id/comments
async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let comments = community_service(&state).list_comments(post_id).await?;

    Ok(Json(comments))
}

/// DELETE /api/community/comments/:id
async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(comment_id): Path<i64>,
) -> Result<Json<DeletedResponse>, AppError> {
    let deleted = community_service(&state)
        .delete_comment(&identity, comment_id)
        .await?;

    Ok(Json(DeletedResponse { deleted }))
}

/// POST /api/community/posts/:id/like
async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Json<LikedResponse>, AppError> {
    let liked = community_service(&state)
        .toggle_like(&identity, post_id)
        .await?;

    Ok(Json(LikedResponse { liked }))
}

/// GET /api/community/posts/:id/like
async fn check_liked(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Json<LikedResponse>, AppError> {
    let liked = community_service(&state)
        .check_liked(&identity, post_id)
        .await?;

    Ok(Json(LikedResponse { liked }))
}

/// Keeps the subscriber gauge honest: incremented on subscribe and
/// decremented when the owning stream is dropped, so disconnects are
/// reflected without polling.
struct SubscriberGuard;

impl SubscriberGuard {
    fn new() -> Self {
        EVENT_SUBSCRIBERS.inc();
        Self
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        EVENT_SUBSCRIBERS.dec();
    }
}

/// GET /api/community/stream
///
/// Server-sent events for committed community mutations. A subscriber
/// that falls behind the buffer misses events; clients are expected to
/// refetch the feed on reconnect.
async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.events.subscribe();
    let guard = SubscriberGuard::new();

    // The guard moves into the closure and drops with the stream when
    // the client disconnects.
    let stream = BroadcastStream::new(receiver).filter_map(move |event| {
        let _live = &guard;
        match event {
            Ok(event) => Event::default().json_data(&event).ok().map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event stream subscriber lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// =============================================================================
// Router
// =============================================================================

/// Create community API router
///
/// Authentication is enforced per handler by the `CurrentUser`
/// extractor; feed reads and the event stream are public.
pub fn community_router() -> Router<AppState> {
    Router::new()
        .route("/community/posts", post(create_post).get(list_posts))
        .route("/community/posts/:id", delete(delete_post))
        .route(
            "/community/posts/:id/comments",
            post(create_comment).get(list_comments),
        )
        .route("/community/comments/:id", delete(delete_comment))
        .route(
            "/community/posts/:id/like",
            post(toggle_like).get(check_liked),
        )
        .route("/community/stream", get(stream_events))
}
