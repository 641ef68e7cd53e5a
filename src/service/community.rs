//! Community service
//!
//! Handles post, comment, and like operations: resolves the author
//! identity into stored fields, applies input limits, normalizes tags,
//! and publishes events after committed mutations.

use std::sync::Arc;

use crate::auth::AuthorIdentity;
use crate::data::{Comment, Database, Post};
use crate::error::AppError;
use crate::events::{CommunityEvent, EventBus};
use crate::metrics::{LIKE_TOGGLES_TOTAL, POSTS_CREATED_TOTAL};

/// Community service
pub struct CommunityService {
    db: Arc<Database>,
    events: EventBus,
    max_content_chars: usize,
    max_tags_per_post: usize,
}

impl CommunityService {
    /// Create new community service
    pub fn new(
        db: Arc<Database>,
        events: EventBus,
        max_content_chars: usize,
        max_tags_per_post: usize,
    ) -> Self {
        Self {
            db,
            events,
            max_content_chars,
            max_tags_per_post,
        }
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Create a post authored by `identity`.
    ///
    /// Tags are trimmed, lowercased, and deduplicated before storage;
    /// an empty tag list is stored as untagged.
    pub async fn create_post(
        &self,
        identity: &AuthorIdentity,
        content: &str,
        image_url: Option<String>,
        tags: Option<Vec<String>>,
    ) -> Result<i64, AppError> {
        self.check_content_length(content)?;
        let tags = self.normalize_tags(tags)?;

        let post_id = self
            .db
            .create_post(
                &identity.uid,
                &identity.author_name(),
                identity.photo_url.as_deref(),
                content,
                image_url.as_deref(),
                tags.as_deref(),
            )
            .await?;

        POSTS_CREATED_TOTAL
            .with_label_values(&[if tags.is_some() { "yes" } else { "no" }])
            .inc();
        tracing::info!(post_id, author_id = %identity.uid, "Post created");
        self.events.publish(CommunityEvent::PostCreated { post_id });

        Ok(post_id)
    }

    /// List all posts, newest first.
    pub async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        self.db.list_posts().await
    }

    /// List posts carrying `tag`, newest first.
    ///
    /// Matching is exact against the stored lowercase tags.
    pub async fn list_posts_by_tag(&self, tag: &str) -> Result<Vec<Post>, AppError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(AppError::Validation("tag cannot be empty".to_string()));
        }

        self.db.list_posts_by_tag(tag).await
    }

    /// Delete a post owned by `identity`.
    ///
    /// Returns whether a post was removed; a non-owner request is a
    /// no-op, never an error.
    pub async fn delete_post(
        &self,
        identity: &AuthorIdentity,
        post_id: i64,
    ) -> Result<bool, AppError> {
        let deleted = self.db.delete_post(post_id, &identity.uid).await?;

        if deleted {
            tracing::info!(post_id, author_id = %identity.uid, "Post deleted");
            self.events.publish(CommunityEvent::PostDeleted { post_id });
        }

        Ok(deleted)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Comment on a post as `identity`.
    pub async fn create_comment(
        &self,
        identity: &AuthorIdentity,
        post_id: i64,
        content: &str,
    ) -> Result<i64, AppError> {
        self.check_content_length(content)?;

        let comment_id = self
            .db
            .create_comment(
                post_id,
                &identity.uid,
                &identity.author_name(),
                identity.photo_url.as_deref(),
                content,
            )
            .await?;

        self.events.publish(CommunityEvent::CommentCreated {
            post_id,
            comment_id,
        });

        Ok(comment_id)
    }

    /// List comments on a post, oldest first.
    pub async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        self.db.list_comments(post_id).await
    }

    /// Delete a comment owned by `identity`; non-owner requests no-op.
    pub async fn delete_comment(
        &self,
        identity: &AuthorIdentity,
        comment_id: i64,
    ) -> Result<bool, AppError> {
        let deleted = self.db.delete_comment(comment_id, &identity.uid).await?;

        if deleted {
            self.events
                .publish(CommunityEvent::CommentDeleted { comment_id });
        }

        Ok(deleted)
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Flip the liked state of a post for `identity`.
    pub async fn toggle_like(
        &self,
        identity: &AuthorIdentity,
        post_id: i64,
    ) -> Result<bool, AppError> {
        let liked = self.db.toggle_like(post_id, &identity.uid).await?;

        LIKE_TOGGLES_TOTAL
            .with_label_values(&[if liked { "liked" } else { "unliked" }])
            .inc();
        self.events
            .publish(CommunityEvent::LikeToggled { post_id, liked });

        Ok(liked)
    }

    /// Whether `identity` currently likes the post.
    pub async fn check_liked(
        &self,
        identity: &AuthorIdentity,
        post_id: i64,
    ) -> Result<bool, AppError> {
        self.db.check_liked(post_id, &identity.uid).await
    }

    // =========================================================================
    // Input normalization
    // =========================================================================

    fn check_content_length(&self, content: &str) -> Result<(), AppError> {
        if content.chars().count() > self.max_content_chars {
            return Err(AppError::Validation(format!(
                "content cannot exceed {} characters",
                self.max_content_chars
            )));
        }
        Ok(())
    }

    fn normalize_tags(&self, tags: Option<Vec<String>>) -> Result<Option<Vec<String>>, AppError> {
        let Some(tags) = tags else {
            return Ok(None);
        };

        let mut normalized: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.trim().to_lowercase();
            if tag.is_empty() || normalized.contains(&tag) {
                continue;
            }
            normalized.push(tag);
        }

        if normalized.len() > self.max_tags_per_post {
            return Err(AppError::Validation(format!(
                "a post cannot carry more than {} tags",
                self.max_tags_per_post
            )));
        }

        Ok(if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        })
    }
}
