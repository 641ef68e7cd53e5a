//! Data models
//!
//! Rust structs representing database entities. IDs are the integer
//! rowids SQLite assigns, which increase monotonically per insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

// =============================================================================
// Post
// =============================================================================

/// A community post
///
/// `like_count` and `comment_count` are denormalized aggregates kept in
/// sync with the `likes` and `comments` tables by transactional updates;
/// they are never recomputed on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// External identity provider user id
    pub author_id: String,
    /// Display name resolved at creation time
    pub author_name: String,
    pub author_photo_url: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
    /// Normalized lowercase tags, absent when the post was untagged
    pub tags: Option<Vec<String>>,
}

// Tags are stored as a JSON text column, so the row mapping is manual.
impl FromRow<'_, SqliteRow> for Post {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            author_id: row.try_get("author_id")?,
            author_name: row.try_get("author_name")?,
            author_photo_url: row.try_get("author_photo_url")?,
            content: row.try_get("content")?,
            image_url: row.try_get("image_url")?,
            created_at: row.try_get("created_at")?,
            like_count: row.try_get("like_count")?,
            comment_count: row.try_get("comment_count")?,
            tags: parse_tags(row.try_get("tags")?),
        })
    }
}

/// Decode the JSON tag column, treating malformed values as untagged.
fn parse_tags(raw: Option<String>) -> Option<Vec<String>> {
    raw.and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
}

// =============================================================================
// Comment
// =============================================================================

/// A comment on a post
///
/// Rows are removed by cascade when the parent post is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: String,
    pub author_name: String,
    pub author_photo_url: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// There is no `Like` row model: the liked state for a (post, user) pair
// is the existence of a row, and the data layer only ever asks for
// existence or counts.
