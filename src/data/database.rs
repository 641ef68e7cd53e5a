//! SQLite database operations
//!
//! All database access goes through this module. Every user-supplied
//! value is passed as a bound parameter, and every mutation that touches
//! a denormalized counter runs inside a single transaction: the counter
//! columns on `posts` must equal the matching child-table row counts
//! after every commit.

use std::path::Path;
use std::time::{Duration, Instant};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist and ensures the
    /// schema is present.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    /// * `max_connections` - Pool size
    ///
    /// # Errors
    /// Returns error if connection or schema setup fails
    pub async fn connect(path: &Path, max_connections: u32) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        // Foreign keys are off by default in SQLite; the cascade rules
        // on comments/likes depend on them.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        tracing::info!("Database connected and schema ensured");

        Ok(db)
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Create the community tables if they are absent.
    ///
    /// Idempotent and safe to run from concurrent processes: every
    /// statement uses IF NOT EXISTS semantics. Called on every connect,
    /// also callable directly.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id TEXT NOT NULL,
                author_name TEXT NOT NULL,
                author_photo_url TEXT,
                content TEXT NOT NULL,
                image_url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                like_count INTEGER NOT NULL DEFAULT 0,
                comment_count INTEGER NOT NULL DEFAULT 0,
                tags TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                author_id TEXT NOT NULL,
                author_name TEXT NOT NULL,
                author_photo_url TEXT,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS likes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (post_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_comments_post_id ON comments(post_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_likes_post_id ON likes(post_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Create a post
    ///
    /// Counters start at zero and the creation timestamp is assigned by
    /// the database.
    ///
    /// # Returns
    /// The generated post id
    pub async fn create_post(
        &self,
        author_id: &str,
        author_name: &str,
        author_photo_url: Option<&str>,
        content: &str,
        image_url: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<i64, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation(
                "post content cannot be empty".to_string(),
            ));
        }

        let tags_json = match tags {
            Some(tags) => {
                Some(serde_json::to_string(tags).map_err(|e| AppError::Internal(e.into()))?)
            }
            None => None,
        };

        // Plain execute: the call returns only after the statement has
        // fully run and committed, so the new row is visible to every
        // pooled connection by the time the id is handed back.
        let started = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO posts (author_id, author_name, author_photo_url, content, image_url, tags)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(author_id)
        .bind(author_name)
        .bind(author_photo_url)
        .bind(content)
        .bind(image_url)
        .bind(tags_json)
        .execute(&self.pool)
        .await?;
        crate::metrics::observe_db_query("insert", "posts", started.elapsed());

        Ok(result.last_insert_rowid())
    }

    /// List all posts, newest first.
    ///
    /// Ties on the second-resolution timestamp are broken by id, which
    /// is monotonic per insert.
    pub async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        let started = Instant::now();
        let posts = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        crate::metrics::observe_db_query("select", "posts", started.elapsed());

        Ok(posts)
    }

    /// List posts whose tag set contains `tag`, newest first.
    ///
    /// Matching is exact against the stored values; tags are normalized
    /// to lowercase before storage.
    pub async fn list_posts_by_tag(&self, tag: &str) -> Result<Vec<Post>, AppError> {
        let started = Instant::now();
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT * FROM posts
            WHERE tags IS NOT NULL
              AND EXISTS (SELECT 1 FROM json_each(posts.tags) WHERE json_each.value = ?)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(tag)
        .fetch_all(&self.pool)
        .await?;
        crate::metrics::observe_db_query("select", "posts", started.elapsed());

        Ok(posts)
    }

    /// Delete a post, restricted to its author.
    ///
    /// Ownership is enforced in the delete predicate itself; dependent
    /// comments and likes are removed by cascade.
    ///
    /// # Returns
    /// `true` if a row was removed, `false` for a missing post or a
    /// non-author requester (a no-op, not an error)
    pub async fn delete_post(&self, post_id: i64, requester_id: &str) -> Result<bool, AppError> {
        let started = Instant::now();
        let result = sqlx::query("DELETE FROM posts WHERE id = ? AND author_id = ?")
            .bind(post_id)
            .bind(requester_id)
            .execute(&self.pool)
            .await?;
        crate::metrics::observe_db_query("delete", "posts", started.elapsed());

        Ok(result.rows_affected() > 0)
    }

    /// Fetch a single post.
    pub async fn get_post(&self, post_id: i64) -> Result<Option<Post>, AppError> {
        let started = Instant::now();
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        crate::metrics::observe_db_query("select", "posts", started.elapsed());

        Ok(post)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Create a comment and bump the parent's comment count.
    ///
    /// Both writes are one transaction: a missing post fails the insert
    /// on the foreign key and rolls everything back, so no orphan
    /// comment or stale counter can be observed.
    ///
    /// # Returns
    /// The generated comment id
    pub async fn create_comment(
        &self,
        post_id: i64,
        author_id: &str,
        author_name: &str,
        author_photo_url: Option<&str>,
        content: &str,
    ) -> Result<i64, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation(
                "comment content cannot be empty".to_string(),
            ));
        }

        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        let comment_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO comments (post_id, author_id, author_name, author_photo_url, content)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(author_name)
        .bind(author_photo_url)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        crate::metrics::observe_db_query("insert", "comments", started.elapsed());

        Ok(comment_id)
    }

    /// List comments for a post, oldest first (conversational order).
    pub async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let started = Instant::now();
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE post_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        crate::metrics::observe_db_query("select", "comments", started.elapsed());

        Ok(comments)
    }

    /// Delete a comment and decrement the parent's comment count.
    ///
    /// The delete carries the author check in its predicate and returns
    /// the parent post id, so the ownership verification, the removal,
    /// and the counter update form one atomic unit.
    ///
    /// # Returns
    /// `true` if removed, `false` for a missing comment or non-author
    /// requester (nothing changes)
    pub async fn delete_comment(
        &self,
        comment_id: i64,
        requester_id: &str,
    ) -> Result<bool, AppError> {
        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        let post_id: Option<i64> = sqlx::query_scalar(
            "DELETE FROM comments WHERE id = ? AND author_id = ? RETURNING post_id",
        )
        .bind(comment_id)
        .bind(requester_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(post_id) = post_id else {
            // Nothing matched; dropping the transaction rolls it back.
            return Ok(false);
        };

        sqlx::query("UPDATE posts SET comment_count = comment_count - 1 WHERE id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        crate::metrics::observe_db_query("delete", "comments", started.elapsed());

        Ok(true)
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Atomically flip the liked state for a (post, user) pair and
    /// adjust the post's like count.
    ///
    /// The conditional insert is deliberately the first statement of the
    /// transaction: it takes the write lock before any read, so two
    /// racing toggles for the same pair serialize there instead of both
    /// observing the same state. The UNIQUE (post_id, user_id)
    /// constraint remains as a backstop. Toggles for different users
    /// queue on the busy timeout and each adjust the counter by exactly
    /// one.
    ///
    /// # Returns
    /// The new liked state: `true` after a like, `false` after an unlike
    pub async fn toggle_like(&self, post_id: i64, user_id: &str) -> Result<bool, AppError> {
        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO likes (post_id, user_id)
            VALUES (?, ?)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let liked = if inserted > 0 {
            sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE id = ?")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
            true
        } else {
            sqlx::query("DELETE FROM likes WHERE post_id = ? AND user_id = ?")
                .bind(post_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE posts SET like_count = like_count - 1 WHERE id = ?")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
            false
        };

        tx.commit().await?;
        crate::metrics::observe_db_query("toggle", "likes", started.elapsed());

        Ok(liked)
    }

    /// Whether `user_id` currently likes `post_id`.
    ///
    /// Pure committed-state read, no side effects.
    pub async fn check_liked(&self, post_id: i64, user_id: &str) -> Result<bool, AppError> {
        let started = Instant::now();
        let liked: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE post_id = ? AND user_id = ?)",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        crate::metrics::observe_db_query("select", "likes", started.elapsed());

        Ok(liked)
    }

    /// Count like rows for a post directly from the child table.
    ///
    /// Used by tests to verify the denormalized counter; reads go
    /// through `like_count` everywhere else.
    pub async fn count_like_rows(&self, post_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
