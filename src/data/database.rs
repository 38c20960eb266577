//! SQLite database operations
//!
//! All database access goes through this module. The `Database` handle is
//! constructed once at startup and shared via `AppState`; handlers never
//! open their own connections.

use chrono::Utc;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;
use crate::metrics::DB_QUERIES_TOTAL;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to the SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Look up a user by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        DB_QUERIES_TOTAL.with_label_values(&["select", "users"]).inc();

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? LIMIT 1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Resolve the user record for an OAuth profile, creating it on first login
    ///
    /// Lookup is by email; repeated logins for the same email return the
    /// existing record rather than inserting a duplicate.
    pub async fn find_or_create_user(
        &self,
        email: &str,
        linkedin_id: &str,
        name: Option<&str>,
        picture_url: Option<&str>,
    ) -> Result<User, AppError> {
        if let Some(user) = self.get_user_by_email(email).await? {
            return Ok(user);
        }

        let now = Utc::now();
        let user = User {
            id: EntityId::new().0,
            email: email.to_string(),
            linkedin_id: linkedin_id.to_string(),
            name: name.map(ToOwned::to_owned),
            picture_url: picture_url.map(ToOwned::to_owned),
            created_at: now,
            updated_at: now,
        };

        DB_QUERIES_TOTAL.with_label_values(&["insert", "users"]).inc();
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, linkedin_id, name, picture_url, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.linkedin_id)
        .bind(&user.name)
        .bind(&user.picture_url)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, "User created");

        Ok(user)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a new post record
    pub async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        DB_QUERIES_TOTAL.with_label_values(&["insert", "posts"]).inc();

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, user_id, theme, post_type, length, tone, brand_context,
                post_text, status, external_post_id, created_at, published_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.user_id)
        .bind(&post.theme)
        .bind(&post.post_type)
        .bind(&post.length)
        .bind(&post.tone)
        .bind(&post.brand_context)
        .bind(&post.post_text)
        .bind(&post.status)
        .bind(&post.external_post_id)
        .bind(post.created_at)
        .bind(post.published_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a post by ID
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        DB_QUERIES_TOTAL.with_label_values(&["select", "posts"]).inc();

        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Mark a post as published
    ///
    /// The owner check is a precondition of the update itself: the statement
    /// only touches rows whose `user_id` matches the caller, so a post owned
    /// by someone else is never mutated.
    ///
    /// # Returns
    /// `true` if a record owned by `user_id` was updated, `false` otherwise
    pub async fn mark_post_published(
        &self,
        post_id: &str,
        user_id: &str,
        external_post_id: Option<&str>,
    ) -> Result<bool, AppError> {
        DB_QUERIES_TOTAL.with_label_values(&["update", "posts"]).inc();

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET status = ?, external_post_id = ?, published_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(PostStatus::Published.as_str())
        .bind(external_post_id)
        .bind(Utc::now())
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
