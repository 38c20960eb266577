//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// An application user, keyed by email
///
/// Created on first successful LinkedIn login, looked up (never
/// duplicated) on subsequent logins.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    /// LinkedIn subject identifier (`sub` claim from userinfo)
    pub linkedin_id: String,
    pub name: Option<String>,
    /// Profile picture URL from LinkedIn
    pub picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Post
// =============================================================================

/// One piece of generated content
///
/// Created as a draft when a generate action succeeds; moved to
/// `published` when a publish action succeeds for the same owner.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    /// Owner (user id)
    pub user_id: String,
    pub theme: String,
    pub post_type: String,
    pub length: String,
    pub tone: String,
    pub brand_context: String,
    /// Generated post text
    pub post_text: String,
    /// Lifecycle status: draft, published
    pub status: String,
    /// Identifier returned by the external publish endpoint
    pub external_post_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Post lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}
