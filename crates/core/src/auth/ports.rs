//! Port interfaces for user and token persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_domain::{Result, User};
use uuid::Uuid;

/// Stored credentials for one user
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    /// `salt$digest`, both hex encoded
    pub password_hash: String,
}

/// One issued token pair with its expiries
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub revoked: bool,
}

/// Trait for persisting users
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user with the given password hash
    async fn create(&self, user: &User, password_hash: &str) -> Result<()>;

    /// Look up a user and their stored hash by username
    async fn find_by_username(&self, username: &str) -> Result<Option<UserCredentials>>;
}

/// Trait for persisting issued token pairs
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Store a freshly issued token pair
    async fn insert(&self, record: &TokenRecord) -> Result<()>;

    /// Look up a token pair by its access token
    async fn find_by_access(&self, access_token: &str) -> Result<Option<TokenRecord>>;

    /// Look up a token pair by its refresh token
    async fn find_by_refresh(&self, refresh_token: &str) -> Result<Option<TokenRecord>>;

    /// Replace the access token on an existing pair (refresh flow)
    async fn rotate_access(
        &self,
        refresh_token: &str,
        access_token: &str,
        access_expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Revoke the pair holding this refresh token; returns whether a
    /// live pair was found
    async fn revoke_by_refresh(&self, refresh_token: &str) -> Result<bool>;
}
