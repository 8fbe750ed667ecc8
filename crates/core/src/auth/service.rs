//! Opaque bearer-token credential service.
//!
//! Tokens are random 256-bit values, stored server-side with expiries;
//! there is no token cryptography. Passwords are stored as salted
//! SHA-256 digests.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use marquee_domain::{MarqueeError, Result, User};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use super::ports::{TokenRecord, TokenRepository, UserRepository};

const ACCESS_TOKEN_TTL_HOURS: i64 = 1;
const REFRESH_TOKEN_TTL_DAYS: i64 = 14;

/// Token pair handed to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Credential service over user and token stores.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenRepository>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<dyn TokenRepository>) -> Self {
        Self { users, tokens }
    }

    /// Register a new user and issue their first token pair.
    pub async fn register(&self, username: &str, password: &str) -> Result<(User, TokenPair)> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(MarqueeError::InvalidInput("username and password are required".into()));
        }

        if self.users.find_by_username(username).await?.is_some() {
            return Err(MarqueeError::InvalidInput("username already exists".into()));
        }

        let user = User { id: Uuid::new_v4(), username: username.to_string() };
        self.users.create(&user, &hash_password(password)).await?;

        info!(username, "user registered");
        let pair = self.issue(user.id).await?;
        Ok((user, pair))
    }

    /// Verify credentials and issue a token pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let credentials = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(password, &credentials.password_hash) {
            return Err(invalid_credentials());
        }

        debug!(username, "login succeeded");
        self.issue(credentials.user.id).await
    }

    /// Exchange a live refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let record = self
            .tokens
            .find_by_refresh(refresh_token)
            .await?
            .ok_or_else(invalid_refresh)?;

        if record.revoked || record.refresh_expires_at <= Utc::now() {
            return Err(invalid_refresh());
        }

        let access_token = generate_token();
        let access_expires_at = access_expiry();
        self.tokens.rotate_access(refresh_token, &access_token, access_expires_at).await?;

        Ok(access_token)
    }

    /// Revoke the pair holding this refresh token.
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        if self.tokens.revoke_by_refresh(refresh_token).await? {
            Ok(())
        } else {
            Err(invalid_refresh())
        }
    }

    /// Resolve a bearer access token to the owning user id.
    pub async fn authenticate(&self, access_token: &str) -> Result<Uuid> {
        let record = self
            .tokens
            .find_by_access(access_token)
            .await?
            .ok_or_else(|| MarqueeError::Auth("invalid or expired access token".into()))?;

        if record.revoked || record.access_expires_at <= Utc::now() {
            return Err(MarqueeError::Auth("invalid or expired access token".into()));
        }

        Ok(record.user_id)
    }

    async fn issue(&self, user_id: Uuid) -> Result<TokenPair> {
        let record = TokenRecord {
            user_id,
            access_token: generate_token(),
            refresh_token: generate_token(),
            access_expires_at: access_expiry(),
            refresh_expires_at: Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS),
            revoked: false,
        };
        self.tokens.insert(&record).await?;

        Ok(TokenPair {
            access_token: record.access_token,
            refresh_token: record.refresh_token,
        })
    }
}

fn invalid_credentials() -> MarqueeError {
    MarqueeError::Auth("invalid username or password".into())
}

fn invalid_refresh() -> MarqueeError {
    MarqueeError::Auth("invalid or expired refresh token".into())
}

fn access_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::hours(ACCESS_TOKEN_TTL_HOURS)
}

/// 256-bit random token, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// `salt$digest` with digest = SHA-256(salt || password).
fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = digest_password(&salt, password);
    format!("{}${}", hex::encode(salt), digest)
}

fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    digest_password(&salt, password) == digest
}

fn digest_password(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
