//! Bearer-token authentication.
//!
//! Tokens are opaque random identifiers backed by an in-memory session table.
//! Access and refresh tokens are issued in pairs; redeeming the refresh token
//! retires both halves of its pair and the caller issues a fresh one.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::cache::expiry;
use crate::error::{ApiError, ApiResult};
use crate::http::Headers;

/// Authorization role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::User => "user",
            Role::Admin => "admin",
        })
    }
}

/// The authenticated caller, stored in the request context by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Resolves a bearer token into a [`Principal`].
pub trait Authenticator: Send + Sync {
    /// Fails with [`ApiError::Unauthorized`] for unknown or expired tokens.
    fn authenticate(&self, token: &str) -> ApiResult<Principal>;
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &Headers) -> Option<&str> {
    let value = headers.get("authorization")?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// SHA-256 rounds applied to every password digest.
const DIGEST_ROUNDS: u32 = 10_000;

/// Digests `password` with a fresh random salt. The result is `salt$hex-digest`.
///
/// Iterated salted SHA-256 is what this in-memory demo affords; it is not a
/// substitute for a memory-hard password hash.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = digest(&salt, password);
    format!("{salt}${digest}")
}

/// Checks `password` against a value produced by [`hash_password`].
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let actual = digest(salt, password);
    actual.len() == expected.len()
        && actual
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    let mut state = hasher.finalize();
    for _ in 1..DIGEST_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(state);
        hasher.update(password.as_bytes());
        state = hasher.finalize();
    }
    hex::encode(state)
}

/// An access/refresh token pair as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone)]
struct Session {
    principal: Principal,
    kind: TokenKind,
    /// Shared by the access and refresh token issued together.
    pair: Uuid,
    expires_at: Instant,
}

/// In-memory session table for issued tokens.
pub struct TokenService {
    sessions: Mutex<HashMap<String, Session>>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issues a new access/refresh pair for `principal`.
    ///
    /// Expired sessions are swept out first, so the table holds at most the
    /// pairs that are still live.
    pub fn issue(&self, principal: &Principal) -> TokenPair {
        let now = Instant::now();
        let pair_id = Uuid::new_v4();
        let tokens = TokenPair {
            access_token: Uuid::new_v4().simple().to_string(),
            refresh_token: Uuid::new_v4().simple().to_string(),
        };
        let session = |kind, ttl| Session {
            principal: principal.clone(),
            kind,
            pair: pair_id,
            expires_at: expiry(now, ttl),
        };

        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        let swept = before - sessions.len();
        sessions.insert(
            tokens.access_token.clone(),
            session(TokenKind::Access, self.access_ttl),
        );
        sessions.insert(
            tokens.refresh_token.clone(),
            session(TokenKind::Refresh, self.refresh_ttl),
        );
        debug!(user_id = %principal.user_id, swept, "issued token pair");
        tokens
    }

    /// Consumes a refresh token, retires the access token issued with it,
    /// and returns the user the pair belonged to.
    pub fn redeem_refresh(&self, refresh_token: &str) -> ApiResult<Uuid> {
        let session = self.take(refresh_token, TokenKind::Refresh)?;
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, s| s.pair != session.pair);
        Ok(session.principal.user_id)
    }

    /// Drops every session belonging to `user_id`.
    pub fn revoke_user(&self, user_id: Uuid) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, session| session.principal.user_id != user_id);
    }

    /// Number of live (not yet pruned) sessions.
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, token: &str, kind: TokenKind) -> ApiResult<Session> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if !sessions.get(token).is_some_and(|s| s.kind == kind) {
            return Err(ApiError::unauthorized("Invalid token"));
        }
        let Some(session) = sessions.remove(token) else {
            return Err(ApiError::unauthorized("Invalid token"));
        };
        if Instant::now() > session.expires_at {
            return Err(ApiError::unauthorized("Token expired"));
        }
        Ok(session)
    }
}

impl Authenticator for TokenService {
    fn authenticate(&self, token: &str) -> ApiResult<Principal> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(session) = sessions.get(token) else {
            return Err(ApiError::unauthorized("Invalid token"));
        };
        if session.kind != TokenKind::Access {
            return Err(ApiError::unauthorized("Invalid token"));
        }
        if Instant::now() > session.expires_at {
            sessions.remove(token);
            return Err(ApiError::unauthorized("Token expired"));
        }
        Ok(session.principal.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            email: "user@test.com".into(),
            role,
        }
    }

    fn service() -> TokenService {
        TokenService::new(Duration::from_secs(60), Duration::from_secs(600))
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = Headers::new();
        assert_eq!(bearer_token(&headers), None);

        headers.set("Authorization", "Bearer abc123");
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.set("Authorization", "bearer   xyz ");
        assert_eq!(bearer_token(&headers), Some("xyz"));

        headers.set("Authorization", "Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), None);

        headers.set("Authorization", "Bearer ");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn password_round_trip() {
        let stored = hash_password("password123");
        assert!(verify_password("password123", &stored));
        assert!(!verify_password("password124", &stored));
        assert!(!verify_password("password123", "garbage"));
    }

    #[test]
    fn digest_is_iterated() {
        let stored = hash_password("password123");
        let (salt, digest) = stored.split_once('$').unwrap();

        let mut once = Sha256::new();
        once.update(format!("{salt}:password123").as_bytes());
        assert_ne!(digest, hex::encode(once.finalize()));
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn same_password_gets_different_salts() {
        assert_ne!(hash_password("secret"), hash_password("secret"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::from_str::<Role>("\"user\"").unwrap(), Role::User);
    }

    #[tokio::test]
    async fn access_token_authenticates() {
        let tokens = service();
        let who = principal(Role::Admin);
        let pair = tokens.issue(&who);

        assert_eq!(tokens.authenticate(&pair.access_token).unwrap(), who);
        assert!(tokens.authenticate(&pair.refresh_token).is_err());
        assert!(tokens.authenticate("nope").is_err());
    }

    #[tokio::test]
    async fn refresh_token_is_single_use() {
        let tokens = service();
        let who = principal(Role::User);
        let pair = tokens.issue(&who);

        assert!(tokens.redeem_refresh(&pair.access_token).is_err());
        assert_eq!(tokens.redeem_refresh(&pair.refresh_token).unwrap(), who.user_id);
        assert!(tokens.redeem_refresh(&pair.refresh_token).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_access_token_is_rejected_and_pruned() {
        let tokens = service();
        let pair = tokens.issue(&principal(Role::User));
        assert_eq!(tokens.len(), 2);

        tokio::time::advance(Duration::from_secs(61)).await;

        let err = tokens.authenticate(&pair.access_token).unwrap_err();
        assert_eq!(err.to_string(), "Token expired");
        assert_eq!(tokens.len(), 1);
        assert!(tokens.redeem_refresh(&pair.refresh_token).is_ok());
    }

    #[tokio::test]
    async fn redeeming_refresh_retires_its_access_token() {
        let tokens = service();
        let who = principal(Role::User);
        let first = tokens.issue(&who);
        let other = tokens.issue(&who);

        tokens.redeem_refresh(&first.refresh_token).unwrap();

        assert!(tokens.authenticate(&first.access_token).is_err());
        assert!(tokens.authenticate(&other.access_token).is_ok());
        assert_eq!(tokens.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn issuing_sweeps_expired_sessions() {
        let tokens = TokenService::new(Duration::from_secs(1), Duration::from_secs(2));
        for _ in 0..1000 {
            tokens.issue(&principal(Role::User));
        }
        assert_eq!(tokens.len(), 2000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        tokens.issue(&principal(Role::User));

        assert_eq!(tokens.len(), 2);
    }

    #[tokio::test]
    async fn huge_ttls_do_not_overflow() {
        let tokens = TokenService::new(Duration::MAX, Duration::MAX);
        let pair = tokens.issue(&principal(Role::User));
        assert!(tokens.authenticate(&pair.access_token).is_ok());
    }

    #[tokio::test]
    async fn revoke_user_drops_sessions() {
        let tokens = service();
        let who = principal(Role::User);
        let pair = tokens.issue(&who);
        tokens.issue(&principal(Role::Admin));

        tokens.revoke_user(who.user_id);

        assert!(tokens.authenticate(&pair.access_token).is_err());
        assert_eq!(tokens.len(), 2);
    }
}
