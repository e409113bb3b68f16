//! Session gate: password hashing, cookie sessions and login throttling.
//!
//! Handlers only ever see the outcome of the gate: a username through the
//! [`CurrentUser`] / [`MaybeUser`] extractors. Credential storage, hashing
//! and cookie mechanics stay in this module.

use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sid";

const MIN_PASSWORD_LEN: usize = 6;

// ==================== Passwords ====================

/// Hash a password into a PHC string (Argon2id, random salt)
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").expect("valid regex"))
}

/// Check signup credentials, returning the trimmed username
pub fn validate_credentials(username: &str, password: &str) -> Result<String, AppError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }
    if !username_pattern().is_match(username) {
        return Err(AppError::Validation(
            "Username must be 3-32 characters of letters, digits, '_', '.' or '-'".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(username.to_string())
}

// ==================== Sessions ====================

#[derive(Debug, Clone)]
struct Session {
    username: String,
    expires_at: DateTime<Utc>,
}

/// Server-side sessions keyed by an opaque random token
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session and return its token
    pub async fn create(&self, username: &str) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let session = Session {
            username: username.to_string(),
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    pub async fn lookup(&self, token: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.username.clone())
    }

    pub async fn destroy(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Drop expired sessions, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn current_username(&self, headers: &HeaderMap) -> Option<String> {
        let token = session_token(headers)?;
        self.lookup(&token).await
    }

    pub async fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        self.current_username(headers).await.is_some()
    }

    #[cfg(test)]
    async fn expire_all(&self) {
        let past = Utc::now() - Duration::seconds(1);
        for session in self.sessions.write().await.values_mut() {
            session.expires_at = past;
        }
    }
}

/// Extract the session token from the Cookie header(s)
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        ttl.num_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

// ==================== Extractors ====================

/// Username of an authenticated caller; rejects with 401 otherwise
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

/// Username when a valid session is present
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<String>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        state
            .sessions
            .current_username(&parts.headers)
            .await
            .map(CurrentUser)
            .ok_or_else(AppError::not_logged_in)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(state.sessions.current_username(&parts.headers).await))
    }
}

// ==================== Login throttling ====================

/// Fixed-window counter of failed logins per client key
pub struct LoginLimiter {
    max_failures: u32,
    window: std::time::Duration,
    windows: Mutex<HashMap<String, (Instant, u32)>>,
}

impl LoginLimiter {
    pub fn new(max_failures: u32, window: std::time::Duration) -> Self {
        Self {
            max_failures,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Whether another attempt from `key` is allowed right now
    pub async fn check(&self, key: &str) -> bool {
        let windows = self.windows.lock().await;
        match windows.get(key) {
            Some((started, failures)) if started.elapsed() < self.window => {
                *failures < self.max_failures
            }
            _ => true,
        }
    }

    pub async fn record_failure(&self, key: &str) {
        let mut windows = self.windows.lock().await;
        let entry = windows.entry(key.to_string()).or_insert((Instant::now(), 0));
        if entry.0.elapsed() >= self.window {
            *entry = (Instant::now(), 0);
        }
        entry.1 += 1;
    }

    pub async fn reset(&self, key: &str) {
        self.windows.lock().await.remove(key);
    }

    /// Forget windows that have already elapsed
    pub async fn purge_stale(&self) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, (started, _)| started.elapsed() < self.window);
        before - windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    // ==================== Password Tests ====================

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("secret123").expect("Should hash");

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret123", &hash));
        assert!(!verify_password("secret124", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("secret123").unwrap();
        let second = hash_password("secret123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_against_garbage_hash() {
        assert!(!verify_password("secret123", "not-a-phc-string"));
        assert!(!verify_password("secret123", ""));
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_validate_credentials_trims_username() {
        let username = validate_credentials("  ravi_k  ", "secret123").expect("valid");
        assert_eq!(username, "ravi_k");
    }

    #[test]
    fn test_validate_credentials_rejects_missing_fields() {
        assert!(validate_credentials("", "secret123").is_err());
        assert!(validate_credentials("ravi", "").is_err());
        assert!(validate_credentials("   ", "secret123").is_err());
    }

    #[test]
    fn test_validate_credentials_rejects_bad_usernames() {
        assert!(validate_credentials("ab", "secret123").is_err());
        assert!(validate_credentials("has space", "secret123").is_err());
        assert!(validate_credentials("x".repeat(33).as_str(), "secret123").is_err());
        assert!(validate_credentials("రవి", "secret123").is_err());
    }

    #[test]
    fn test_validate_credentials_rejects_short_password() {
        let error = validate_credentials("ravi", "12345").unwrap_err();
        assert!(error.to_string().contains("at least 6"));
    }

    // ==================== Session Tests ====================

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let sessions = SessionStore::new(Duration::hours(1));
        let token = sessions.create("ravi").await;

        assert_eq!(sessions.lookup(&token).await.as_deref(), Some("ravi"));
        assert!(sessions.destroy(&token).await);
        assert!(sessions.lookup(&token).await.is_none());
        assert!(!sessions.destroy(&token).await);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let sessions = SessionStore::new(Duration::hours(1));
        let a = sessions.create("ravi").await;
        let b = sessions.create("ravi").await;
        assert_ne!(a, b);
        assert_eq!(sessions.len().await, 2);
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_purged() {
        let sessions = SessionStore::new(Duration::hours(1));
        let token = sessions.create("ravi").await;
        sessions.expire_all().await;
        let fresh = sessions.create("sita").await;

        assert!(sessions.lookup(&token).await.is_none());
        assert_eq!(sessions.purge_expired().await, 1);
        assert_eq!(sessions.lookup(&fresh).await.as_deref(), Some("sita"));
    }

    #[tokio::test]
    async fn test_gate_reads_cookie_header() {
        let sessions = SessionStore::new(Duration::hours(1));
        let token = sessions.create("ravi").await;

        let headers = headers_with_cookie(&format!("theme=dark; sid={}; lang=te", token));
        assert!(sessions.is_authenticated(&headers).await);
        assert_eq!(
            sessions.current_username(&headers).await.as_deref(),
            Some("ravi")
        );

        assert!(!sessions.is_authenticated(&HeaderMap::new()).await);
        assert!(!sessions.is_authenticated(&headers_with_cookie("sid=unknown")).await);
    }

    #[test]
    fn test_session_token_parsing() {
        assert_eq!(
            session_token(&headers_with_cookie("sid=abc")).as_deref(),
            Some("abc")
        );
        assert!(session_token(&headers_with_cookie("sid=")).is_none());
        assert!(session_token(&headers_with_cookie("other=abc")).is_none());
        assert!(session_token(&headers_with_cookie("xsid=abc")).is_none());
    }

    #[test]
    fn test_session_cookie_format() {
        let cookie = session_cookie("abc", Duration::hours(2), false);
        assert!(cookie.starts_with("sid=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
        assert!(!cookie.contains("Secure"));

        assert!(session_cookie("abc", Duration::hours(2), true).ends_with("; Secure"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    // ==================== Limiter Tests ====================

    #[tokio::test]
    async fn test_limiter_blocks_after_max_failures() {
        let limiter = LoginLimiter::new(3, std::time::Duration::from_secs(60));

        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1").await);
            limiter.record_failure("10.0.0.1").await;
        }

        assert!(!limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_limiter_reset_clears_failures() {
        let limiter = LoginLimiter::new(1, std::time::Duration::from_secs(60));
        limiter.record_failure("ip").await;
        assert!(!limiter.check("ip").await);

        limiter.reset("ip").await;
        assert!(limiter.check("ip").await);
    }

    #[tokio::test]
    async fn test_limiter_window_expires() {
        let limiter = LoginLimiter::new(1, std::time::Duration::from_millis(20));
        limiter.record_failure("ip").await;
        assert!(!limiter.check("ip").await);

        tokio::time::sleep(std::time::Duration::from_millis(40)).await;

        assert!(limiter.check("ip").await);
        assert_eq!(limiter.purge_stale().await, 1);
    }
}
