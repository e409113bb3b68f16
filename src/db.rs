use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::records::{TranslationRecord, User};

/// Document-style persistence for user records.
///
/// Each user is read and written as a whole document. There is no
/// optimistic concurrency: two writers racing on the same user lose one
/// update (last write wins).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Returns false when the username is taken.
    async fn create_user(&self, user: &User) -> Result<bool>;

    async fn find_user(&self, username: &str) -> Result<Option<User>>;

    /// Replace the stored lists of an existing user
    async fn save_user(&self, user: &User) -> Result<()>;

    /// Short name for logs and the health endpoint
    fn kind(&self) -> &'static str;
}

/// Process-local store used when no database is configured
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<bool> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Ok(false);
        }
        users.insert(user.username.clone(), user.clone());
        Ok(true)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(&user.username)
            .with_context(|| format!("User {} does not exist", user.username))?;
        stored.history = user.history.clone();
        stored.saved = user.saved.clone();
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

/// PostgreSQL store keeping both lists as JSONB columns of the user row
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

type UserRow = (
    String,
    String,
    Json<Vec<TranslationRecord>>,
    Json<Vec<TranslationRecord>>,
);

impl PgStore {
    /// Connect and create the users table if needed
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                history JSONB NOT NULL DEFAULT '[]'::jsonb,
                saved JSONB NOT NULL DEFAULT '[]'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&pool)
        .await
        .context("Failed to create users table")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, history, saved)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(Json(&user.history))
        .bind(Json(&user.saved))
        .execute(&self.pool)
        .await
        .context("Failed to insert user")?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT username, password_hash, history, saved FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load user")?;

        Ok(row.map(|(username, password_hash, history, saved)| User {
            username,
            password_hash,
            history: history.0,
            saved: saved.0,
        }))
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query("UPDATE users SET history = $2, saved = $3 WHERE username = $1")
            .bind(&user.username)
            .bind(Json(&user.history))
            .bind(Json(&user.saved))
            .execute(&self.pool)
            .await
            .context("Failed to save user")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("User {} does not exist", user.username);
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}
