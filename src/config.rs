use anyhow::{Context, Result};
use std::str::FromStr;

/// Upper bound for SESSION_TTL_HOURS (one year)
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub static_dir: String,

    // Storage (in-memory store when unset)
    pub database_url: Option<String>,
    pub history_cap: usize,

    // Sessions
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,

    // Login rate limiting
    pub login_max_attempts: u32,
    pub login_window_secs: u64,

    // Translation
    pub source_language: String,
    pub target_language: String,
    pub mymemory_api_url: String,
    pub google_translate_url: String,
    pub libretranslate_url: String,
    pub libretranslate_api_key: Option<String>,
    pub provider_timeout_secs: u64,
    pub provider_max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: "public".to_string(),
            database_url: None,
            history_cap: 5,
            session_ttl_hours: 24,
            cookie_secure: false,
            login_max_attempts: 5,
            login_window_secs: 15 * 60,
            source_language: "en".to_string(),
            target_language: "te".to_string(),
            mymemory_api_url: "https://api.mymemory.translated.net/get".to_string(),
            google_translate_url: "https://translate.googleapis.com/translate_a/single"
                .to_string(),
            libretranslate_url: "https://libretranslate.com/translate".to_string(),
            libretranslate_api_key: None,
            provider_timeout_secs: 10,
            provider_max_attempts: 1,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            port: parsed_var("PORT", defaults.port)?,
            static_dir: std::env::var("STATIC_DIR").unwrap_or(defaults.static_dir),

            database_url: optional_var("DATABASE_URL"),
            history_cap: parsed_var("HISTORY_CAP", defaults.history_cap)?,

            session_ttl_hours: parsed_var("SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            cookie_secure: parsed_var("COOKIE_SECURE", defaults.cookie_secure)?,

            login_max_attempts: parsed_var("LOGIN_MAX_ATTEMPTS", defaults.login_max_attempts)?,
            login_window_secs: parsed_var("LOGIN_WINDOW_SECS", defaults.login_window_secs)?,

            source_language: std::env::var("SOURCE_LANGUAGE").unwrap_or(defaults.source_language),
            target_language: std::env::var("TARGET_LANGUAGE").unwrap_or(defaults.target_language),
            mymemory_api_url: std::env::var("MYMEMORY_API_URL")
                .unwrap_or(defaults.mymemory_api_url),
            google_translate_url: std::env::var("GOOGLE_TRANSLATE_URL")
                .unwrap_or(defaults.google_translate_url),
            libretranslate_url: std::env::var("LIBRETRANSLATE_URL")
                .unwrap_or(defaults.libretranslate_url),
            libretranslate_api_key: optional_var("LIBRETRANSLATE_API_KEY"),
            provider_timeout_secs: parsed_var(
                "PROVIDER_TIMEOUT_SECS",
                defaults.provider_timeout_secs,
            )?,
            provider_max_attempts: parsed_var(
                "PROVIDER_MAX_ATTEMPTS",
                defaults.provider_max_attempts,
            )?,
        };

        if config.history_cap == 0 {
            anyhow::bail!("HISTORY_CAP must be at least 1");
        }
        if config.provider_max_attempts == 0 {
            anyhow::bail!("PROVIDER_MAX_ATTEMPTS must be at least 1");
        }
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&config.session_ttl_hours) {
            anyhow::bail!(
                "SESSION_TTL_HOURS must be between 1 and {}",
                MAX_SESSION_TTL_HOURS
            );
        }
        if config.login_max_attempts == 0 {
            anyhow::bail!("LOGIN_MAX_ATTEMPTS must be at least 1");
        }

        Ok(config)
    }
}

/// Read a variable, treating empty values as unset
fn optional_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse a variable, falling back to `default` when unset
fn parsed_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}
