use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::auth::{LoginLimiter, SessionStore};
use crate::config::Config;
use crate::db::{MemoryStore, PgStore, UserStore};
use crate::metrics::TierMetrics;
use crate::recorder::Recorder;
use crate::translation::FallbackTranslator;

/// Everything request handlers share
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UserStore>,
    pub recorder: Recorder,
    pub sessions: SessionStore,
    pub limiter: LoginLimiter,
    pub translator: FallbackTranslator,
    pub metrics: Arc<TierMetrics>,
}

impl AppState {
    /// Connect to the configured store and build the translator chain
    pub async fn from_config(config: Config) -> Result<Arc<Self>> {
        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                info!("Connecting to PostgreSQL");
                Arc::new(PgStore::connect(url).await?)
            }
            None => {
                info!("DATABASE_URL not set, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let metrics = Arc::new(TierMetrics::new());
        let translator = FallbackTranslator::from_config(&config, metrics.clone())?;

        Ok(Self::new(config, store, translator, metrics))
    }

    pub fn new(
        config: Config,
        store: Arc<dyn UserStore>,
        translator: FallbackTranslator,
        metrics: Arc<TierMetrics>,
    ) -> Arc<Self> {
        let recorder = Recorder::new(store.clone(), config.history_cap);
        let sessions = SessionStore::new(chrono::Duration::hours(config.session_ttl_hours));
        let limiter = LoginLimiter::new(
            config.login_max_attempts,
            Duration::from_secs(config.login_window_secs),
        );

        Arc::new(Self {
            config,
            store,
            recorder,
            sessions,
            limiter,
            translator,
            metrics,
        })
    }
}
