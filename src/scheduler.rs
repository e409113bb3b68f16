use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

use crate::state::AppState;

/// Every ten minutes, on the minute
const MAINTENANCE_CRON: &str = "0 */10 * * * *";

/// Initialize and start the maintenance scheduler
pub async fn start_scheduler(state: Arc<AppState>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(MAINTENANCE_CRON, move |_uuid, _l| {
        let state = Arc::clone(&state);
        Box::pin(async move {
            run_maintenance(&state).await;
        })
    })?;
    scheduler.add(job).await?;

    scheduler.start().await?;
    info!("✓ Scheduler started (maintenance cron: {})", MAINTENANCE_CRON);

    Ok(scheduler)
}

/// Drop expired sessions and elapsed login-throttle windows
pub async fn run_maintenance(state: &AppState) {
    let sessions = state.sessions.purge_expired().await;
    let windows = state.limiter.purge_stale().await;

    if sessions > 0 || windows > 0 {
        info!(
            "Maintenance purged {} expired session(s), {} throttle window(s)",
            sessions, windows
        );
    } else {
        debug!("Maintenance found nothing to purge");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::MemoryStore;
    use crate::metrics::TierMetrics;
    use crate::translation::FallbackTranslator;

    fn test_state(config: Config) -> Arc<AppState> {
        let metrics = Arc::new(TierMetrics::new());
        let translator =
            FallbackTranslator::from_config(&config, metrics.clone()).expect("translator");
        AppState::new(config, Arc::new(MemoryStore::new()), translator, metrics)
    }

    #[tokio::test]
    async fn test_maintenance_keeps_live_sessions() {
        let state = test_state(Config::default());
        let token = state.sessions.create("ravi").await;

        run_maintenance(&state).await;

        assert_eq!(state.sessions.lookup(&token).await.as_deref(), Some("ravi"));
    }

    #[tokio::test]
    async fn test_maintenance_purges_expired_sessions() {
        let config = Config {
            session_ttl_hours: 0,
            ..Config::default()
        };
        let state = test_state(config);
        state.sessions.create("ravi").await;
        assert_eq!(state.sessions.len().await, 1);

        run_maintenance(&state).await;

        assert_eq!(state.sessions.len().await, 0);
    }

    #[test]
    fn test_maintenance_cron_is_valid() {
        // Six fields: second minute hour day month weekday
        assert_eq!(MAINTENANCE_CRON.split_whitespace().count(), 6);
    }
}
