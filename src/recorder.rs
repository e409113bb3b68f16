use std::sync::Arc;
use tracing::{debug, info};

use crate::db::UserStore;
use crate::error::AppError;
use crate::records::{HistoryOutcome, ListName, SavedOutcome, TranslationRecord, User};

/// Applies list rules to stored user documents (load, mutate, save)
#[derive(Clone)]
pub struct Recorder {
    store: Arc<dyn UserStore>,
    history_cap: usize,
}

impl Recorder {
    pub fn new(store: Arc<dyn UserStore>, history_cap: usize) -> Self {
        Self { store, history_cap }
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    async fn load(&self, username: &str) -> Result<User, AppError> {
        self.store
            .find_user(username)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    pub async fn record_history(
        &self,
        username: &str,
        source: &str,
        target: &str,
    ) -> Result<HistoryOutcome, AppError> {
        let mut user = self.load(username).await?;
        let outcome = user.record_history(TranslationRecord::new(source, target), self.history_cap);

        match outcome {
            HistoryOutcome::Inserted => {
                self.store.save_user(&user).await?;
                debug!("Recorded history entry for {}", username);
            }
            HistoryOutcome::Duplicate => {
                debug!("History already holds this pair for {}", username);
            }
        }
        Ok(outcome)
    }

    pub async fn record_saved(
        &self,
        username: &str,
        source: &str,
        target: &str,
    ) -> Result<SavedOutcome, AppError> {
        let mut user = self.load(username).await?;
        let outcome = user.record_saved(TranslationRecord::new(source, target));

        if outcome == SavedOutcome::Saved {
            self.store.save_user(&user).await?;
            info!("{} saved a translation ({} saved)", username, user.saved.len());
        }
        Ok(outcome)
    }

    pub async fn list(
        &self,
        username: &str,
        list: ListName,
    ) -> Result<Vec<TranslationRecord>, AppError> {
        let user = self.load(username).await?;
        Ok(user.list(list).to_vec())
    }

    pub async fn delete_one(
        &self,
        username: &str,
        list: ListName,
        index: i64,
    ) -> Result<TranslationRecord, AppError> {
        let mut user = self.load(username).await?;
        let removed = user.delete_one(list, index)?;
        self.store.save_user(&user).await?;
        Ok(removed)
    }

    pub async fn clear_all(&self, username: &str, list: ListName) -> Result<(), AppError> {
        let mut user = self.load(username).await?;
        if user.list(list).is_empty() {
            return Ok(());
        }
        user.clear_all(list);
        self.store.save_user(&user).await?;
        info!("Cleared {} list for {}", list, username);
        Ok(())
    }
}
