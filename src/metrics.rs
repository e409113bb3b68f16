//! Counters describing which fallback tier served each translated line.
//!
//! One instance is owned by the application state and shared with the
//! translator; there is no process-wide singleton.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::translation::Tier;

#[derive(Debug, Default)]
pub struct TierMetrics {
    /// Submissions that contained at least one non-blank line
    translations: AtomicUsize,

    /// Calls made to external providers (each retry counts)
    provider_attempts: AtomicUsize,

    /// Provider calls that ended in an error
    provider_failures: AtomicUsize,

    /// Lines served by an external provider
    provider_lines: AtomicUsize,

    dictionary_exact: AtomicUsize,
    dictionary_partial: AtomicUsize,

    /// Lines no tier could translate
    unavailable: AtomicUsize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub translations: usize,
    pub provider_attempts: usize,
    pub provider_failures: usize,
    pub provider_lines: usize,
    pub dictionary_exact: usize,
    pub dictionary_partial: usize,
    pub unavailable: usize,
    pub provider_success_rate: f64,
}

impl TierMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_translation(&self) {
        self.translations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_attempt(&self) {
        self.provider_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Count the tier that resolved one line
    pub fn record_line(&self, tier: &Tier) {
        let counter = match tier {
            Tier::Provider(_) => &self.provider_lines,
            Tier::DictionaryExact => &self.dictionary_exact,
            Tier::DictionaryPartial => &self.dictionary_partial,
            Tier::Unavailable => &self.unavailable,
            Tier::Empty => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        let attempts = self.provider_attempts.load(Ordering::Relaxed);
        let failures = self.provider_failures.load(Ordering::Relaxed);
        let provider_success_rate = if attempts > 0 {
            (attempts.saturating_sub(failures) as f64 / attempts as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            translations: self.translations.load(Ordering::Relaxed),
            provider_attempts: attempts,
            provider_failures: failures,
            provider_lines: self.provider_lines.load(Ordering::Relaxed),
            dictionary_exact: self.dictionary_exact.load(Ordering::Relaxed),
            dictionary_partial: self.dictionary_partial.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            provider_success_rate,
        }
    }
}
