use anyhow::{Context, Result};
use futures::{stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dictionary::{Dictionary, DictionaryMatch};
use crate::metrics::TierMetrics;
use crate::providers::{default_chain, ProviderError, TranslationProvider};
use crate::retry::{with_retry_if, RetryConfig};

/// Appended to dictionary results that matched only part of the line
pub const PARTIAL_SUFFIX: &str = " (partial match)";

/// Appended to lines that no tier could translate
pub const UNAVAILABLE_SUFFIX: &str = " (translation not available)";

/// Lines of one submission translated at the same time
pub const MAX_CONCURRENT_LINES: usize = 8;

/// Which fallback level produced a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "provider", rename_all = "camelCase")]
pub enum Tier {
    Provider(String),
    DictionaryExact,
    DictionaryPartial,
    Unavailable,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineOutcome {
    pub text: String,
    pub tier: Tier,
}

impl LineOutcome {
    fn empty() -> Self {
        Self {
            text: String::new(),
            tier: Tier::Empty,
        }
    }
}

/// Result of translating one submission, line by line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// The trimmed submission
    pub source: String,
    pub lines: Vec<LineOutcome>,
}

impl Translation {
    fn blank() -> Self {
        Self {
            source: String::new(),
            lines: Vec::new(),
        }
    }

    /// Translated lines joined in input order
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.source.is_empty()
    }

    /// True when every non-empty line was translated by some tier
    pub fn is_complete(&self) -> bool {
        !self.is_blank() && self.lines.iter().all(|line| line.tier != Tier::Unavailable)
    }
}

/// Whitespace-separated word count of a submission
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Translates text through an ordered provider chain ending in a local dictionary
pub struct FallbackTranslator {
    client: reqwest::Client,
    providers: Vec<Arc<dyn TranslationProvider>>,
    dictionary: Dictionary,
    retry: RetryConfig,
    metrics: Arc<TierMetrics>,
}

impl FallbackTranslator {
    pub fn new(
        client: reqwest::Client,
        providers: Vec<Arc<dyn TranslationProvider>>,
        dictionary: Dictionary,
        retry: RetryConfig,
        metrics: Arc<TierMetrics>,
    ) -> Self {
        Self {
            client,
            providers,
            dictionary,
            retry,
            metrics,
        }
    }

    /// Build the standard MyMemory → Google → LibreTranslate chain
    pub fn from_config(config: &Config, metrics: Arc<TierMetrics>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::new(
            client,
            default_chain(config),
            Dictionary::builtin(),
            RetryConfig::provider_call(config.provider_max_attempts),
            metrics,
        ))
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Translate a submission. Blank input yields an empty, incomplete result.
    ///
    /// Up to `MAX_CONCURRENT_LINES` lines run at once; the output keeps
    /// input line order.
    pub async fn translate(&self, input: &str) -> Translation {
        let source = input.trim();
        if source.is_empty() {
            return Translation::blank();
        }

        self.metrics.record_translation();
        let pending: Vec<_> = source
            .split('\n')
            .map(|line| self.translate_line(line))
            .collect();
        let lines: Vec<LineOutcome> = stream::iter(pending)
            .buffered(MAX_CONCURRENT_LINES)
            .collect()
            .await;

        let translation = Translation {
            source: source.to_string(),
            lines,
        };
        info!(
            "Translated {} line(s), complete: {}",
            translation.lines.len(),
            translation.is_complete()
        );
        translation
    }

    async fn translate_line(&self, line: &str) -> LineOutcome {
        let line = line.trim();
        if line.is_empty() {
            return LineOutcome::empty();
        }

        let outcome = match self.try_providers(line).await {
            Some(outcome) => outcome,
            None => self.dictionary_fallback(line),
        };
        self.metrics.record_line(&outcome.tier);
        outcome
    }

    /// First provider success in priority order
    async fn try_providers(&self, line: &str) -> Option<LineOutcome> {
        for provider in &self.providers {
            let result = with_retry_if(
                &self.retry,
                provider.name(),
                || {
                    self.metrics.record_provider_attempt();
                    provider.try_translate(&self.client, line)
                },
                ProviderError::is_retryable,
            )
            .await;

            match result {
                Ok(text) => {
                    debug!("{} translated {:?}", provider.name(), line);
                    return Some(LineOutcome {
                        text,
                        tier: Tier::Provider(provider.name().to_string()),
                    });
                }
                Err(e) => {
                    self.metrics.record_provider_failure();
                    warn!("Provider failed, trying next tier: {}", e);
                }
            }
        }
        None
    }

    fn dictionary_fallback(&self, line: &str) -> LineOutcome {
        match self.dictionary.lookup(line) {
            DictionaryMatch::Exact(value) => LineOutcome {
                text: value,
                tier: Tier::DictionaryExact,
            },
            DictionaryMatch::Partial(value) => LineOutcome {
                text: format!("{}{}", value, PARTIAL_SUFFIX),
                tier: Tier::DictionaryPartial,
            },
            DictionaryMatch::Miss => {
                warn!("No tier could translate {:?}", line);
                LineOutcome {
                    text: format!("{}{}", line, UNAVAILABLE_SUFFIX),
                    tier: Tier::Unavailable,
                }
            }
        }
    }
}
