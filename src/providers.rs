//! External translation providers.
//!
//! Each provider wraps one third-party HTTP API behind [`TranslationProvider`].
//! The translator tries them in priority order:
//!
//! 1. MyMemory — `GET ?q=…&langpair=en|te`, JSON `responseData.translatedText`
//! 2. Google (gtx client) — `GET ?client=gtx&sl=…&tl=…&dt=t&q=…`, nested arrays
//! 3. LibreTranslate — `POST` JSON `{q, source, target, format}`, JSON `translatedText`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} API error ({status}): {body}")]
    Http {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {source}")]
    Network {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned an unexpected response: {reason}")]
    Malformed {
        provider: &'static str,
        reason: String,
    },
}

impl ProviderError {
    /// Rate limits, server errors and transport failures are transient
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Network { .. } => true,
            ProviderError::Malformed { .. } => false,
        }
    }

    fn malformed(provider: &'static str, reason: impl Into<String>) -> Self {
        ProviderError::Malformed {
            provider,
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Translate one line of text, or explain why not
    async fn try_translate(
        &self,
        client: &reqwest::Client,
        text: &str,
    ) -> Result<String, ProviderError>;
}

/// Send a prepared request and read the body, mapping failures to ProviderError
async fn send(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<String, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|source| ProviderError::Network { provider, source })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| ProviderError::Network { provider, source })?;

    if !status.is_success() {
        return Err(ProviderError::Http {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn non_empty(provider: &'static str, text: String) -> Result<String, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::malformed(provider, "empty translation"));
    }
    Ok(trimmed.to_string())
}

// ==================== MyMemory ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    response_data: MyMemoryData,
    /// Numeric in most responses, a string in some error responses
    response_status: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryData {
    translated_text: Option<String>,
}

pub struct MyMemoryProvider {
    url: String,
    langpair: String,
}

impl MyMemoryProvider {
    pub const NAME: &'static str = "mymemory";

    pub fn new(url: impl Into<String>, source: &str, target: &str) -> Self {
        Self {
            url: url.into(),
            langpair: format!("{}|{}", source, target),
        }
    }
}

#[async_trait]
impl TranslationProvider for MyMemoryProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn try_translate(
        &self,
        client: &reqwest::Client,
        text: &str,
    ) -> Result<String, ProviderError> {
        let request = client
            .get(&self.url)
            .query(&[("q", text), ("langpair", self.langpair.as_str())]);
        let body = send(Self::NAME, request).await?;

        let parsed: MyMemoryResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::malformed(Self::NAME, e.to_string()))?;

        // Quota and language errors arrive as HTTP 200 with a non-200 status field
        let status = match &parsed.response_status {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        };
        if status != Some(200) {
            return Err(ProviderError::malformed(
                Self::NAME,
                format!("responseStatus {}", parsed.response_status),
            ));
        }

        let translated = parsed
            .response_data
            .translated_text
            .ok_or_else(|| ProviderError::malformed(Self::NAME, "missing translatedText"))?;
        non_empty(Self::NAME, translated)
    }
}

// ==================== Google (gtx) ====================

pub struct GoogleProvider {
    url: String,
    source: String,
    target: String,
}

impl GoogleProvider {
    pub const NAME: &'static str = "google";

    pub fn new(url: impl Into<String>, source: &str, target: &str) -> Self {
        Self {
            url: url.into(),
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

/// Concatenate the `[0][*][0]` segments of a gtx response
fn parse_gtx_segments(json: &serde_json::Value) -> Option<String> {
    let segments = json.get(0)?.as_array()?;
    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|v| v.as_str()))
        .collect();
    Some(text)
}

#[async_trait]
impl TranslationProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn try_translate(
        &self,
        client: &reqwest::Client,
        text: &str,
    ) -> Result<String, ProviderError> {
        let request = client.get(&self.url).query(&[
            ("client", "gtx"),
            ("sl", self.source.as_str()),
            ("tl", self.target.as_str()),
            ("dt", "t"),
            ("q", text),
        ]);
        let body = send(Self::NAME, request).await?;

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::malformed(Self::NAME, e.to_string()))?;
        let translated = parse_gtx_segments(&json)
            .ok_or_else(|| ProviderError::malformed(Self::NAME, "missing segment array"))?;
        non_empty(Self::NAME, translated)
    }
}

// ==================== LibreTranslate ====================

#[derive(Debug, Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibreResponse {
    translated_text: Option<String>,
    error: Option<String>,
}

pub struct LibreTranslateProvider {
    url: String,
    source: String,
    target: String,
    api_key: Option<String>,
}

impl LibreTranslateProvider {
    pub const NAME: &'static str = "libretranslate";

    pub fn new(url: impl Into<String>, source: &str, target: &str) -> Self {
        Self {
            url: url.into(),
            source: source.to_string(),
            target: target.to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

#[async_trait]
impl TranslationProvider for LibreTranslateProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn try_translate(
        &self,
        client: &reqwest::Client,
        text: &str,
    ) -> Result<String, ProviderError> {
        let payload = LibreRequest {
            q: text,
            source: &self.source,
            target: &self.target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let body = send(Self::NAME, client.post(&self.url).json(&payload)).await?;

        let parsed: LibreResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::malformed(Self::NAME, e.to_string()))?;
        if let Some(error) = parsed.error {
            return Err(ProviderError::malformed(Self::NAME, error));
        }
        let translated = parsed
            .translated_text
            .ok_or_else(|| ProviderError::malformed(Self::NAME, "missing translatedText"))?;
        non_empty(Self::NAME, translated)
    }
}

/// The provider chain in priority order
pub fn default_chain(config: &Config) -> Vec<Arc<dyn TranslationProvider>> {
    let source = config.source_language.as_str();
    let target = config.target_language.as_str();

    let mymemory: Arc<dyn TranslationProvider> = Arc::new(MyMemoryProvider::new(
        &config.mymemory_api_url,
        source,
        target,
    ));
    let google: Arc<dyn TranslationProvider> = Arc::new(GoogleProvider::new(
        &config.google_translate_url,
        source,
        target,
    ));
    let libre: Arc<dyn TranslationProvider> = Arc::new(
        LibreTranslateProvider::new(&config.libretranslate_url, source, target)
            .with_api_key(config.libretranslate_api_key.clone()),
    );

    vec![mymemory, google, libre]
}
