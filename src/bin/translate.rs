//! Translate binary - runs the provider fallback chain without the web server
//!
//! Usage:
//!   cargo run --bin translate -- "hello" "thank you"   # each argument is a line
//!   echo "good morning" | cargo run --bin translate    # read lines from stdin
//!
//! Optional environment variables:
//! - SOURCE_LANGUAGE / TARGET_LANGUAGE (defaults to en / te)
//! - MYMEMORY_API_URL, GOOGLE_TRANSLATE_URL, LIBRETRANSLATE_URL
//! - LIBRETRANSLATE_API_KEY
//! - PROVIDER_TIMEOUT_SECS (defaults to 10)
//! - PROVIDER_MAX_ATTEMPTS (defaults to 1)

use anyhow::{Context, Result};
use std::io::Read;
use std::sync::Arc;
use telugu_translate::{
    config::Config,
    metrics::TierMetrics,
    translation::{word_count, FallbackTranslator, Tier},
};
use tracing::info;

fn describe(tier: &Tier) -> String {
    match tier {
        Tier::Provider(name) => name.clone(),
        Tier::DictionaryExact => "dictionary".to_string(),
        Tier::DictionaryPartial => "dictionary (partial)".to_string(),
        Tier::Unavailable => "unavailable".to_string(),
        Tier::Empty => "-".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("telugu_translate=warn".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let input = if args.is_empty() {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        buffer
    } else {
        args.join("\n")
    };

    if input.trim().is_empty() {
        eprintln!("Nothing to translate");
        return Ok(());
    }

    let config = Config::from_env()?;
    let metrics = Arc::new(TierMetrics::new());
    let translator = FallbackTranslator::from_config(&config, metrics.clone())?;

    info!("Translating {} word(s)", word_count(&input));
    let translation = translator.translate(&input).await;

    println!("{}", translation.text());
    eprintln!();
    for (source, outcome) in translation.source.split('\n').zip(&translation.lines) {
        eprintln!("  [{}] {}", describe(&outcome.tier), source.trim());
    }

    let report = metrics.report();
    eprintln!(
        "\n{} provider call(s), {} failed; complete: {}",
        report.provider_attempts,
        report.provider_failures,
        translation.is_complete()
    );

    Ok(())
}
