use std::env;
use std::str::FromStr;
use std::time::Duration;

use actor_core::platform::DEFAULT_API_BASE;
use actor_core::RunPolicy;
use anyhow::{Context, Result};

/// Everything read from the environment, loaded once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub platform_base: String,
    pub platform_timeout: Duration,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_base: Option<String>,
    pub run_policy: RunPolicy,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let max_wait_secs: u64 = parse_or("RUN_MAX_WAIT_SECS", 900)?;
        let run_policy = RunPolicy {
            poll_interval: Duration::from_millis(positive_or("RUN_POLL_INTERVAL_MS", 2000)?),
            memory_mbytes: parse_or("RUN_MEMORY_MBYTES", 512)?,
            // 0 means wait until the platform reports a terminal status
            max_wait: (max_wait_secs > 0).then(|| Duration::from_secs(max_wait_secs)),
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            platform_base: var("APIFY_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            platform_timeout: Duration::from_secs(parse_or("PLATFORM_TIMEOUT_SECS", 60)?),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            openai_api_base: var("OPENAI_API_BASE"),
            run_policy,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, fallback: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got '{raw}'")),
        None => Ok(fallback),
    }
}

fn positive_or(key: &str, fallback: u64) -> Result<u64> {
    let value = parse_or(key, fallback)?;
    anyhow::ensure!(value > 0, "{key} must be greater than 0");
    Ok(value)
}
