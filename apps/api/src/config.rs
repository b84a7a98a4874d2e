use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::course::module_grouper::CoveragePolicy;
use crate::course::orchestrator::{FailurePolicy, OrchestratorSettings, DEFAULT_CONCURRENCY};
use crate::course::pipeline::PipelineSettings;
use crate::llm_client::{LlmConfig, DEFAULT_API_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};

const DEFAULT_PORT: u16 = 8001;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_CONCURRENT_GENERATIONS: usize = 2;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub port: u16,
    pub rust_log: String,
    pub content_concurrency: usize,
    pub content_failure_policy: FailurePolicy,
    pub coverage_policy: CoveragePolicy,
    pub max_concurrent_generations: usize,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let call_timeout_secs: u64 = parse_or(&get, "LLM_CALL_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT_SECS)?;
        let content_concurrency: usize = parse_or(&get, "CONTENT_CONCURRENCY", DEFAULT_CONCURRENCY)?;
        if content_concurrency == 0 {
            bail!("CONTENT_CONCURRENCY must be at least 1");
        }

        Ok(Config {
            llm: LlmConfig {
                api_key: get("ANTHROPIC_API_KEY").with_context(|| {
                    "Required environment variable 'ANTHROPIC_API_KEY' is not set"
                })?,
                api_url: get("ANTHROPIC_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_tokens: parse_or(&get, "LLM_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
                request_timeout: Duration::from_secs(call_timeout_secs),
            },
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            content_concurrency,
            content_failure_policy: match get("CONTENT_FAILURE_POLICY") {
                Some(raw) => parse_failure_policy(&raw)?,
                None => FailurePolicy::default(),
            },
            coverage_policy: match get("COVERAGE_POLICY") {
                Some(raw) => parse_coverage_policy(&raw)?,
                None => CoveragePolicy::default(),
            },
            max_concurrent_generations: parse_or(
                &get,
                "MAX_CONCURRENT_GENERATIONS",
                DEFAULT_MAX_CONCURRENT_GENERATIONS,
            )?,
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            orchestrator: OrchestratorSettings {
                concurrency: self.content_concurrency,
                call_timeout: self.llm.request_timeout,
                failure_policy: self.content_failure_policy,
            },
            coverage_policy: self.coverage_policy,
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_failure_policy(raw: &str) -> Result<FailurePolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "fail_fast" => Ok(FailurePolicy::FailFast),
        "partial_success" => Ok(FailurePolicy::PartialSuccess),
        other => bail!("CONTENT_FAILURE_POLICY must be 'fail_fast' or 'partial_success', got '{other}'"),
    }
}

fn parse_coverage_policy(raw: &str) -> Result<CoveragePolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "warn" => Ok(CoveragePolicy::Warn),
        "reject" => Ok(CoveragePolicy::Reject),
        other => bail!("COVERAGE_POLICY must be 'warn' or 'reject', got '{other}'"),
    }
}
