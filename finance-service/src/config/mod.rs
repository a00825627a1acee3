//! Configuration module for finance-service.

use crate::classifier::OpenAiConfig;
use crate::queue::DEFAULT_QUEUE_NAME;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FinanceConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub classifier: ClassifierConfig,
    pub upload_max_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: Secret<String>,
    pub name: String,
    pub consumer_id: String,
    pub consumer_enabled: bool,
    pub poll_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl ClassifierConfig {
    /// `None` when no API key is configured; the fallback classifier is used.
    pub fn openai(&self) -> Option<OpenAiConfig> {
        self.api_key.clone().map(|api_key| OpenAiConfig {
            api_key,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
        })
    }
}

impl FinanceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "finance-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 2),
            },
            queue: QueueConfig {
                redis_url: Secret::new(
                    env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
                ),
                name: env::var("QUEUE_NAME").unwrap_or_else(|_| DEFAULT_QUEUE_NAME.to_string()),
                consumer_id: env::var("CONSUMER_ID").unwrap_or_else(|_| "worker-1".to_string()),
                consumer_enabled: parse_env("CONSUMER_ENABLED", true),
                poll_timeout: Duration::from_secs(parse_env("CONSUMER_POLL_TIMEOUT_SECS", 5)),
            },
            classifier: ClassifierConfig {
                api_key: env::var("OPENAI_API_KEY")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(Secret::new),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                timeout: Duration::from_secs(parse_env("OPENAI_TIMEOUT_SECS", 15)),
            },
            upload_max_bytes: parse_env("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES),
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn classifier(api_key: Option<&str>) -> ClassifierConfig {
        ClassifierConfig {
            api_key: api_key.map(|k| Secret::new(k.to_string())),
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    #[test]
    fn openai_config_requires_api_key() {
        assert!(classifier(None).openai().is_none());

        let openai = classifier(Some("sk-test")).openai().expect("configured");
        assert_eq!(openai.api_key.expose_secret(), "sk-test");
        assert_eq!(openai.model, "gpt-3.5-turbo");
        assert_eq!(openai.timeout, Duration::from_secs(15));
    }

    #[test]
    fn unset_variables_use_defaults() {
        assert_eq!(parse_env("FINANCE_TEST_UNSET_SETTING", 42u64), 42);
        assert!(parse_env("FINANCE_TEST_UNSET_FLAG", true));
    }
}
