use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::util::{is_local_endpoint_url, parse_bool_flag};

pub const API_URL_ENV: &str = "KB_API_URL";
pub const POLL_INTERVAL_ENV: &str = "KB_POLL_INTERVAL_SECS";
pub const PR_TITLE_ENV: &str = "KB_PR_TITLE";
pub const DIFF_ENV: &str = "KB_DIFF";
pub const REQUEST_TIMEOUT_ENV: &str = "KB_REQUEST_TIMEOUT_SECS";
pub const LOG_PATH_ENV: &str = "KB_LOG_PATH";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_PR_TITLE: &str = "Knowledge base updates";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_POLL_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub poll_interval: Duration,
    pub pr_title: String,
    pub diff_enabled: bool,
    pub request_timeout: Duration,
    pub log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            pr_title: DEFAULT_PR_TITLE.to_string(),
            diff_enabled: true,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url = non_empty_env(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let poll_interval = match non_empty_env(POLL_INTERVAL_ENV) {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("{POLL_INTERVAL_ENV} must be whole seconds, got '{raw}'"))?,
            ),
            None => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        };
        let request_timeout = match non_empty_env(REQUEST_TIMEOUT_ENV) {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().with_context(|| {
                format!("{REQUEST_TIMEOUT_ENV} must be whole seconds, got '{raw}'")
            })?),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        let pr_title = non_empty_env(PR_TITLE_ENV).unwrap_or_else(|| DEFAULT_PR_TITLE.to_string());
        let diff_enabled = std::env::var(DIFF_ENV)
            .ok()
            .and_then(parse_bool_flag)
            .unwrap_or(true);
        let log_path = non_empty_env(LOG_PATH_ENV).map(PathBuf::from);

        Ok(Self {
            api_url,
            poll_interval,
            pr_title,
            diff_enabled,
            request_timeout,
            log_path,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid {API_URL_ENV} '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        let secs = self.poll_interval.as_secs();
        if secs == 0 || secs > MAX_POLL_INTERVAL_SECS {
            bail!(
                "{POLL_INTERVAL_ENV} must be between 1 and {MAX_POLL_INTERVAL_SECS} seconds, got {secs}"
            );
        }

        if self.request_timeout.is_zero() {
            bail!("{REQUEST_TIMEOUT_ENV} must be at least 1 second");
        }

        if self.pr_title.trim().is_empty() {
            bail!("{PR_TITLE_ENV} must not be blank");
        }

        if !self.is_local_endpoint() && self.api_url.starts_with("http://") {
            tracing::warn!(url = %self.api_url, "knowledge backend is remote but not using https");
        }

        Ok(())
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KEYS: [&str; 6] = [
        API_URL_ENV,
        POLL_INTERVAL_ENV,
        PR_TITLE_ENV,
        DIFF_ENV,
        REQUEST_TIMEOUT_ENV,
        LOG_PATH_ENV,
    ];

    fn clear_env() {
        for key in ALL_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_uses_defaults_when_env_is_empty() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        clear_env();

        let config = Config::load().expect("defaults load");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.pr_title, DEFAULT_PR_TITLE);
        assert!(config.diff_enabled);
        assert!(config.log_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_reads_overrides() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        clear_env();
        std::env::set_var(API_URL_ENV, "https://kb.example.com");
        std::env::set_var(POLL_INTERVAL_ENV, "5");
        std::env::set_var(DIFF_ENV, "off");
        std::env::set_var(PR_TITLE_ENV, "Docs refresh");
        std::env::set_var(LOG_PATH_ENV, "/tmp/kb-test.log");

        let config = Config::load().expect("overrides load");
        clear_env();

        assert_eq!(config.api_url, "https://kb.example.com");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert!(!config.diff_enabled);
        assert_eq!(config.pr_title, "Docs refresh");
        assert_eq!(config.log_path, Some(PathBuf::from("/tmp/kb-test.log")));
    }

    #[test]
    fn test_load_rejects_non_numeric_interval() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        clear_env();
        std::env::set_var(POLL_INTERVAL_ENV, "soon");
        let result = Config::load();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval_and_bad_scheme() {
        let config = Config {
            poll_interval: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            api_url: "ftp://kb.example.com".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
