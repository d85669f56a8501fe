//! Runtime configuration.
//!
//! Values come from the process environment (with `.env` loaded via `dotenvy`)
//! and can be overridden per invocation by CLI flags:
//!
//! | variable | default |
//! | - | - |
//! | `CALIB_API_BASE_URL` | `http://localhost:5005` |
//! | `CALIB_TIMEOUT_SECS` | `30` |
//! | `CALIB_ASV_DEBOUNCE_MS` | `500` |
//! | `CALIB_ZABR_DEBOUNCE_MS` | `300` |
//! | `CALIB_LOG_FILE` | `calib.log` (`-` logs to stderr) |
//! | `CALIB_LOG_JSON` | `false` |

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::Widget;
use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5005";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub asv_debounce: Duration,
    pub zabr_debounce: Duration,
    /// `None` logs to stderr.
    pub log_file: Option<PathBuf>,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            asv_debounce: Duration::from_millis(500),
            zabr_debounce: Duration::from_millis(300),
            log_file: Some(PathBuf::from("calib.log")),
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read configuration from the environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(url) = lookup("CALIB_API_BASE_URL") {
            config.base_url = normalize_base_url(&url)?;
        }
        if let Some(raw) = lookup("CALIB_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_u64("CALIB_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = lookup("CALIB_ASV_DEBOUNCE_MS") {
            config.asv_debounce = Duration::from_millis(parse_u64("CALIB_ASV_DEBOUNCE_MS", &raw)?);
        }
        if let Some(raw) = lookup("CALIB_ZABR_DEBOUNCE_MS") {
            config.zabr_debounce = Duration::from_millis(parse_u64("CALIB_ZABR_DEBOUNCE_MS", &raw)?);
        }
        if let Some(raw) = lookup("CALIB_LOG_FILE") {
            let raw = raw.trim();
            config.log_file = if raw == "-" { None } else { Some(PathBuf::from(raw)) };
        }
        if let Some(raw) = lookup("CALIB_LOG_JSON") {
            config.log_json = matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        Ok(config)
    }

    /// Apply CLI overrides on top of the environment.
    pub fn with_overrides(mut self, base_url: Option<&str>, timeout_secs: Option<u64>) -> Result<Self, AppError> {
        if let Some(url) = base_url {
            self.base_url = normalize_base_url(url)?;
        }
        if let Some(secs) = timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        Ok(self)
    }

    /// Debounce delay for a widget's auto-update.
    pub fn debounce_for(&self, widget: Widget) -> Duration {
        match widget {
            Widget::Asv => self.asv_debounce,
            Widget::Zabr => self.zabr_debounce,
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(AppError::config(format!(
            "Invalid backend base URL '{raw}': expected http:// or https://."
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, AppError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| AppError::config(format!("Invalid {key} '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.debounce_for(Widget::Asv), Duration::from_millis(500));
        assert_eq!(config.debounce_for(Widget::Zabr), Duration::from_millis(300));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CALIB_API_BASE_URL", "https://calib.example.com/"),
            ("CALIB_ZABR_DEBOUNCE_MS", "120"),
            ("CALIB_LOG_FILE", "-"),
            ("CALIB_LOG_JSON", "true"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://calib.example.com");
        assert_eq!(config.zabr_debounce, Duration::from_millis(120));
        assert_eq!(config.log_file, None);
        assert!(config.log_json);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let err = AppConfig::from_lookup(lookup_from(&[("CALIB_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
        let err = AppConfig::from_lookup(lookup_from(&[("CALIB_API_BASE_URL", "localhost:5005")])).unwrap_err();
        assert!(err.message().contains("base URL"));
    }

    #[test]
    fn cli_overrides_win() {
        let config = AppConfig::default()
            .with_overrides(Some("http://10.0.0.2:9000"), Some(5))
            .unwrap();
        assert_eq!(config.base_url, "http://10.0.0.2:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
