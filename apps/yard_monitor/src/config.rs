use std::{collections::HashMap, fs, path::Path, str::FromStr, time::Duration};

use shared::domain::YardDimensions;
use tracing::warn;
use yard_core::{
    config::{DEFAULT_LOG_STREAM, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVICE_URL},
    CoordinatorConfig,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub service_url: String,
    pub api_key: Option<String>,
    pub yard_dimensions: YardDimensions,
    pub containers_interval_secs: Option<u64>,
    pub logs_interval_secs: u64,
    pub training_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub log_stream: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            api_key: None,
            yard_dimensions: YardDimensions::default(),
            containers_interval_secs: None,
            logs_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            training_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            log_stream: DEFAULT_LOG_STREAM.into(),
        }
    }
}

impl Settings {
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            service_url: self.service_url.clone(),
            api_key: self.api_key.clone(),
            dimensions: self.yard_dimensions,
            containers_interval: self.containers_interval_secs.map(Duration::from_secs),
            logs_interval: Duration::from_secs(self.logs_interval_secs),
            training_interval: Duration::from_secs(self.training_interval_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            log_stream: self.log_stream.clone(),
        }
    }
}

/// Defaults, then `path` if it exists, then environment overrides.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match parse_file(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable config file"),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Flattens top-level keys to strings so `2` and `"2"` read the same.
fn parse_file(raw: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let table = toml::from_str::<HashMap<String, toml::Value>>(raw)?;
    Ok(table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(text) => text,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("service_url") {
        settings.service_url = v.clone();
    }
    if let Some(v) = file_cfg.get("api_key") {
        settings.api_key = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("yard_dimensions") {
        set_parsed(&mut settings.yard_dimensions, "yard_dimensions", v);
    }
    if let Some(v) = file_cfg.get("containers_interval_secs") {
        set_interval(&mut settings.containers_interval_secs, "containers_interval_secs", v);
    }
    if let Some(v) = file_cfg.get("logs_interval_secs") {
        set_parsed(&mut settings.logs_interval_secs, "logs_interval_secs", v);
    }
    if let Some(v) = file_cfg.get("training_interval_secs") {
        set_parsed(&mut settings.training_interval_secs, "training_interval_secs", v);
    }
    if let Some(v) = file_cfg.get("request_timeout_secs") {
        set_parsed(&mut settings.request_timeout_secs, "request_timeout_secs", v);
    }
    if let Some(v) = file_cfg.get("log_stream") {
        settings.log_stream = v.clone();
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("YARD_SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = var("APP__SERVICE_URL") {
        settings.service_url = v;
    }

    if let Some(v) = var("YARD_API_KEY") {
        settings.api_key = Some(v);
    }
    if let Some(v) = var("APP__API_KEY") {
        settings.api_key = Some(v);
    }

    if let Some(v) = var("APP__YARD_DIMENSIONS") {
        set_parsed(&mut settings.yard_dimensions, "APP__YARD_DIMENSIONS", &v);
    }
    if let Some(v) = var("APP__CONTAINERS_INTERVAL_SECS") {
        set_interval(
            &mut settings.containers_interval_secs,
            "APP__CONTAINERS_INTERVAL_SECS",
            &v,
        );
    }
    if let Some(v) = var("APP__LOGS_INTERVAL_SECS") {
        set_parsed(&mut settings.logs_interval_secs, "APP__LOGS_INTERVAL_SECS", &v);
    }
    if let Some(v) = var("APP__TRAINING_INTERVAL_SECS") {
        set_parsed(
            &mut settings.training_interval_secs,
            "APP__TRAINING_INTERVAL_SECS",
            &v,
        );
    }
    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        set_parsed(&mut settings.request_timeout_secs, "APP__REQUEST_TIMEOUT_SECS", &v);
    }
    if let Some(v) = var("APP__LOG_STREAM") {
        settings.log_stream = v;
    }
}

fn set_parsed<T: FromStr>(target: &mut T, key: &str, raw: &str) {
    match raw.trim().parse::<T>() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!(key, value = raw, "ignoring invalid setting"),
    }
}

/// `0` switches the containers channel back to on-demand.
fn set_interval(target: &mut Option<u64>, key: &str, raw: &str) {
    let mut secs = target.unwrap_or_default();
    set_parsed(&mut secs, key, raw);
    *target = Some(secs).filter(|secs| *secs > 0);
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
