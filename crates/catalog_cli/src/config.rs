//! Process configuration read from `CATALOG_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use catalog_engine::{
    BrowserSettings, Credentials, RetryPolicy, RunSettings, Timings, DEFAULT_ENTRY_URL,
};
use catalog_logging::{LevelFilter, LogDestination};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}: expected {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub entry_url: String,
    pub session_file: PathBuf,
    pub output_file: PathBuf,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub page_load_timeout: Duration,
    pub settle_timeout: Duration,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub log_level: LevelFilter,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset. The
    /// password is passed through as given, surrounding whitespace included.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let email = get("CATALOG_EMAIL").ok_or(ConfigError::Missing("CATALOG_EMAIL"))?;
        let password = lookup("CATALOG_PASSWORD")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing("CATALOG_PASSWORD"))?;

        Ok(Self {
            credentials: Credentials::new(email, password),
            entry_url: get("CATALOG_ENTRY_URL").unwrap_or_else(|| DEFAULT_ENTRY_URL.to_string()),
            session_file: get("CATALOG_SESSION_FILE")
                .map_or_else(|| PathBuf::from("session.json"), PathBuf::from),
            output_file: get("CATALOG_OUTPUT_FILE")
                .map_or_else(|| PathBuf::from("products.json"), PathBuf::from),
            max_retries: parse(&get, "CATALOG_MAX_RETRIES", 3, "a whole number")?,
            retry_delay: millis(&get, "CATALOG_RETRY_DELAY_MS", 2_000)?,
            page_load_timeout: millis(&get, "CATALOG_PAGE_LOAD_TIMEOUT_MS", 30_000)?,
            settle_timeout: millis(&get, "CATALOG_SETTLE_TIMEOUT_MS", 5_000)?,
            headless: flag(&get, "CATALOG_HEADLESS", true)?,
            chrome_path: get("CATALOG_CHROME_PATH").map(PathBuf::from),
            log_level: parse(&get, "CATALOG_LOG_LEVEL", LevelFilter::Info, "a log level")?,
            log_file: get("CATALOG_LOG_FILE").map(PathBuf::from),
        })
    }

    pub fn run_settings(&self) -> RunSettings {
        let mut settings = RunSettings::new(self.credentials.clone());
        settings.entry_url = self.entry_url.clone();
        settings.output_path = self.output_file.clone();
        settings.retry = RetryPolicy::fixed(self.max_retries, self.retry_delay);
        settings.timings = Timings {
            page_load: self.page_load_timeout,
            settle: self.settle_timeout,
            ..Timings::default()
        };
        settings
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            headless: self.headless,
            chrome_path: self.chrome_path.clone(),
            action_timeout: self.page_load_timeout,
            ..BrowserSettings::default()
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
            expected,
        }),
    }
}

fn millis(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    parse(get, name, default, "milliseconds").map(Duration::from_millis)
}

fn flag(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                value,
                expected: "true or false",
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const CREDENTIALS: [(&str, &str); 2] = [
        ("CATALOG_EMAIL", "me@example.com"),
        ("CATALOG_PASSWORD", "secret"),
    ];

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let config = config(&CREDENTIALS).unwrap();

        assert_eq!(config.credentials.email(), "me@example.com");
        assert_eq!(config.entry_url, DEFAULT_ENTRY_URL);
        assert_eq!(config.session_file, PathBuf::from("session.json"));
        assert_eq!(config.output_file, PathBuf::from("products.json"));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.page_load_timeout, Duration::from_secs(30));
        assert_eq!(config.settle_timeout, Duration::from_secs(5));
        assert!(config.headless);
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.log_destination(), LogDestination::Terminal);
    }

    #[test]
    fn blank_password_counts_as_missing() {
        let err = config(&[("CATALOG_EMAIL", "me@example.com"), ("CATALOG_PASSWORD", "  ")])
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("CATALOG_PASSWORD"));
    }

    #[test]
    fn password_whitespace_is_preserved() {
        let config = config(&[
            ("CATALOG_EMAIL", " me@example.com "),
            ("CATALOG_PASSWORD", " pass word "),
        ])
        .unwrap();

        assert_eq!(config.credentials.email(), "me@example.com");
        assert_eq!(config.credentials.password(), " pass word ");
        assert_eq!(config.run_settings().credentials.password(), " pass word ");
    }

    #[test]
    fn overrides_flow_into_run_settings() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("CATALOG_MAX_RETRIES", "5"),
            ("CATALOG_RETRY_DELAY_MS", "250"),
            ("CATALOG_SETTLE_TIMEOUT_MS", "1500"),
            ("CATALOG_OUTPUT_FILE", "out/items.json"),
            ("CATALOG_HEADLESS", "false"),
            ("CATALOG_LOG_LEVEL", "debug"),
            ("CATALOG_LOG_FILE", "run.log"),
        ]);
        let config = config(&vars).unwrap();

        let run = config.run_settings();
        assert_eq!(run.retry, RetryPolicy::fixed(5, Duration::from_millis(250)));
        assert_eq!(run.timings.settle, Duration::from_millis(1500));
        assert_eq!(run.timings.scroll_pause, Timings::default().scroll_pause);
        assert_eq!(run.output_path, PathBuf::from("out/items.json"));
        assert!(!config.browser_settings().headless);
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(
            config.log_destination(),
            LogDestination::Both(PathBuf::from("run.log"))
        );
    }

    #[test]
    fn unparseable_number_names_the_variable() {
        let mut vars = CREDENTIALS.to_vec();
        vars.push(("CATALOG_MAX_RETRIES", "many"));

        match config(&vars).unwrap_err() {
            ConfigError::Invalid { name, value, .. } => {
                assert_eq!(name, "CATALOG_MAX_RETRIES");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_headless_value_is_rejected() {
        let mut vars = CREDENTIALS.to_vec();
        vars.push(("CATALOG_HEADLESS", "sometimes"));
        assert!(matches!(
            config(&vars),
            Err(ConfigError::Invalid { name: "CATALOG_HEADLESS", .. })
        ));
    }
}
