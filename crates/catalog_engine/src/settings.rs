use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use catalog_core::HarvestSettings;

use crate::locators::LocatorTable;
use crate::retry::RetryPolicy;

pub const DEFAULT_ENTRY_URL: &str = "https://hiring.idenhq.com/";

/// Login pair. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bounded waits used across the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Navigation, form and landmark waits.
    pub page_load: Duration,
    /// Settle delay after a click, and the loading-indicator wait after paging.
    pub settle: Duration,
    /// Pause between a scroll and the next height sample.
    pub scroll_pause: Duration,
    /// Delay after network idle before a snapshot is read.
    pub stabilize: Duration,
    /// How long to look for the "Next" control.
    pub next_probe: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            page_load: Duration::from_millis(30_000),
            settle: Duration::from_millis(5_000),
            scroll_pause: Duration::from_millis(1_000),
            stabilize: Duration::from_millis(1_000),
            next_probe: Duration::from_millis(5_000),
        }
    }
}

/// Everything one pipeline run needs besides the browser and session store.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub entry_url: String,
    pub credentials: Credentials,
    pub output_path: PathBuf,
    pub retry: RetryPolicy,
    pub timings: Timings,
    pub harvest: HarvestSettings,
    pub locators: LocatorTable,
}

impl RunSettings {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            entry_url: DEFAULT_ENTRY_URL.to_string(),
            credentials,
            output_path: PathBuf::from("products.json"),
            retry: RetryPolicy::default(),
            timings: Timings::default(),
            harvest: HarvestSettings::default(),
            locators: LocatorTable::default(),
        }
    }
}

/// Browser process options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Chromium binary; located automatically when `None`.
    pub chrome_path: Option<PathBuf>,
    pub window: (u32, u32),
    pub args: Vec<String>,
    /// Default bound for element waits that take no explicit timeout.
    pub action_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            window: (1920, 1080),
            args: vec![
                "--disable-web-security".to_string(),
                "--disable-features=IsolateOrigins,site-per-process".to_string(),
            ],
            action_timeout: Duration::from_millis(30_000),
        }
    }
}
