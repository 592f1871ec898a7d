use std::time::Duration;

use async_trait::async_trait;
use catalog_core::UrlPattern;
use catalog_logging::catalog_debug;
use thiserror::Error;

use crate::locators::Locator;
use crate::session::Session;

/// Element condition a wait resolves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Visible,
    Attached,
    Hidden,
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NetworkIdle,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("browser state error: {0}")]
    State(String),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }

    pub(crate) fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        DriverError::Timeout {
            what: what.into(),
            timeout,
        }
    }
}

#[async_trait]
pub trait ElementHandle: Send + Sync {
    async fn inner_text(&self) -> Result<String, DriverError>;
    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError>;
    async fn click(&self) -> Result<(), DriverError>;
    async fn wait_for_state(&self, state: ElementState, timeout: Duration)
        -> Result<(), DriverError>;
}

/// One browser page. Every wait is bounded by the timeout it is given.
///
/// `wait_for` resolves to the first matching element for `Visible` and
/// `Attached`, and to `None` for `Hidden` and `Detached`. A wait that runs out
/// of time returns [`DriverError::Timeout`].
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;
    async fn wait_for(
        &self,
        locator: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> Result<Option<Box<dyn ElementHandle>>, DriverError>;
    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError>;
    async fn query(&self, locator: &Locator) -> Result<Option<Box<dyn ElementHandle>>, DriverError>;
    async fn query_all(&self, locator: &Locator) -> Result<Vec<Box<dyn ElementHandle>>, DriverError>;
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError>;
    async fn wait_for_timeout(&self, duration: Duration);
    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration)
        -> Result<(), DriverError>;
    async fn wait_for_url(&self, pattern: &UrlPattern, timeout: Duration)
        -> Result<(), DriverError>;
    async fn clear_cookies(&self) -> Result<(), DriverError>;
    async fn storage_state(&self) -> Result<Session, DriverError>;
    async fn restore_state(&self, session: &Session) -> Result<(), DriverError>;
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Wait for network idle. Pages that keep polling never go idle, so running
/// out of time is accepted; other driver failures are returned.
pub async fn wait_for_network_idle(
    page: &dyn PageDriver,
    timeout: Duration,
) -> Result<(), DriverError> {
    match page.wait_for_load_state(LoadState::NetworkIdle, timeout).await {
        Err(err) if err.is_timeout() => {
            catalog_debug!("Network did not go idle: {err}");
            Ok(())
        }
        other => other,
    }
}

/// Owner of the browser process; hands out pages.
#[async_trait]
pub trait BrowserHost: Send {
    /// Open a page in its own browser context, sharing no cookies or storage
    /// with pages opened before it.
    async fn new_page(&mut self) -> Result<Box<dyn PageDriver>, DriverError>;
    async fn shutdown(self: Box<Self>) -> Result<(), DriverError>;
}
