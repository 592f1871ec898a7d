//! [`BrowserHost`] and [`PageDriver`] over a Chromium instance driven by
//! chromiumoxide.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use catalog_core::UrlPattern;
use catalog_logging::{catalog_debug, catalog_info, catalog_warn};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCookiesParams, CookieParam, SetCookiesParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::driver::{BrowserHost, DriverError, ElementHandle, ElementState, LoadState, PageDriver};
use crate::locators::Locator;
use crate::scripts;
use crate::session::{OriginStorage, Session, StorageEntry, StoredCookie};
use crate::settings::BrowserSettings;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Resource count must hold still this long for the network to count as idle.
const NETWORK_QUIET: Duration = Duration::from_millis(500);

fn browser_err(err: CdpError) -> DriverError {
    DriverError::Browser(err.to_string())
}

fn script_err(err: CdpError) -> DriverError {
    DriverError::Script(err.to_string())
}

/// Contexts whose page has closed and that still have to be disposed.
type ReleasedContexts = Arc<Mutex<Vec<BrowserContextId>>>;

pub struct ChromiumHost {
    browser: Browser,
    handler: JoinHandle<()>,
    action_timeout: Duration,
    released: ReleasedContexts,
}

impl ChromiumHost {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, DriverError> {
        let (width, height) = settings.window;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(None);
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        for arg in &settings.args {
            builder = builder.arg(arg.clone());
        }
        let config = builder
            .build()
            .map_err(|e| DriverError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        catalog_info!(
            "Launched Chromium ({}, {width}x{height})",
            if settings.headless { "headless" } else { "headed" }
        );
        Ok(Self {
            browser,
            handler,
            action_timeout: settings.action_timeout,
            released: ReleasedContexts::default(),
        })
    }

    fn take_released(&self) -> Vec<BrowserContextId> {
        self.released
            .lock()
            .map(|mut released| std::mem::take(&mut *released))
            .unwrap_or_default()
    }

    /// Drop the cookies and storage of every context whose page has closed.
    async fn dispose_released(&self) {
        for context in self.take_released() {
            if let Err(err) = self
                .browser
                .execute(DisposeBrowserContextParams::new(context.clone()))
                .await
            {
                catalog_warn!("Could not dispose browser context {context:?}: {err}");
            }
        }
    }
}

#[async_trait]
impl BrowserHost for ChromiumHost {
    async fn new_page(&mut self) -> Result<Box<dyn PageDriver>, DriverError> {
        self.dispose_released().await;

        let context = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(browser_err)?
            .result
            .browser_context_id;
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(DriverError::Browser)?;
        let page = self.browser.new_page(target).await.map_err(browser_err)?;
        catalog_debug!("Opened page in browser context {context:?}");

        Ok(Box::new(ChromiumPage {
            page,
            action_timeout: self.action_timeout,
            next_token: AtomicU64::new(0),
            context,
            released: Arc::clone(&self.released),
        }))
    }

    async fn shutdown(self: Box<Self>) -> Result<(), DriverError> {
        self.dispose_released().await;
        let mut this = *self;
        let closed = this.browser.close().await.map(|_| ()).map_err(browser_err);
        if let Err(err) = this.browser.wait().await {
            catalog_warn!("Chromium did not exit cleanly: {err}");
        }
        this.handler.abort();
        closed
    }
}

struct ChromiumPage {
    page: Page,
    action_timeout: Duration,
    next_token: AtomicU64,
    context: BrowserContextId,
    released: ReleasedContexts,
}

impl ChromiumPage {
    async fn eval(&self, script: &str) -> Result<Value, DriverError> {
        let result = self.page.evaluate(script).await.map_err(script_err)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    /// Elements currently matching `locator`, in document order.
    async fn find(&self, locator: &Locator, visible_only: bool) -> Result<Vec<Element>, DriverError> {
        let token = format!("m{}", self.next_token.fetch_add(1, Ordering::Relaxed));
        let script = scripts::tag_matches(locator.css, locator.text, visible_only, &token);
        let count = self.eval(&script).await?.as_u64().unwrap_or(0);
        if count == 0 {
            return Ok(Vec::new());
        }
        self.page
            .find_elements(scripts::tagged_selector(&token))
            .await
            .map_err(browser_err)
    }

    async fn poll_element(
        &self,
        locator: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> Result<Option<Element>, DriverError> {
        let deadline = Instant::now() + timeout;
        let visible_only = matches!(state, ElementState::Visible | ElementState::Hidden);
        loop {
            match self.find(locator, visible_only).await {
                Ok(found) => match state {
                    ElementState::Visible | ElementState::Attached if !found.is_empty() => {
                        return Ok(found.into_iter().next());
                    }
                    ElementState::Hidden | ElementState::Detached if found.is_empty() => {
                        return Ok(None);
                    }
                    _ => {}
                },
                // The document may be between navigations.
                Err(err) => catalog_debug!("Lookup of {locator} failed: {err}"),
            }
            if Instant::now() >= deadline {
                return Err(DriverError::timeout(format!("{locator} to be {state:?}"), timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_network_quiet(&self, timeout: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + timeout;
        let mut last_count = None;
        let mut quiet_since = Instant::now();
        loop {
            if let Ok(activity) = self.eval(&scripts::network_activity()).await {
                let complete = activity.get("ready").and_then(Value::as_str) == Some("complete");
                let count = activity.get("resources").and_then(Value::as_u64);
                if count != last_count {
                    last_count = count;
                    quiet_since = Instant::now();
                } else if complete && quiet_since.elapsed() >= NETWORK_QUIET {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(DriverError::timeout("network idle", timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(DriverError::Navigation {
                url: url.to_string(),
                message: err.to_string(),
            }),
            Err(_) => Err(DriverError::timeout(format!("navigation to {url}"), timeout)),
        }
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> Result<Option<Box<dyn ElementHandle>>, DriverError> {
        let element = self.poll_element(locator, state, timeout).await?;
        Ok(element.map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>))
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let element = self
            .poll_element(locator, ElementState::Visible, self.action_timeout)
            .await?
            .ok_or_else(|| DriverError::NotFound(locator.to_string()))?;
        element
            .call_js_fn(scripts::CLEAR_INPUT_FN, false)
            .await
            .map_err(script_err)?;
        if !text.is_empty() {
            element.focus().await.map_err(browser_err)?;
            element.type_str(text).await.map_err(browser_err)?;
        }
        Ok(())
    }

    async fn query(&self, locator: &Locator) -> Result<Option<Box<dyn ElementHandle>>, DriverError> {
        let found = self.find(locator, false).await?;
        Ok(found
            .into_iter()
            .next()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>))
    }

    async fn query_all(&self, locator: &Locator) -> Result<Vec<Box<dyn ElementHandle>>, DriverError> {
        let found = self.find(locator, false).await?;
        Ok(found
            .into_iter()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>)
            .collect())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        self.eval(script).await
    }

    async fn wait_for_timeout(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> Result<(), DriverError> {
        match state {
            LoadState::NetworkIdle => self.wait_network_quiet(timeout).await,
        }
    }

    async fn wait_for_url(&self, pattern: &UrlPattern, timeout: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(Some(url)) = self.page.url().await {
                if pattern.matches(&url) {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(DriverError::timeout(format!("URL matching {pattern}"), timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn clear_cookies(&self) -> Result<(), DriverError> {
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(browser_err)?;
        Ok(())
    }

    async fn storage_state(&self) -> Result<Session, DriverError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(browser_err)?
            .into_iter()
            .map(|cookie| StoredCookie {
                expires: (!cookie.session && cookie.expires > 0.0).then_some(cookie.expires),
                name: cookie.name,
                value: cookie.value,
                domain: cookie.domain,
                path: cookie.path,
                secure: cookie.secure,
                http_only: cookie.http_only,
            })
            .collect();
        let snapshot = self.eval(&scripts::local_storage_snapshot()).await?;
        let origins = origin_storage(&snapshot).into_iter().collect();
        Ok(Session::new(cookies, origins))
    }

    async fn restore_state(&self, session: &Session) -> Result<(), DriverError> {
        let cookies: Vec<CookieParam> = session
            .cookies
            .iter()
            .map(|stored| {
                let mut cookie = CookieParam::new(stored.name.clone(), stored.value.clone());
                cookie.domain = Some(stored.domain.clone());
                cookie.path = Some(stored.path.clone());
                cookie.secure = Some(stored.secure);
                cookie.http_only = Some(stored.http_only);
                cookie
            })
            .collect();
        if !cookies.is_empty() {
            self.page
                .execute(SetCookiesParams::new(cookies))
                .await
                .map_err(browser_err)?;
        }

        for origin in &session.origins {
            if origin.local_storage.is_empty() {
                continue;
            }
            let entries: Vec<(String, String)> = origin
                .local_storage
                .iter()
                .map(|entry| (entry.name.clone(), entry.value.clone()))
                .collect();
            let source = scripts::seed_local_storage(&origin.origin, &entries);
            self.page
                .execute(AddScriptToEvaluateOnNewDocumentParams::new(source))
                .await
                .map_err(browser_err)?;
        }
        catalog_debug!(
            "Restored {} cookies and storage for {} origins",
            session.cookies.len(),
            session.origins.len()
        );
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        let this = *self;
        let closed = this.page.close().await.map_err(browser_err);
        if let Ok(mut released) = this.released.lock() {
            released.push(this.context);
        }
        closed
    }
}

/// Parse the `{ origin, entries }` value produced by the storage snapshot script.
fn origin_storage(value: &Value) -> Option<OriginStorage> {
    let origin = value.get("origin")?.as_str()?;
    if origin.is_empty() || origin == "null" {
        return None;
    }
    let local_storage = value
        .get("entries")?
        .as_array()?
        .iter()
        .filter_map(|pair| {
            let pair = pair.as_array()?;
            Some(StorageEntry {
                name: pair.first()?.as_str()?.to_string(),
                value: pair.get(1)?.as_str()?.to_string(),
            })
        })
        .collect();
    Some(OriginStorage {
        origin: origin.to_string(),
        local_storage,
    })
}

struct ChromiumElement {
    element: Element,
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn inner_text(&self) -> Result<String, DriverError> {
        Ok(self
            .element
            .inner_text()
            .await
            .map_err(browser_err)?
            .unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        self.element.attribute(name).await.map_err(browser_err)
    }

    async fn click(&self) -> Result<(), DriverError> {
        self.element.click().await.map_err(browser_err)?;
        Ok(())
    }

    async fn wait_for_state(&self, state: ElementState, timeout: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            let observed = self
                .element
                .call_js_fn(scripts::ELEMENT_STATE_FN, false)
                .await
                .ok()
                .and_then(|returns| returns.result.value);
            let flag = |key: &str| {
                observed
                    .as_ref()
                    .and_then(|v| v.get(key))
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            };
            let reached = match state {
                ElementState::Visible => flag("visible"),
                ElementState::Attached => flag("connected"),
                ElementState::Hidden => !flag("visible"),
                ElementState::Detached => !flag("connected"),
            };
            if reached {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::timeout(format!("element to be {state:?}"), timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
