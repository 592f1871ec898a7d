#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, Once};
use std::time::Duration;

use async_trait::async_trait;
use catalog_core::UrlPattern;
use catalog_engine::{
    scripts, BrowserHost, Credentials, DriverError, ElementHandle, ElementState, LoadState,
    Locator, LocatorTable, PageDriver, RetryPolicy, RunSettings, Session, SessionError,
    SessionStore, StoredCookie, Timings,
};
use serde_json::Value;

pub const ENTRY_URL: &str = "https://catalog.test/";
pub const EMAIL: &str = "operator@example.com";
pub const PASSWORD: &str = "hunter2";
pub const VALID_SESSION: &str = "session-token-1";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(catalog_logging::initialize_for_tests);
}

/// Settings with zero waits and immediate retries.
pub fn test_settings(output: &Path) -> RunSettings {
    let mut settings = RunSettings::new(Credentials::new(EMAIL, PASSWORD));
    settings.entry_url = ENTRY_URL.to_string();
    settings.output_path = output.to_path_buf();
    settings.retry = RetryPolicy::immediate(3);
    settings.timings = Timings {
        page_load: Duration::ZERO,
        settle: Duration::ZERO,
        scroll_pause: Duration::ZERO,
        stabilize: Duration::ZERO,
        next_probe: Duration::ZERO,
    };
    settings
}

pub fn table_html(headers: &[&str], rows: &[(Option<&str>, Vec<&str>)]) -> String {
    let mut html = String::from("<table><thead><tr>");
    for header in headers {
        html.push_str(&format!("<th>{header}</th>"));
    }
    html.push_str("</tr></thead><tbody>");
    for (id, cells) in rows {
        match id {
            Some(id) => html.push_str(&format!("<tr data-row-id=\"{id}\">")),
            None => html.push_str("<tr>"),
        }
        for cell in cells {
            html.push_str(&format!("<td>{cell}</td>"));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Blank,
    Login,
    Landing,
    Application,
    Catalog,
}

/// Scripted stand-in for the target web application.
#[derive(Debug)]
pub struct Site {
    pub stage: Stage,
    pub url: String,
    pub authenticated: bool,
    pub menu_step: usize,
    pub deny_access: bool,
    pub alerts: Vec<String>,
    pub missing: HashSet<&'static str>,
    pub label: Option<String>,
    pub pages: Vec<String>,
    pub current_page: usize,
    pub next_never_disables: bool,
    pub content_height: u64,
    /// Snapshot reads that fail before the table becomes readable.
    pub snapshot_failures: u32,
    /// Element handles that go stale between lookup and click.
    pub stale_handles: u32,
    pub fills: Vec<(&'static str, String)>,
    pub submits: u32,
    pub clicks: Vec<&'static str>,
    pub cookie_clears: u32,
    pub restores: u32,
    /// Browser contexts a stored session was restored into.
    pub restored_contexts: HashSet<u32>,
    /// Browser contexts the login form was filled in.
    pub login_contexts: Vec<u32>,
    pub scrolls: u32,
    pub pages_opened: u32,
    pub pages_closed: u32,
    pub shut_down: bool,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            stage: Stage::Blank,
            url: "about:blank".to_string(),
            authenticated: false,
            menu_step: 0,
            deny_access: false,
            alerts: Vec::new(),
            missing: HashSet::new(),
            label: Some("Showing 1 to 2 of 2 products".to_string()),
            pages: Vec::new(),
            current_page: 0,
            next_never_disables: false,
            content_height: 600,
            snapshot_failures: 0,
            stale_handles: 0,
            fills: Vec::new(),
            submits: 0,
            clicks: Vec::new(),
            cookie_clears: 0,
            restores: 0,
            restored_contexts: HashSet::new(),
            login_contexts: Vec::new(),
            scrolls: 0,
            pages_opened: 0,
            pages_closed: 0,
            shut_down: false,
        }
    }
}

impl Site {
    /// Site already showing the catalog table.
    pub fn on_catalog(pages: Vec<String>) -> Self {
        Self {
            stage: Stage::Catalog,
            url: format!("{ENTRY_URL}challenge"),
            authenticated: true,
            pages,
            ..Self::default()
        }
    }

    fn present(&self, role: &str) -> bool {
        if self.missing.contains(role) {
            return false;
        }
        match role {
            "login email" | "login password" | "login submit" => self.stage == Stage::Login,
            "launch action" => self.stage == Stage::Landing,
            "access denied" => self.stage == Stage::Login && self.deny_access && self.submits > 0,
            "dashboard landmark" => matches!(self.stage, Stage::Application | Stage::Catalog),
            "Dashboard" => self.stage == Stage::Application,
            "Inventory" => self.stage == Stage::Application && self.menu_step >= 1,
            "Products" => self.stage == Stage::Application && self.menu_step >= 2,
            "Full Catalog" => self.stage == Stage::Application && self.menu_step >= 3,
            "table root" | "header cell" | "data row" => self.stage == Stage::Catalog,
            "total label" => self.stage == Stage::Catalog && self.label.is_some(),
            "next page" => self.stage == Stage::Catalog && !self.pages.is_empty(),
            _ => false,
        }
    }

    fn next_disabled(&self) -> bool {
        !self.next_never_disables && self.current_page + 1 >= self.pages.len()
    }

    fn click(&mut self, role: &'static str) {
        self.clicks.push(role);
        match role {
            "login submit" => {
                self.submits += 1;
                let email = self.last_fill("login email");
                let password = self.last_fill("login password");
                if email.as_deref() == Some(EMAIL)
                    && password.as_deref() == Some(PASSWORD)
                    && !self.deny_access
                {
                    self.authenticated = true;
                    self.stage = Stage::Landing;
                } else {
                    self.alerts = vec!["Invalid email or password".to_string()];
                }
            }
            "launch action" => {
                self.stage = Stage::Application;
                self.url = format!("{ENTRY_URL}challenge");
            }
            "Dashboard" => self.menu_step = 1,
            "Inventory" => self.menu_step = 2,
            "Products" => self.menu_step = 3,
            "Full Catalog" => self.stage = Stage::Catalog,
            "next page" => {
                if self.current_page + 1 < self.pages.len() {
                    self.current_page += 1;
                }
            }
            _ => {}
        }
    }

    fn last_fill(&self, role: &str) -> Option<String> {
        self.fills
            .iter()
            .rev()
            .find(|(r, _)| *r == role)
            .map(|(_, text)| text.clone())
    }
}

pub type SharedSite = Arc<Mutex<Site>>;

pub fn shared(site: Site) -> SharedSite {
    Arc::new(Mutex::new(site))
}

fn lock(site: &SharedSite) -> MutexGuard<'_, Site> {
    site.lock().unwrap()
}

pub struct FakeElement {
    site: SharedSite,
    role: &'static str,
    index: usize,
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn inner_text(&self) -> Result<String, DriverError> {
        let site = lock(&self.site);
        Ok(match self.role {
            "total label" => site.label.clone().unwrap_or_default(),
            "alerts" => site.alerts.get(self.index).cloned().unwrap_or_default(),
            other => other.to_string(),
        })
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        let site = lock(&self.site);
        if self.role == "next page" && name == "disabled" && site.next_disabled() {
            return Ok(Some(String::new()));
        }
        Ok(None)
    }

    async fn click(&self) -> Result<(), DriverError> {
        lock(&self.site).click(self.role);
        Ok(())
    }

    async fn wait_for_state(&self, state: ElementState, timeout: Duration) -> Result<(), DriverError> {
        let mut site = lock(&self.site);
        if site.stale_handles > 0 {
            site.stale_handles -= 1;
            return Err(DriverError::Timeout {
                what: format!("{} to be {state:?}", self.role),
                timeout,
            });
        }
        Ok(())
    }
}

pub struct FakePage {
    site: SharedSite,
    locators: LocatorTable,
    context: u32,
}

impl FakePage {
    pub fn new(site: SharedSite) -> Self {
        Self::in_context(site, 0)
    }

    pub fn in_context(site: SharedSite, context: u32) -> Self {
        Self {
            site,
            locators: LocatorTable::default(),
            context,
        }
    }

    fn element(&self, role: &'static str, index: usize) -> Box<dyn ElementHandle> {
        Box::new(FakeElement {
            site: self.site.clone(),
            role,
            index,
        })
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str, _: Duration) -> Result<(), DriverError> {
        let mut site = lock(&self.site);
        site.url = url.to_string();
        site.menu_step = 0;
        site.stage = if site.authenticated {
            Stage::Landing
        } else {
            Stage::Login
        };
        Ok(())
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> Result<Option<Box<dyn ElementHandle>>, DriverError> {
        let present = lock(&self.site).present(locator.role);
        match (state, present) {
            (ElementState::Visible | ElementState::Attached, true) => {
                Ok(Some(self.element(locator.role, 0)))
            }
            (ElementState::Hidden | ElementState::Detached, false) => Ok(None),
            _ => Err(DriverError::Timeout {
                what: locator.to_string(),
                timeout,
            }),
        }
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let mut site = lock(&self.site);
        if !site.present(locator.role) {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        if locator.role == "login email" && !text.is_empty() {
            site.login_contexts.push(self.context);
        }
        site.fills.push((locator.role, text.to_string()));
        Ok(())
    }

    async fn query(&self, locator: &Locator) -> Result<Option<Box<dyn ElementHandle>>, DriverError> {
        let present = lock(&self.site).present(locator.role);
        Ok(present.then(|| self.element(locator.role, 0)))
    }

    async fn query_all(&self, locator: &Locator) -> Result<Vec<Box<dyn ElementHandle>>, DriverError> {
        if locator.role == "alerts" {
            let count = lock(&self.site).alerts.len();
            return Ok((0..count).map(|i| self.element("alerts", i)).collect());
        }
        Ok(self.query(locator).await?.into_iter().collect())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        let mut site = lock(&self.site);
        let candidates = &self.locators.scroll_candidates;
        if script == scripts::outer_html(self.locators.table_root.css) {
            if site.stage != Stage::Catalog {
                return Ok(Value::Null);
            }
            if site.snapshot_failures > 0 {
                site.snapshot_failures -= 1;
                return Err(DriverError::Script("execution context destroyed".into()));
            }
            return Ok(site
                .pages
                .get(site.current_page)
                .map(|html| Value::String(html.clone()))
                .unwrap_or(Value::Null));
        }
        if script == scripts::content_height(candidates) {
            return Ok(Value::from(site.content_height));
        }
        if script == scripts::scroll_to_end(candidates) {
            site.scrolls += 1;
            return Ok(Value::Bool(true));
        }
        Ok(Value::Null)
    }

    async fn wait_for_timeout(&self, _: Duration) {}

    async fn wait_for_load_state(&self, _: LoadState, _: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn wait_for_url(&self, pattern: &UrlPattern, timeout: Duration) -> Result<(), DriverError> {
        if pattern.matches(&lock(&self.site).url) {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                what: pattern.to_string(),
                timeout,
            })
        }
    }

    async fn clear_cookies(&self) -> Result<(), DriverError> {
        let mut site = lock(&self.site);
        site.cookie_clears += 1;
        site.authenticated = false;
        Ok(())
    }

    async fn storage_state(&self) -> Result<Session, DriverError> {
        Ok(session_with_token(VALID_SESSION))
    }

    async fn restore_state(&self, session: &Session) -> Result<(), DriverError> {
        let mut site = lock(&self.site);
        site.restores += 1;
        site.restored_contexts.insert(self.context);
        site.authenticated = session.cookies.iter().any(|c| c.value == VALID_SESSION);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        lock(&self.site).pages_closed += 1;
        Ok(())
    }
}

pub struct FakeHost {
    site: SharedSite,
}

impl FakeHost {
    pub fn new(site: SharedSite) -> Self {
        Self { site }
    }
}

#[async_trait]
impl BrowserHost for FakeHost {
    async fn new_page(&mut self) -> Result<Box<dyn PageDriver>, DriverError> {
        let context = {
            let mut site = lock(&self.site);
            site.pages_opened += 1;
            site.pages_opened
        };
        Ok(Box::new(FakePage::in_context(self.site.clone(), context)))
    }

    async fn shutdown(self: Box<Self>) -> Result<(), DriverError> {
        lock(&self.site).shut_down = true;
        Ok(())
    }
}

pub fn session_with_token(token: &str) -> Session {
    Session::new(
        vec![StoredCookie {
            name: "sid".to_string(),
            value: token.to_string(),
            domain: "catalog.test".to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
            expires: None,
        }],
        Vec::new(),
    )
}

/// In-memory single-slot session store.
#[derive(Default)]
pub struct MemoryStore {
    pub slot: Mutex<Option<Session>>,
    pub saves: Mutex<u32>,
    pub deletes: Mutex<u32>,
}

impl MemoryStore {
    pub fn holding(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
            ..Self::default()
        }
    }

    pub fn saves(&self) -> u32 {
        *self.saves.lock().unwrap()
    }

    pub fn deletes(&self) -> u32 {
        *self.deletes.lock().unwrap()
    }

    pub fn stored(&self) -> Option<Session> {
        self.slot.lock().unwrap().clone()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Session, SessionError> {
        self.slot
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SessionError::NotFound("memory".into()))
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        *self.saves.lock().unwrap() += 1;
        *self.slot.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    fn delete(&self) -> Result<(), SessionError> {
        *self.deletes.lock().unwrap() += 1;
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}
