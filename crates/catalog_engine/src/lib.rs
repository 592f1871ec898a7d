//! Catalog engine: browser IO, login, navigation, harvest execution and persistence.
mod auth;
mod chromium;
mod click;
mod driver;
mod export;
mod harvest;
mod locators;
mod navigate;
mod orchestrator;
mod persist;
mod retry;
pub mod scripts;
mod session;
mod settings;

pub use auth::{AuthError, Authenticator, APPLICATION_URL_PATTERN};
pub use chromium::ChromiumHost;
pub use click::click_with_retry;
pub use driver::{
    wait_for_network_idle, BrowserHost, DriverError, ElementHandle, ElementState, LoadState,
    PageDriver,
};
pub use export::{render_records, write_records, ExportError, ExportSummary};
pub use harvest::{HarvestError, HarvestOutcome, TableHarvester};
pub use locators::{Locator, LocatorTable};
pub use navigate::{CatalogNavigator, NavigationError};
pub use orchestrator::{run, PipelineError, RunSummary};
pub use persist::{ensure_parent_dir, remove_if_exists, write_atomic, PersistError};
pub use retry::{Backoff, RetryPolicy};
pub use session::{
    FileSessionStore, OriginStorage, Session, SessionError, SessionStore, StorageEntry,
    StoredCookie,
};
pub use settings::{BrowserSettings, Credentials, RunSettings, Timings, DEFAULT_ENTRY_URL};
