use std::path::PathBuf;

use catalog_logging::{catalog_info, catalog_warn};
use thiserror::Error;

use crate::auth::{AuthError, Authenticator};
use crate::driver::{BrowserHost, DriverError, ElementState, PageDriver};
use crate::export::{write_records, ExportError};
use crate::harvest::{HarvestError, TableHarvester};
use crate::navigate::{CatalogNavigator, NavigationError};
use crate::session::{Session, SessionError, SessionStore};
use crate::settings::RunSettings;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("browser failure")]
    Driver(#[from] DriverError),
    #[error("authentication failed")]
    Auth(#[from] AuthError),
    #[error("navigation to the catalog failed")]
    Navigation(#[from] NavigationError),
    #[error("harvest failed")]
    Harvest(#[from] HarvestError),
    #[error("writing the output failed")]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub records: usize,
    pub pages: u32,
    pub output: PathBuf,
    pub session_reused: bool,
}

/// Run the whole pipeline once: restore or log in, navigate, harvest, write.
///
/// Every page opened here is closed and the browser shut down on all paths.
pub async fn run(
    mut host: Box<dyn BrowserHost>,
    store: &dyn SessionStore,
    settings: &RunSettings,
) -> Result<RunSummary, PipelineError> {
    let mut pages = Vec::new();
    let result = run_pipeline(host.as_mut(), &mut pages, store, settings).await;

    for page in pages {
        if let Err(err) = page.close().await {
            catalog_warn!("Error closing page: {err}");
        }
    }
    if let Err(err) = host.shutdown().await {
        catalog_warn!("Error closing browser: {err}");
    }
    result
}

async fn run_pipeline(
    host: &mut dyn BrowserHost,
    pages: &mut Vec<Box<dyn PageDriver>>,
    store: &dyn SessionStore,
    settings: &RunSettings,
) -> Result<RunSummary, PipelineError> {
    let session_reused = restore_session(host, pages, store, settings).await?;
    if !session_reused {
        pages.push(host.new_page().await?);
        let page = current(pages)?;
        Authenticator::new(settings).login(page, store).await?;
    }

    let page = current(pages)?;
    CatalogNavigator::new(settings).reach_catalog(page).await?;
    let outcome = TableHarvester::new(settings).harvest(page).await?;
    let summary = write_records(&outcome.records, &settings.output_path)?;

    Ok(RunSummary {
        records: summary.records,
        pages: outcome.pages,
        output: summary.path,
        session_reused,
    })
}

fn current(pages: &[Box<dyn PageDriver>]) -> Result<&dyn PageDriver, DriverError> {
    pages
        .last()
        .map(|page| page.as_ref())
        .ok_or_else(|| DriverError::State("no page is open".into()))
}

/// Try the stored session. Returns whether an authenticated page is ready.
///
/// A missing, unreadable or rejected session is deleted and reported as `false`.
async fn restore_session(
    host: &mut dyn BrowserHost,
    pages: &mut Vec<Box<dyn PageDriver>>,
    store: &dyn SessionStore,
    settings: &RunSettings,
) -> Result<bool, PipelineError> {
    let session = match store.load() {
        Ok(session) => session,
        Err(SessionError::NotFound(path)) => {
            catalog_info!("No stored session at {}", path.display());
            return Ok(false);
        }
        Err(err) => {
            catalog_warn!("Failed to load session: {err}");
            discard(store);
            return Ok(false);
        }
    };

    let page = host.new_page().await?;
    match validate(page.as_ref(), &session, settings).await {
        Ok(()) => {
            catalog_info!("Session is still valid");
            pages.push(page);
            Ok(true)
        }
        Err(err) => {
            catalog_warn!("Session validation failed: {err}");
            if let Err(close_err) = page.close().await {
                catalog_warn!("Error closing page: {close_err}");
            }
            discard(store);
            Ok(false)
        }
    }
}

#[derive(Debug, Error)]
enum ValidationError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("authenticated landmark not shown: {0}")]
    NotAuthenticated(#[source] DriverError),
    #[error(transparent)]
    Entry(#[from] AuthError),
}

async fn validate(
    page: &dyn PageDriver,
    session: &Session,
    settings: &RunSettings,
) -> Result<(), ValidationError> {
    let timings = &settings.timings;
    page.restore_state(session).await?;
    page.goto(&settings.entry_url, timings.page_load).await?;
    page.wait_for(&settings.locators.launch_action, ElementState::Visible, timings.settle)
        .await
        .map_err(ValidationError::NotAuthenticated)?;
    Authenticator::new(settings).enter_application(page).await?;
    Ok(())
}

fn discard(store: &dyn SessionStore) {
    if let Err(err) = store.delete() {
        catalog_warn!("Could not delete stored session: {err}");
    }
}
