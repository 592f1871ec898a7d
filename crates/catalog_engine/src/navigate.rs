use catalog_logging::catalog_info;
use thiserror::Error;

use crate::click::click_with_retry;
use crate::driver::{wait_for_network_idle, DriverError, ElementState, PageDriver};
use crate::settings::RunSettings;

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("could not activate {control}: {source}")]
    Control {
        control: &'static str,
        #[source]
        source: DriverError,
    },
    #[error("catalog table did not appear: {0}")]
    TableMissing(#[source] DriverError),
}

/// Walks the fixed menu path from the dashboard to the catalog table.
pub struct CatalogNavigator<'a> {
    settings: &'a RunSettings,
}

impl<'a> CatalogNavigator<'a> {
    pub fn new(settings: &'a RunSettings) -> Self {
        Self { settings }
    }

    pub async fn reach_catalog(&self, page: &dyn PageDriver) -> Result<(), NavigationError> {
        let locators = &self.settings.locators;
        let timings = &self.settings.timings;

        for control in locators.catalog_path() {
            let failed = |source| NavigationError::Control {
                control: control.role,
                source,
            };
            wait_for_network_idle(page, timings.page_load)
                .await
                .map_err(failed)?;
            catalog_info!("Opening {}", control.role);
            click_with_retry(
                page,
                &control,
                timings.page_load,
                timings.settle,
                &self.settings.retry,
            )
            .await
            .map_err(failed)?;
        }

        page.wait_for(&locators.table_root, ElementState::Visible, timings.page_load)
            .await
            .map_err(NavigationError::TableMissing)?;
        catalog_info!("Reached the full catalog");
        Ok(())
    }
}
