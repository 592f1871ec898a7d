use catalog_core::{
    parse_table_html, update, AdvisoryTotal, DoneReason, HarvestEffect, HarvestMsg, HarvestState,
    NextControl, Record, TableSnapshot,
};
use catalog_logging::{catalog_debug, catalog_info, catalog_warn};
use serde_json::Value;
use thiserror::Error;

use crate::click::click_with_retry;
use crate::driver::{wait_for_network_idle, DriverError, ElementState, PageDriver};
use crate::scripts;
use crate::settings::RunSettings;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("catalog table not found: {0}")]
    TableNotFound(#[source] DriverError),
    #[error("catalog table header could not be read")]
    HeaderUnreadable,
    #[error("page {page} could not be read: {source}")]
    PageUnreadable {
        page: u32,
        #[source]
        source: DriverError,
    },
    #[error("could not move past page {page}: {source}")]
    Pagination {
        page: u32,
        #[source]
        source: DriverError,
    },
}

/// Failure of one table read, before retries are exhausted.
#[derive(Debug, Error)]
enum ReadError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("table header is empty")]
    EmptyHeader,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarvestOutcome {
    pub records: Vec<Record>,
    pub headers: Vec<String>,
    pub pages: u32,
    pub advisory_total: Option<AdvisoryTotal>,
    pub rejected_rows: usize,
    pub done_reason: Option<DoneReason>,
}

/// Executes the harvest state machine's effects against a page positioned on
/// the catalog table.
pub struct TableHarvester<'a> {
    settings: &'a RunSettings,
}

impl<'a> TableHarvester<'a> {
    pub fn new(settings: &'a RunSettings) -> Self {
        Self { settings }
    }

    pub async fn harvest(&self, page: &dyn PageDriver) -> Result<HarvestOutcome, HarvestError> {
        let mut state = HarvestState::new(self.settings.harvest.clone());
        let mut effect = state.pending_effect();

        loop {
            let msg = match effect {
                HarvestEffect::Finish => break,
                HarvestEffect::LocateTable => self.locate_table(page).await?,
                HarvestEffect::ReadTotalLabel => self.read_total_label(page).await,
                HarvestEffect::AwaitRows { page: number } => {
                    catalog_info!("Processing page {number}...");
                    self.await_rows(page, number).await?
                }
                HarvestEffect::TakeSnapshot => self.take_snapshot(page, state.page()).await?,
                HarvestEffect::Scroll => self.scroll(page, state.page()).await?,
                HarvestEffect::ProbeNextControl => self.probe_next(page, state.page()).await?,
                HarvestEffect::ActivateNext { page: number } => {
                    self.activate_next(page, number).await?
                }
            };

            let (next, next_effect) = update(state, msg);
            state = next;
            self.report(effect, &state);
            effect = next_effect;
        }

        catalog_info!(
            "Collected {} products from {} pages ({:?})",
            state.records().len(),
            state.page(),
            state.done_reason()
        );

        let pages = state.page();
        let headers = state.headers().to_vec();
        let advisory_total = state.advisory_total();
        let rejected_rows = state.rejected_total();
        let done_reason = state.done_reason();
        Ok(HarvestOutcome {
            records: state.into_records(),
            headers,
            pages,
            advisory_total,
            rejected_rows,
            done_reason,
        })
    }

    /// Log what the last step changed.
    fn report(&self, executed: HarvestEffect, state: &HarvestState) {
        match executed {
            HarvestEffect::TakeSnapshot => {
                if let Some(merge) = state.last_merge() {
                    for rejected in &merge.rejected {
                        catalog_warn!(
                            "Row has {} cells, expected {}: {}",
                            rejected.cells,
                            rejected.expected,
                            rejected.identity
                        );
                    }
                    catalog_debug!(
                        "Page {}: {} new, {} duplicate, {} incomplete",
                        merge.page,
                        merge.accepted,
                        merge.duplicates,
                        merge.incomplete
                    );
                }
            }
            HarvestEffect::Scroll => {
                if let Some(verdict) = state.last_scroll() {
                    catalog_debug!("Scrolling table... ({verdict:?})");
                }
            }
            HarvestEffect::ProbeNextControl => {
                let total = state.advisory_total().map_or(0, |t| t.value);
                catalog_info!(
                    "Scraped {} of {} products (advisory)...",
                    state.records().len(),
                    total
                );
            }
            _ => {}
        }
    }

    async fn locate_table(&self, page: &dyn PageDriver) -> Result<HarvestMsg, HarvestError> {
        let locators = &self.settings.locators;
        let timeout = self.settings.timings.page_load;

        let headers = self
            .settings
            .retry
            .run("read table header", |_| async move {
                page.wait_for(&locators.table_root, ElementState::Visible, timeout)
                    .await?;
                let snapshot = self.read_snapshot(page).await?;
                if snapshot.headers.is_empty() {
                    return Err(ReadError::EmptyHeader);
                }
                Ok(snapshot.headers)
            })
            .await
            .map_err(|err| match err {
                ReadError::Driver(source) => HarvestError::TableNotFound(source),
                ReadError::EmptyHeader => HarvestError::HeaderUnreadable,
            })?;

        catalog_info!("Table columns: {}", headers.join(", "));
        Ok(HarvestMsg::TableLocated { headers })
    }

    /// Text of the count label; an unreadable label yields `None`.
    async fn read_total_label(&self, page: &dyn PageDriver) -> HarvestMsg {
        let locator = &self.settings.locators.total_label;
        let label = match page
            .wait_for(locator, ElementState::Visible, self.settings.timings.page_load)
            .await
        {
            Ok(Some(element)) => element.inner_text().await.ok(),
            Ok(None) => None,
            Err(err) => {
                catalog_warn!("Product count text not found: {err}");
                None
            }
        };
        match label.as_deref() {
            Some(text) => catalog_info!("Found product count text: {}", text.trim()),
            None => catalog_warn!(
                "Using default total of {} products",
                self.settings.harvest.default_total
            ),
        }
        HarvestMsg::TotalLabelRead(label)
    }

    async fn await_rows(&self, page: &dyn PageDriver, number: u32) -> Result<HarvestMsg, HarvestError> {
        let locators = &self.settings.locators;
        let timeout = self.settings.timings.page_load;

        let content_height = self
            .settings
            .retry
            .run("wait for table rows", |_| async move {
                page.wait_for(&locators.data_row, ElementState::Attached, timeout)
                    .await?;
                self.content_height(page).await
            })
            .await
            .map_err(|source| HarvestError::PageUnreadable {
                page: number,
                source,
            })?;
        Ok(HarvestMsg::RowsRendered { content_height })
    }

    async fn take_snapshot(&self, page: &dyn PageDriver, number: u32) -> Result<HarvestMsg, HarvestError> {
        let timings = &self.settings.timings;

        let snapshot = self
            .settings
            .retry
            .run("extract rows", |_| async move {
                wait_for_network_idle(page, timings.page_load).await?;
                page.wait_for_timeout(timings.stabilize).await;
                self.read_snapshot(page).await
            })
            .await
            .map_err(|source| HarvestError::PageUnreadable {
                page: number,
                source,
            })?;
        Ok(HarvestMsg::SnapshotTaken(snapshot))
    }

    async fn scroll(&self, page: &dyn PageDriver, number: u32) -> Result<HarvestMsg, HarvestError> {
        let candidates = &self.settings.locators.scroll_candidates;
        let pause = self.settings.timings.scroll_pause;

        let content_height = self
            .settings
            .retry
            .run("scroll table", |_| async move {
                page.evaluate(&scripts::scroll_to_end(candidates)).await?;
                page.wait_for_timeout(pause).await;
                self.content_height(page).await
            })
            .await
            .map_err(|source| HarvestError::PageUnreadable {
                page: number,
                source,
            })?;
        Ok(HarvestMsg::ScrollSampled { content_height })
    }

    async fn probe_next(&self, page: &dyn PageDriver, number: u32) -> Result<HarvestMsg, HarvestError> {
        let locator = &self.settings.locators.next_page;
        let found = page
            .wait_for(locator, ElementState::Visible, self.settings.timings.next_probe)
            .await;

        let control = match found {
            Ok(Some(element)) => {
                let disabled = element
                    .attribute("disabled")
                    .await
                    .map_err(|source| HarvestError::Pagination { page: number, source })?
                    .is_some();
                let aria_disabled = element
                    .attribute("aria-disabled")
                    .await
                    .map_err(|source| HarvestError::Pagination { page: number, source })?
                    .is_some_and(|value| value == "true");
                if disabled || aria_disabled {
                    catalog_info!("Next button is disabled");
                    NextControl::Disabled
                } else {
                    NextControl::Enabled
                }
            }
            Ok(None) => NextControl::Absent,
            Err(DriverError::Timeout { .. }) | Err(DriverError::NotFound(_)) => {
                catalog_info!("Next button not found");
                NextControl::Absent
            }
            Err(source) => return Err(HarvestError::Pagination { page: number, source }),
        };
        Ok(HarvestMsg::NextControlProbed(control))
    }

    async fn activate_next(&self, page: &dyn PageDriver, number: u32) -> Result<HarvestMsg, HarvestError> {
        let locators = &self.settings.locators;
        let timings = &self.settings.timings;

        catalog_info!("Clicking Next button...");
        click_with_retry(
            page,
            &locators.next_page,
            timings.page_load,
            timings.stabilize,
            &self.settings.retry,
        )
        .await
        .map_err(|source| HarvestError::Pagination { page: number, source })?;

        // A loading indicator that never hides is tolerated.
        match page
            .wait_for(&locators.loading_indicator, ElementState::Hidden, timings.settle)
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_timeout() => catalog_debug!("Loading indicator still shown: {err}"),
            Err(source) => return Err(HarvestError::Pagination { page: number, source }),
        }
        page.wait_for_timeout(timings.settle).await;
        Ok(HarvestMsg::PageTurned)
    }

    async fn read_snapshot(&self, page: &dyn PageDriver) -> Result<TableSnapshot, DriverError> {
        let locators = &self.settings.locators;
        let table = &locators.table_root;
        match page.evaluate(&scripts::outer_html(table.css)).await? {
            Value::String(html) => Ok(parse_table_html(&html, &locators.table_selectors())),
            _ => Err(DriverError::NotFound(table.to_string())),
        }
    }

    async fn content_height(&self, page: &dyn PageDriver) -> Result<u64, DriverError> {
        let value = page
            .evaluate(&scripts::content_height(&self.settings.locators.scroll_candidates))
            .await?;
        value
            .as_u64()
            .or_else(|| value.as_f64().map(|h| h.max(0.0).round() as u64))
            .ok_or_else(|| DriverError::Script(format!("content height is not a number: {value}")))
    }
}
