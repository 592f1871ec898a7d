use std::collections::HashSet;

use crate::scroll::{ScrollTracker, ScrollVerdict, DEFAULT_MAX_SCROLL_ROUNDS, DEFAULT_STABLE_SAMPLES};
use crate::table::TableSnapshot;
use crate::total::{parse_advisory_total, AdvisoryTotal, DEFAULT_ADVISORY_TOTAL};
use crate::{HarvestEffect, Record, RowIdentity};

/// Tunables for one harvest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSettings {
    /// Advisory total used when the count label is unreadable.
    pub default_total: usize,
    /// Unchanged content-height samples before a container counts as exhausted.
    pub stable_samples: u32,
    /// Hard cap on scroll rounds per page.
    pub max_scroll_rounds: u32,
    /// Consecutive pages without new rows after which pagination stops.
    pub stale_page_limit: u32,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            default_total: DEFAULT_ADVISORY_TOTAL,
            stable_samples: DEFAULT_STABLE_SAMPLES,
            max_scroll_rounds: DEFAULT_MAX_SCROLL_ROUNDS,
            stale_page_limit: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HarvestPhase {
    #[default]
    Init,
    DiscoverTotal,
    LoadPage,
    ExtractRows,
    ScrollMore,
    CheckNextPage,
    TurnPage,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    NoNextControl,
    NextDisabled,
    StalePages,
}

/// A row dropped because its cell count does not match the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejected {
    pub identity: RowIdentity,
    pub cells: usize,
    pub expected: usize,
}

/// Outcome of reconciling one snapshot against the collected records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeReport {
    pub page: u32,
    pub accepted: usize,
    pub duplicates: usize,
    /// Rows with one or more blank cells; not marked seen so a later pass can accept them.
    pub incomplete: usize,
    pub rejected: Vec<RowRejected>,
}

/// Mutable state owned by the harvester for one run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarvestState {
    pub(crate) phase: HarvestPhase,
    settings: HarvestSettings,
    headers: Vec<String>,
    records: Vec<Record>,
    seen: HashSet<RowIdentity>,
    /// Rows already reported as rejected; they stay out of `seen`.
    rejected: HashSet<RowIdentity>,
    page: u32,
    advisory_total: Option<AdvisoryTotal>,
    scroll: Option<ScrollTracker>,
    last_scroll: Option<ScrollVerdict>,
    new_on_page: usize,
    stale_pages: u32,
    last_merge: Option<MergeReport>,
    rejected_total: usize,
    done_reason: Option<DoneReason>,
}

impl HarvestState {
    pub fn new(settings: HarvestSettings) -> Self {
        Self {
            settings,
            page: 1,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> HarvestPhase {
        self.phase
    }

    /// The effect the current phase is waiting on.
    pub fn pending_effect(&self) -> HarvestEffect {
        match self.phase {
            HarvestPhase::Init => HarvestEffect::LocateTable,
            HarvestPhase::DiscoverTotal => HarvestEffect::ReadTotalLabel,
            HarvestPhase::LoadPage => HarvestEffect::AwaitRows { page: self.page },
            HarvestPhase::ExtractRows => HarvestEffect::TakeSnapshot,
            HarvestPhase::ScrollMore => HarvestEffect::Scroll,
            HarvestPhase::CheckNextPage => HarvestEffect::ProbeNextControl,
            HarvestPhase::TurnPage => HarvestEffect::ActivateNext { page: self.page },
            HarvestPhase::Done => HarvestEffect::Finish,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == HarvestPhase::Done
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn advisory_total(&self) -> Option<AdvisoryTotal> {
        self.advisory_total
    }

    pub fn last_merge(&self) -> Option<&MergeReport> {
        self.last_merge.as_ref()
    }

    pub fn last_scroll(&self) -> Option<ScrollVerdict> {
        self.last_scroll
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected_total
    }

    pub fn done_reason(&self) -> Option<DoneReason> {
        self.done_reason
    }

    pub(crate) fn set_headers(&mut self, headers: Vec<String>) {
        self.headers = unique_column_names(headers);
    }

    pub(crate) fn set_total_label(&mut self, label: Option<&str>) {
        self.advisory_total = Some(parse_advisory_total(label, self.settings.default_total));
    }

    pub(crate) fn begin_page(&mut self, content_height: u64) {
        self.scroll = Some(ScrollTracker::new(
            content_height,
            self.settings.stable_samples,
            self.settings.max_scroll_rounds,
        ));
        self.last_scroll = None;
        self.new_on_page = 0;
    }

    pub(crate) fn observe_scroll(&mut self, content_height: u64) {
        if let Some(tracker) = self.scroll.as_mut() {
            self.last_scroll = Some(tracker.observe(content_height));
        }
    }

    pub(crate) fn scroll_finished(&self) -> bool {
        self.scroll.as_ref().map_or(true, ScrollTracker::is_finished)
    }

    pub(crate) fn merge_snapshot(&mut self, snapshot: &TableSnapshot) {
        let mut report = MergeReport {
            page: self.page,
            ..MergeReport::default()
        };

        for row in &snapshot.rows {
            let identity = row.identity();
            if self.seen.contains(&identity) {
                report.duplicates += 1;
                continue;
            }
            let Some(record) = Record::from_cells(&self.headers, &row.cells) else {
                if self.rejected.insert(identity.clone()) {
                    report.rejected.push(RowRejected {
                        identity,
                        cells: row.cells.len(),
                        expected: self.headers.len(),
                    });
                }
                continue;
            };
            if row.cells.iter().any(|cell| cell.is_empty()) {
                report.incomplete += 1;
                continue;
            }
            self.records.push(record);
            self.seen.insert(identity);
            report.accepted += 1;
        }

        self.new_on_page += report.accepted;
        self.rejected_total += report.rejected.len();
        self.last_merge = Some(report);
    }

    /// Close out the current page; returns whether pagination may continue.
    pub(crate) fn settle_page(&mut self) -> bool {
        if self.new_on_page == 0 {
            self.stale_pages += 1;
        } else {
            self.stale_pages = 0;
        }
        self.stale_pages < self.settings.stale_page_limit
    }

    pub(crate) fn advance_page(&mut self) {
        self.page += 1;
    }

    pub(crate) fn finish(&mut self, reason: DoneReason) {
        self.done_reason = Some(reason);
        self.phase = HarvestPhase::Done;
    }
}

/// Column names as record keys: a blank header becomes `column_N` (1-based
/// position) and a repeated name gets a `_2`, `_3`, ... suffix.
fn unique_column_names(headers: Vec<String>) -> Vec<String> {
    let mut taken = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let base = if name.is_empty() {
                format!("column_{}", index + 1)
            } else {
                name
            };
            let mut candidate = base.clone();
            let mut suffix = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{base}_{suffix}");
                suffix += 1;
            }
            candidate
        })
        .collect()
}
