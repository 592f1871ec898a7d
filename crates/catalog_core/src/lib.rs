//! Catalog core: pure harvest state machine and table/record model.
mod effect;
mod msg;
mod record;
mod scroll;
mod state;
mod table;
mod total;
mod update;
mod url_pattern;

pub use effect::HarvestEffect;
pub use msg::{HarvestMsg, NextControl};
pub use record::{Record, RowIdentity};
pub use scroll::{ScrollTracker, ScrollVerdict, DEFAULT_MAX_SCROLL_ROUNDS, DEFAULT_STABLE_SAMPLES};
pub use state::{DoneReason, HarvestPhase, HarvestSettings, HarvestState, MergeReport, RowRejected};
pub use table::{
    normalize_whitespace, parse_table_html, RenderedRow, TableSelectors, TableSnapshot,
    ROW_ID_ATTRIBUTE,
};
pub use total::{parse_advisory_total, AdvisoryTotal, TotalSource, DEFAULT_ADVISORY_TOTAL};
pub use update::update;
pub use url_pattern::UrlPattern;
