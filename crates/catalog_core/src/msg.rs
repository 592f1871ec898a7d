use crate::table::TableSnapshot;

/// State of the "Next" pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    Absent,
    Disabled,
    Enabled,
}

/// Observations fed back into the harvest state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestMsg {
    /// The table root was found and its header row read.
    TableLocated { headers: Vec<String> },
    /// Text of the "Showing X of N" label, if it could be read.
    TotalLabelRead(Option<String>),
    /// At least one data row is rendered; content height of the scroll container.
    RowsRendered { content_height: u64 },
    /// Rows currently in the table.
    SnapshotTaken(TableSnapshot),
    /// Content height sampled after one scroll attempt.
    ScrollSampled { content_height: u64 },
    /// Result of looking for the "Next" control.
    NextControlProbed(NextControl),
    /// The "Next" control was activated and the table updated.
    PageTurned,
}
