/// Page interaction the harvest state machine asks the driver to perform next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestEffect {
    LocateTable,
    ReadTotalLabel,
    AwaitRows { page: u32 },
    TakeSnapshot,
    Scroll,
    ProbeNextControl,
    ActivateNext { page: u32 },
    Finish,
}
