use crate::state::{DoneReason, HarvestPhase};
use crate::{HarvestEffect, HarvestMsg, HarvestState, NextControl};

/// Pure update function: applies an observation to the harvest state and
/// returns the next page interaction to perform.
///
/// Messages that do not belong to the current phase leave the state untouched
/// and re-issue the pending effect.
pub fn update(mut state: HarvestState, msg: HarvestMsg) -> (HarvestState, HarvestEffect) {
    match (state.phase(), msg) {
        (HarvestPhase::Init, HarvestMsg::TableLocated { headers }) => {
            state.set_headers(headers);
            state.phase = HarvestPhase::DiscoverTotal;
        }
        (HarvestPhase::DiscoverTotal, HarvestMsg::TotalLabelRead(label)) => {
            // Advisory only: the total never decides when the harvest ends.
            state.set_total_label(label.as_deref());
            state.phase = HarvestPhase::LoadPage;
        }
        (HarvestPhase::LoadPage, HarvestMsg::RowsRendered { content_height }) => {
            state.begin_page(content_height);
            state.phase = HarvestPhase::ExtractRows;
        }
        (HarvestPhase::ExtractRows, HarvestMsg::SnapshotTaken(snapshot)) => {
            state.merge_snapshot(&snapshot);
            state.phase = if state.scroll_finished() {
                HarvestPhase::CheckNextPage
            } else {
                HarvestPhase::ScrollMore
            };
        }
        (HarvestPhase::ScrollMore, HarvestMsg::ScrollSampled { content_height }) => {
            state.observe_scroll(content_height);
            state.phase = HarvestPhase::ExtractRows;
        }
        (HarvestPhase::CheckNextPage, HarvestMsg::NextControlProbed(control)) => {
            let may_continue = state.settle_page();
            match control {
                NextControl::Enabled if may_continue => state.phase = HarvestPhase::TurnPage,
                NextControl::Enabled => state.finish(DoneReason::StalePages),
                NextControl::Disabled => state.finish(DoneReason::NextDisabled),
                NextControl::Absent => state.finish(DoneReason::NoNextControl),
            }
        }
        (HarvestPhase::TurnPage, HarvestMsg::PageTurned) => {
            state.advance_page();
            state.phase = HarvestPhase::LoadPage;
        }
        _ => {}
    }

    let effect = state.pending_effect();
    (state, effect)
}
