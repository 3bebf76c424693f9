//! The classification driver.

use acl_types::Action;
use tracing::debug;

use crate::bucket::{NoProbe, RuleProbe};
use crate::packet::{extract, PacketTuple, Skip};
use crate::store::AclStore;
use crate::table::classify_table;
use crate::MAX_TABLES;

/// Per-packet scratch state threaded through the table and bucket steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchState {
    pub tuple: PacketTuple,
    /// Table currently being visited.
    pub table_id: u32,
    /// Hash of the packet under the current table.
    pub hash: u32,
    pub matched: bool,
    pub action: Action,
}

impl MatchState {
    pub const fn new(tuple: PacketTuple) -> Self {
        MatchState {
            tuple,
            table_id: 0,
            hash: 0,
            matched: false,
            action: Action::Pass,
        }
    }
}

/// Terminal state of one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A rule in `table_id` matched.
    Matched { table_id: u32, action: Action },
    /// Every table was visited without a match.
    Exhausted,
    /// The frame was not classified.
    Skipped(Skip),
}

impl Verdict {
    /// The action handed to the host. Anything but a match passes.
    pub const fn action(&self) -> Action {
        match self {
            Verdict::Matched { action, .. } => *action,
            Verdict::Exhausted | Verdict::Skipped(_) => Action::Pass,
        }
    }

    pub const fn is_match(&self) -> bool {
        matches!(self, Verdict::Matched { .. })
    }
}

/// Classifies a raw frame. This is the per-frame entry point.
#[inline]
pub fn classify(store: &AclStore, frame: &[u8]) -> Action {
    classify_frame(store, frame).action()
}

/// Classifies a raw frame, reporting how the decision was reached.
pub fn classify_frame(store: &AclStore, frame: &[u8]) -> Verdict {
    match extract(frame) {
        Ok(tuple) => classify_tuple(store, &tuple),
        Err(skip) => {
            debug!(?skip, len = frame.len(), "frame skipped");
            Verdict::Skipped(skip)
        }
    }
}

/// Classifies an already extracted tuple.
#[inline]
pub fn classify_tuple(store: &AclStore, tuple: &PacketTuple) -> Verdict {
    classify_tuple_with_probe(store, tuple, &mut NoProbe)
}

/// Classifies a tuple, reporting every predicate evaluation to `probe`.
///
/// Visits at most [`MAX_TABLES`] tables and stops at the first match.
pub fn classify_tuple_with_probe<P: RuleProbe + ?Sized>(
    store: &AclStore,
    tuple: &PacketTuple,
    probe: &mut P,
) -> Verdict {
    let mut state = MatchState::new(*tuple);

    for table in store.tables().iter().take(MAX_TABLES) {
        if classify_table(store, table, &mut state, probe) {
            debug!(
                table_id = state.table_id,
                hash = state.hash,
                action = %state.action,
                "rule matched"
            );
            return Verdict::Matched {
                table_id: state.table_id,
                action: state.action,
            };
        }
    }

    debug!(tables = store.table_count(), "no rule matched");
    Verdict::Exhausted
}
