//! Execution phases and the per-run [`ExecutionState`] record.

use std::collections::BTreeSet;

use mesamate_route::StationId;

/// Where the controller is in its dispatch cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No active route.
    Idle,
    /// About to send the next command, or stalled after a failed send.
    Dispatching,
    /// One direction command is outstanding.
    AwaitingAck,
    /// A segment ended at a station; waiting for the operator's yes/no.
    AwaitingConfirmation,
    /// Every segment finished; reported, then back to `Idle`.
    Complete,
}

/// Progress through one route. Fully initialised when a run starts and
/// discarded when it completes or is aborted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionState {
    /// Index into `Route::segments`.
    pub segment: usize,
    /// Index into the current segment's commands.
    pub command: usize,
    /// Set while a direction command is outstanding.
    pub busy: bool,
    /// Stations whose delivery the operator confirmed.
    pub confirmed: BTreeSet<StationId>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }
}
