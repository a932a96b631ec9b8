//! Typed events consumed by the [`ExecutionController`](crate::ExecutionController).

use crossbeam_channel::{Receiver, Sender, bounded};
use mesamate_route::{Route, StationId};

/// Queue capacity used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Everything that can wake the controller.
#[derive(Debug)]
pub enum Event {
    // --- posted by the listener ---
    /// The device reported `DIRECTION_DONE`.
    Ack,
    /// Any other line from the device.
    DeviceLine(String),
    /// Reading the channel failed.
    LinkFailed(String),

    // --- posted by the operator front-end ---
    /// Begin executing a planned route.
    Start(Route),
    /// Result of the delivery-confirmation handshake for `station`.
    Confirmation { station: StationId, delivered: bool },
    /// Re-send the command that failed or timed out.
    Retry,
    /// Abandon the current run.
    Abort,
    /// Run the LED diagnostic.
    TestLeds,
    /// Stop the controller loop.
    Shutdown,
}

/// Create the bounded single-consumer queue shared by the listener, the
/// operator front-end and the controller.
pub fn event_queue(capacity: usize) -> (Sender<Event>, Receiver<Event>) {
    bounded(capacity.max(1))
}
