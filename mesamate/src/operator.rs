//! Terminal notifications for the execution controller.

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::sync::Arc;

use mesamate_link::{LinkError, Operator};
use mesamate_route::{DirectionCommand, RouteSegment, StationId};
use parking_lot::Mutex;

/// The station whose delivery the controller is waiting on, shared between
/// the controller thread and the console thread.
#[derive(Clone, Debug, Default)]
pub struct PendingConfirmation {
    station: Arc<Mutex<Option<StationId>>>,
}

impl PendingConfirmation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, station: StationId) {
        *self.station.lock() = Some(station);
    }

    pub fn current(&self) -> Option<StationId> {
        *self.station.lock()
    }

    pub fn clear(&self) {
        *self.station.lock() = None;
    }
}

/// Prints progress and prompts to a terminal.
pub struct TerminalOperator<W: Write = io::Stdout> {
    out: W,
    pending: PendingConfirmation,
}

impl TerminalOperator {
    pub fn stdout(pending: PendingConfirmation) -> Self {
        Self::new(io::stdout(), pending)
    }
}

impl<W: Write> TerminalOperator<W> {
    pub fn new(out: W, pending: PendingConfirmation) -> Self {
        Self { out, pending }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn say(&mut self, message: std::fmt::Arguments<'_>) {
        if writeln!(self.out, "{message}").and_then(|_| self.out.flush()).is_err() {
            log::warn!("terminal output failed: {message}");
        }
    }
}

impl<W: Write> Operator for TerminalOperator<W> {
    fn request_confirmation(&mut self, segment: &RouteSegment, station: StationId) {
        self.pending.set(station);
        self.say(format_args!(
            "{} finished. Was the food received at {station}? [yes/no]",
            segment.description
        ));
    }

    fn run_completed(&mut self, confirmed: &BTreeSet<StationId>) {
        self.pending.clear();
        let names: Vec<String> = confirmed.iter().map(ToString::to_string).collect();
        self.say(format_args!(
            "All orders have been completed. Delivered: {}",
            if names.is_empty() { "none".to_string() } else { names.join(", ") }
        ));
    }

    fn link_error(&mut self, error: &LinkError) {
        match error {
            LinkError::AckTimeout { .. } => self.say(format_args!(
                "Link error: {error}. `retry` sends the command again; use it only if the \
                 robot did not move, otherwise `abort`."
            )),
            _ => self.say(format_args!("Link error: {error}. Type `retry` or `abort`.")),
        }
    }

    fn request_rejected(&mut self, error: &LinkError) {
        self.say(format_args!("Request refused: {error}"));
    }

    fn segment_started(&mut self, segment: &RouteSegment) {
        self.pending.clear();
        self.say(format_args!("{} started", segment.description));
    }

    fn command_sent(&mut self, _segment: &RouteSegment, index: usize, command: DirectionCommand) {
        log::debug!("direction {} sent: {command}", index + 1);
    }

    fn delivery_rejected(&mut self, station: StationId) {
        self.say(format_args!(
            "Food not received at {station}, alert sounded. Answer `yes` once delivered."
        ));
    }

    fn run_aborted(&mut self) {
        self.pending.clear();
        self.say(format_args!("Delivery run aborted."));
    }

    fn device_line(&mut self, line: &str) {
        self.say(format_args!("device: {line}"));
    }
}
