//! The execution state machine.
//!
//! ```text
//! Idle ─start─▶ Dispatching ─send─▶ AwaitingAck ─ack─▶ Dispatching …
//!                    │ segment exhausted
//!                    ▼
//!          AwaitingConfirmation ─yes─▶ next segment / Complete ─▶ Idle
//!                    └─no─▶ BUZZER_ON, stay
//! ```
//!
//! Direction command *k + 1* is never written before the acknowledgment of
//! command *k* has been consumed, and segment *n + 1* never starts before
//! segment *n*'s confirmation resolved positively. Segments that end at home
//! need no confirmation.

use std::collections::{BTreeSet, VecDeque};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use mesamate_route::{
    DEFAULT_MAX_STATIONS, DirectionCommand, Route, RouteSegment, StationId, Waypoint,
};

use crate::context::Context;
use crate::error::{LinkError, Result};
use crate::event::Event;
use crate::protocol::Command;
use crate::state::{ExecutionState, Phase};
use crate::transport::{Transport, send_command};

/// Upper bound on a single blocking wait, so cancellation is noticed.
const CONTEXT_POLL: Duration = Duration::from_millis(100);

/// Tunables for the [`ExecutionController`].
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// How long to wait for `DIRECTION_DONE` before telling the operator.
    /// `None` waits indefinitely.
    pub ack_timeout: Option<Duration>,
    /// Number of per-leg indicators on the device. `PATH_START:<n + 1>`
    /// lights all of them.
    pub indicator_count: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            ack_timeout: None,
            indicator_count: DEFAULT_MAX_STATIONS as u32,
        }
    }
}

/// The operator-facing collaborator.
///
/// Notifications are synchronous calls from the controller thread. Answers
/// (confirmation, retry, abort) travel back as [`Event`]s.
pub trait Operator {
    /// Ask whether `station` received its delivery. The answer must be
    /// posted as [`Event::Confirmation`].
    fn request_confirmation(&mut self, segment: &RouteSegment, station: StationId);

    /// Every segment finished.
    fn run_completed(&mut self, confirmed: &BTreeSet<StationId>);

    /// A channel error or timeout stalled the run.
    fn link_error(&mut self, error: &LinkError);

    /// A request was refused in the current phase; the run is unaffected.
    fn request_rejected(&mut self, error: &LinkError) {
        log::warn!("request rejected: {error}");
    }

    fn segment_started(&mut self, _segment: &RouteSegment) {}

    fn command_sent(&mut self, _segment: &RouteSegment, _index: usize, _command: DirectionCommand) {}

    /// The operator answered "not received"; the alert has been sounded.
    fn delivery_rejected(&mut self, _station: StationId) {}

    fn run_aborted(&mut self) {}

    /// An informational line from the device.
    fn device_line(&mut self, _line: &str) {}
}

struct ActiveRun {
    route: Route,
    state: ExecutionState,
    /// Control lines still owed to the device, written before the next move.
    outbox: VecDeque<Command>,
    sent_at: Option<Instant>,
    timed_out: bool,
}

impl ActiveRun {
    fn segment(&self) -> Option<&RouteSegment> {
        self.route.segments.get(self.state.segment)
    }
}

/// Walks a [`Route`], one acknowledged command at a time.
pub struct ExecutionController<O: Operator> {
    transport: Box<dyn Transport>,
    operator: O,
    config: ControllerConfig,
    phase: Phase,
    run: Option<ActiveRun>,
}

impl<O: Operator> ExecutionController<O> {
    /// Create an idle controller writing to `transport`.
    pub fn new(transport: Box<dyn Transport>, operator: O, config: ControllerConfig) -> Self {
        Self {
            transport,
            operator,
            config,
            phase: Phase::Idle,
            run: None,
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Progress of the active run, `None` when idle.
    pub fn state(&self) -> Option<&ExecutionState> {
        self.run.as_ref().map(|r| &r.state)
    }

    pub fn current_segment(&self) -> Option<&RouteSegment> {
        self.run.as_ref().and_then(ActiveRun::segment)
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// Consume events until [`Event::Shutdown`], a disconnected queue, or
    /// cancellation of `ctx`. Errors are reported to the operator and leave
    /// the controller stalled in its current phase.
    pub fn run(&mut self, events: &Receiver<Event>, ctx: &Context) {
        log::debug!("controller loop started");
        while !ctx.is_done() {
            match events.recv_timeout(self.next_wait()) {
                Ok(Event::Shutdown) => break,
                Ok(event) => match self.handle(event) {
                    Ok(()) => {}
                    Err(e @ (LinkError::Busy(_) | LinkError::NotIdle(_))) => {
                        log::warn!("{e}");
                        self.operator.request_rejected(&e);
                    }
                    Err(e) => {
                        log::error!("{e}");
                        self.operator.link_error(&e);
                    }
                },
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.poll_timeout();
        }
        log::debug!("controller loop stopped in {:?}", self.phase);
    }

    /// Apply one event.
    pub fn handle(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Start(route) => self.start(route),
            Event::Ack => self.acknowledge(),
            Event::Confirmation { station, delivered } => self.confirm(station, delivered),
            Event::Retry => self.retry(),
            Event::Abort => {
                self.abort();
                Ok(())
            }
            Event::TestLeds => self.test_leds(),
            Event::DeviceLine(line) => {
                self.operator.device_line(&line);
                Ok(())
            }
            Event::LinkFailed(reason) => {
                self.operator.link_error(&LinkError::Read(reason));
                Ok(())
            }
            Event::Shutdown => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Begin a delivery run. Only valid while idle.
    pub fn start(&mut self, route: Route) -> Result<()> {
        if self.phase != Phase::Idle {
            return Err(LinkError::Busy(self.phase));
        }
        self.reset_indicators()?;
        for leg in &route.skipped {
            log::warn!("{}: unreachable, not driven", leg.description);
        }
        log::info!("starting delivery run with {} segments", route.segments.len());
        self.run = Some(ActiveRun {
            route,
            state: ExecutionState::new(),
            outbox: VecDeque::new(),
            sent_at: None,
            timed_out: false,
        });
        self.begin_segment()
    }

    /// The device finished the outstanding direction command.
    pub fn acknowledge(&mut self) -> Result<()> {
        if self.phase != Phase::AwaitingAck {
            log::warn!("ignoring acknowledgment while {:?}", self.phase);
            return Ok(());
        }
        if let Some(run) = self.run.as_mut() {
            run.state.busy = false;
            run.state.command += 1;
            run.sent_at = None;
            run.timed_out = false;
        }
        self.dispatch()
    }

    /// Apply the operator's answer for `station`.
    pub fn confirm(&mut self, station: StationId, delivered: bool) -> Result<()> {
        if self.phase != Phase::AwaitingConfirmation {
            log::warn!("ignoring confirmation for {station} while {:?}", self.phase);
            return Ok(());
        }
        let Some((leg, expected)) = self.current_segment().map(|s| (s.leg, s.to)) else {
            return Ok(());
        };
        if expected != Waypoint::Station(station) {
            log::warn!("ignoring confirmation for {station}, awaiting {expected}");
            return Ok(());
        }

        let Some(run) = self.run.as_mut() else {
            return Ok(());
        };
        if !delivered {
            log::warn!("delivery to {station} not received, sounding alert");
            if !run.outbox.contains(&Command::BuzzerOn) {
                run.outbox.push_back(Command::BuzzerOn);
            }
            self.flush_controls()?;
            self.operator.delivery_rejected(station);
            return Ok(());
        }

        log::info!("delivery to {station} confirmed");
        // An unsent alert is moot once the delivery is confirmed.
        run.outbox.clear();
        run.outbox.push_back(Command::FoodReceived(leg));
        run.state.confirmed.insert(station);
        self.advance()
    }

    /// Resume a stalled run.
    ///
    /// After a failed write this sends whatever was not delivered: owed
    /// control lines first, then the current direction command. After an
    /// acknowledgment timeout it re-sends the outstanding command. If the
    /// device had in fact received the first copy it will acknowledge twice,
    /// and the extra acknowledgment advances the following command early;
    /// only retry a timeout when the robot visibly did not move.
    pub fn retry(&mut self) -> Result<()> {
        let owes_controls = self.run.as_ref().is_some_and(|r| !r.outbox.is_empty());
        match self.phase {
            Phase::Dispatching if self.run.is_some() => {
                log::info!("retrying dispatch");
                self.resume()
            }
            Phase::AwaitingAck if self.run.as_ref().is_some_and(|r| r.timed_out) => {
                log::warn!("re-sending unacknowledged command");
                self.dispatch()
            }
            Phase::AwaitingConfirmation if owes_controls => {
                log::info!("re-sending alert");
                self.flush_controls()
            }
            phase => {
                log::warn!("nothing to retry while {phase:?}");
                Ok(())
            }
        }
    }

    /// Drop the active run from any phase. The device is not told to stop.
    pub fn abort(&mut self) {
        if self.run.take().is_some() {
            log::warn!("delivery run aborted while {:?}", self.phase);
            self.phase = Phase::Idle;
            self.operator.run_aborted();
        }
        self.phase = Phase::Idle;
    }

    /// Cycle the device indicators. Only valid while idle.
    pub fn test_leds(&mut self) -> Result<()> {
        self.send_idle(Command::TestLeds)
    }

    /// Send the liveness probe. Only valid while idle.
    pub fn probe(&mut self) -> Result<()> {
        self.send_idle(Command::Probe)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn send_idle(&mut self, command: Command) -> Result<()> {
        if self.phase != Phase::Idle {
            return Err(LinkError::NotIdle(self.phase));
        }
        send_command(&mut self.transport, &command)
    }

    /// Light every indicator, then clear them one by one.
    fn reset_indicators(&mut self) -> Result<()> {
        let n = self.config.indicator_count;
        send_command(&mut self.transport, &Command::PathStart(n + 1))?;
        for leg in 1..=n {
            send_command(&mut self.transport, &Command::FoodReceived(leg))?;
        }
        log::debug!("reset {n} indicators");
        Ok(())
    }

    /// Announce the current segment and start driving it. Past the last
    /// segment, completes the run once owed control lines are out.
    fn begin_segment(&mut self) -> Result<()> {
        self.phase = Phase::Dispatching;
        let Some(run) = self.run.as_mut() else {
            return Ok(());
        };
        if let Some(segment) = run.route.segments.get(run.state.segment) {
            log::info!(
                "{}: {} commands, {} moves",
                segment.description,
                segment.commands.len(),
                segment.moves()
            );
            if let Waypoint::Station(_) = segment.to {
                run.outbox.push_back(Command::PathStart(segment.leg));
            }
            self.operator.segment_started(segment);
        }
        self.resume()
    }

    /// Write owed control lines, then either dispatch or complete.
    fn resume(&mut self) -> Result<()> {
        self.flush_controls()?;
        if self.current_segment().is_none() {
            self.complete();
            return Ok(());
        }
        self.dispatch()
    }

    /// Send queued control lines in order. A line leaves the queue only
    /// once written, so a failure keeps it for the next attempt.
    fn flush_controls(&mut self) -> Result<()> {
        let Some(run) = self.run.as_mut() else {
            return Ok(());
        };
        while let Some(&command) = run.outbox.front() {
            send_command(&mut self.transport, &command)?;
            run.outbox.pop_front();
        }
        Ok(())
    }

    /// Send the current command, or close the segment if none remain.
    fn dispatch(&mut self) -> Result<()> {
        let Some(run) = self.run.as_mut() else {
            return Ok(());
        };
        let Some(segment) = run.route.segments.get(run.state.segment) else {
            return Ok(());
        };

        if let Some(&command) = segment.commands.get(run.state.command) {
            self.phase = Phase::Dispatching;
            log::info!(
                "{}: direction {}/{}: {command}",
                segment.description,
                run.state.command + 1,
                segment.commands.len()
            );
            send_command(&mut self.transport, &Command::Move(command))?;
            run.state.busy = true;
            run.sent_at = Some(Instant::now());
            run.timed_out = false;
            self.phase = Phase::AwaitingAck;
            self.operator.command_sent(segment, run.state.command, command);
            return Ok(());
        }

        run.state.busy = false;
        match segment.to {
            Waypoint::Station(station) => {
                log::info!("{} completed, awaiting confirmation", segment.description);
                self.phase = Phase::AwaitingConfirmation;
                self.operator.request_confirmation(segment, station);
                Ok(())
            }
            Waypoint::Home => {
                log::info!("{} completed", segment.description);
                self.advance()
            }
        }
    }

    fn advance(&mut self) -> Result<()> {
        if let Some(run) = self.run.as_mut() {
            run.state.segment += 1;
            run.state.command = 0;
        }
        self.begin_segment()
    }

    fn complete(&mut self) {
        self.phase = Phase::Complete;
        let confirmed = self
            .run
            .take()
            .map(|r| r.state.confirmed)
            .unwrap_or_default();
        log::info!("All orders have been completed ({} confirmed)", confirmed.len());
        self.operator.run_completed(&confirmed);
        self.phase = Phase::Idle;
    }

    // -----------------------------------------------------------------------
    // Acknowledgment timeout
    // -----------------------------------------------------------------------

    fn ack_deadline(&self) -> Option<Instant> {
        let limit = self.config.ack_timeout?;
        if self.phase != Phase::AwaitingAck {
            return None;
        }
        let run = self.run.as_ref()?;
        if run.timed_out {
            return None;
        }
        run.sent_at.map(|t| t + limit)
    }

    fn next_wait(&self) -> Duration {
        match self.ack_deadline() {
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .min(CONTEXT_POLL),
            None => CONTEXT_POLL,
        }
    }

    /// Report an overdue acknowledgment once. The controller keeps waiting
    /// until the ack arrives, the operator retries, or the run is aborted.
    pub fn poll_timeout(&mut self) {
        let Some(deadline) = self.ack_deadline() else {
            return;
        };
        if Instant::now() < deadline {
            return;
        }
        let Some(run) = self.run.as_mut() else {
            return;
        };
        run.timed_out = true;
        let waited = run.sent_at.map(|t| t.elapsed()).unwrap_or_default();
        let command = run
            .segment()
            .and_then(|s| s.commands.get(run.state.command))
            .copied();
        if let Some(command) = command {
            let err = LinkError::AckTimeout { command, waited };
            log::error!("{err}");
            self.operator.link_error(&err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::event_queue;
    use crate::listener::LinkListener;
    use crate::transport::MockTransport;
    use crossbeam_channel::Sender;
    use mesamate_core::{OccupancyGrid, Pos};
    use mesamate_route::{RouteRequest, StationTable, build_route};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use StationId::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Note {
        Confirm(StationId),
        Completed(Vec<StationId>),
        Error(String),
        Refused(String),
        Rejected(StationId),
        Aborted,
    }

    #[derive(Default)]
    struct Recorder {
        notes: Vec<Note>,
    }

    impl Operator for Recorder {
        fn request_confirmation(&mut self, _segment: &RouteSegment, station: StationId) {
            self.notes.push(Note::Confirm(station));
        }
        fn run_completed(&mut self, confirmed: &BTreeSet<StationId>) {
            self.notes
                .push(Note::Completed(confirmed.iter().copied().collect()));
        }
        fn link_error(&mut self, error: &LinkError) {
            self.notes.push(Note::Error(error.to_string()));
        }
        fn request_rejected(&mut self, error: &LinkError) {
            self.notes.push(Note::Refused(error.to_string()));
        }
        fn delivery_rejected(&mut self, station: StationId) {
            self.notes.push(Note::Rejected(station));
        }
        fn run_aborted(&mut self) {
            self.notes.push(Note::Aborted);
        }
    }

    // L-shaped corridor: every leg has exactly one shortest path.
    const CORRIDOR: &str = "\
.....
####.
####.";

    fn corridor_route(ids: &[StationId]) -> Route {
        let grid = OccupancyGrid::from_ascii(CORRIDOR).unwrap();
        let table: StationTable = [(Table1, Pos::new(2, 4)), (Table2, Pos::new(0, 4))]
            .into_iter()
            .collect();
        let request = RouteRequest::new(ids.iter().copied(), 3, &table).unwrap();
        build_route(&grid, Pos::new(0, 0), &table, &request).unwrap()
    }

    fn controller(mock: &MockTransport, config: ControllerConfig) -> ExecutionController<Recorder> {
        ExecutionController::new(Box::new(mock.clone()), Recorder::default(), config)
    }

    /// Lines written since the last call.
    fn drain(mock: &MockTransport) -> Vec<String> {
        let lines = mock.written_lines();
        mock.clear_written();
        lines
    }

    #[test]
    fn walks_route_one_ack_at_a_time() {
        let mock = MockTransport::new();
        let mut c = controller(&mock, ControllerConfig::default());

        c.start(corridor_route(&[Table1])).unwrap();
        assert_eq!(
            drain(&mock),
            vec![
                "PATH_START:4",
                "FOOD_RECEIVED:1",
                "FOOD_RECEIVED:2",
                "FOOD_RECEIVED:3",
                "PATH_START:1",
                "4right"
            ]
        );
        assert_eq!(c.phase(), Phase::AwaitingAck);
        assert!(c.state().unwrap().busy);

        c.handle(Event::Ack).unwrap();
        assert_eq!(drain(&mock), vec!["2down"]);

        c.handle(Event::Ack).unwrap();
        assert!(drain(&mock).is_empty());
        assert_eq!(c.phase(), Phase::AwaitingConfirmation);
        assert_eq!(c.operator().notes, vec![Note::Confirm(Table1)]);

        c.handle(Event::Confirmation {
            station: Table1,
            delivered: true,
        })
        .unwrap();
        assert_eq!(drain(&mock), vec!["FOOD_RECEIVED:1", "2up"]);
        assert_eq!(c.state().unwrap().segment, 1);

        c.handle(Event::Ack).unwrap();
        assert_eq!(drain(&mock), vec!["4left"]);
        c.handle(Event::Ack).unwrap();

        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.state().is_none());
        assert_eq!(
            c.operator().notes.last(),
            Some(&Note::Completed(vec![Table1]))
        );
    }

    #[test]
    fn negative_confirmation_sounds_alert_and_holds() {
        let mock = MockTransport::new();
        let mut c = controller(&mock, ControllerConfig::default());
        c.start(corridor_route(&[Table1, Table2])).unwrap();
        c.handle(Event::Ack).unwrap();
        c.handle(Event::Ack).unwrap();
        drain(&mock);

        c.handle(Event::Confirmation {
            station: Table1,
            delivered: false,
        })
        .unwrap();
        assert_eq!(drain(&mock), vec!["BUZZER_ON"]);
        assert_eq!(c.phase(), Phase::AwaitingConfirmation);
        assert_eq!(c.state().unwrap().segment, 0);
        assert!(c.state().unwrap().confirmed.is_empty());

        // Acks and retries do not move past an unresolved confirmation.
        c.handle(Event::Ack).unwrap();
        c.handle(Event::Retry).unwrap();
        assert!(drain(&mock).is_empty());
        assert_eq!(c.phase(), Phase::AwaitingConfirmation);

        c.handle(Event::Confirmation {
            station: Table1,
            delivered: true,
        })
        .unwrap();
        assert_eq!(
            drain(&mock),
            vec!["FOOD_RECEIVED:1", "PATH_START:2", "2up"]
        );
        assert!(c.state().unwrap().confirmed.contains(&Table1));
        assert!(c.operator().notes.contains(&Note::Rejected(Table1)));
    }

    #[test]
    fn confirmation_for_other_station_is_ignored() {
        let mock = MockTransport::new();
        let mut c = controller(&mock, ControllerConfig::default());
        c.start(corridor_route(&[Table1])).unwrap();
        c.handle(Event::Ack).unwrap();
        c.handle(Event::Ack).unwrap();
        drain(&mock);

        c.handle(Event::Confirmation {
            station: Table2,
            delivered: true,
        })
        .unwrap();
        assert!(drain(&mock).is_empty());
        assert_eq!(c.phase(), Phase::AwaitingConfirmation);
    }

    #[test]
    fn stray_ack_while_idle_is_ignored() {
        let mock = MockTransport::new();
        let mut c = controller(&mock, ControllerConfig::default());
        c.handle(Event::Ack).unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert!(mock.written().is_empty());
    }

    #[test]
    fn start_while_running_is_busy() {
        let mock = MockTransport::new();
        let mut c = controller(&mock, ControllerConfig::default());
        c.start(corridor_route(&[Table1])).unwrap();
        assert!(matches!(
            c.start(corridor_route(&[Table2])),
            Err(LinkError::Busy(Phase::AwaitingAck))
        ));
        assert!(matches!(c.test_leds(), Err(LinkError::NotIdle(_))));
    }

    #[test]
    fn write_failure_stalls_until_retry() {
        let mock = MockTransport::new();
        let mut c = controller(&mock, ControllerConfig::default());
        c.start(corridor_route(&[Table1])).unwrap();
        drain(&mock);

        mock.set_fail_writes(true);
        assert!(c.handle(Event::Ack).is_err());
        assert_eq!(c.phase(), Phase::Dispatching);
        assert_eq!(c.state().unwrap().command, 1);

        // Nothing advances on its own.
        c.handle(Event::Ack).unwrap();
        assert_eq!(c.phase(), Phase::Dispatching);

        mock.set_fail_writes(false);
        c.handle(Event::Retry).unwrap();
        assert_eq!(drain(&mock), vec!["2down"]);
        assert_eq!(c.phase(), Phase::AwaitingAck);
    }

    #[test]
    fn ack_timeout_reports_once_and_allows_resend() {
        let mock = MockTransport::new();
        let mut c = controller(
            &mock,
            ControllerConfig {
                ack_timeout: Some(Duration::from_millis(5)),
                ..ControllerConfig::default()
            },
        );
        c.start(corridor_route(&[Table1])).unwrap();
        drain(&mock);

        // Retry before the timeout does nothing.
        c.handle(Event::Retry).unwrap();
        assert!(drain(&mock).is_empty());

        thread::sleep(Duration::from_millis(20));
        c.poll_timeout();
        c.poll_timeout();
        let errors: Vec<&Note> = c
            .operator()
            .notes
            .iter()
            .filter(|n| matches!(n, Note::Error(_)))
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(c.phase(), Phase::AwaitingAck);
        assert_eq!(c.state().unwrap().command, 0);

        c.handle(Event::Retry).unwrap();
        assert_eq!(drain(&mock), vec!["4right"]);
        c.handle(Event::Ack).unwrap();
        assert_eq!(drain(&mock), vec!["2down"]);
    }

    #[test]
    fn abort_returns_to_idle_from_any_phase() {
        let mock = MockTransport::new();
        let mut c = controller(&mock, ControllerConfig::default());

        c.start(corridor_route(&[Table1])).unwrap();
        c.handle(Event::Abort).unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.state().is_none());

        c.start(corridor_route(&[Table1])).unwrap();
        c.handle(Event::Ack).unwrap();
        c.handle(Event::Ack).unwrap();
        assert_eq!(c.phase(), Phase::AwaitingConfirmation);
        c.abort();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(
            c.operator()
                .notes
                .iter()
                .filter(|n| **n == Note::Aborted)
                .count(),
            2
        );

        // Late events from the aborted run are ignored.
        drain(&mock);
        c.handle(Event::Ack).unwrap();
        assert!(drain(&mock).is_empty());
        c.test_leds().unwrap();
        assert_eq!(drain(&mock), vec!["TEST_LEDS"]);
    }

    #[test]
    fn skipped_legs_do_not_block_remaining_segments() {
        // table2 is sealed off; only home -> table1 is drivable.
        let grid = OccupancyGrid::from_ascii(
            "\
.....#.
####.#.
####.##",
        )
        .unwrap();
        let table: StationTable = [(Table1, Pos::new(2, 4)), (Table2, Pos::new(0, 6))]
            .into_iter()
            .collect();
        let request = RouteRequest::new([Table1, Table2], 3, &table).unwrap();
        let route = build_route(&grid, Pos::new(0, 0), &table, &request).unwrap();
        assert_eq!(route.len(), 1);
        assert_eq!(route.skipped.len(), 2);

        let mock = MockTransport::new();
        let mut c = controller(&mock, ControllerConfig::default());
        c.start(route).unwrap();
        c.handle(Event::Ack).unwrap();
        c.handle(Event::Ack).unwrap();
        c.handle(Event::Confirmation {
            station: Table1,
            delivered: true,
        })
        .unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(
            c.operator().notes.last(),
            Some(&Note::Completed(vec![Table1]))
        );
    }

    #[test]
    fn empty_route_completes_immediately() {
        let mock = MockTransport::new();
        let mut c = controller(&mock, ControllerConfig::default());
        c.start(Route::default()).unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.operator().notes, vec![Note::Completed(vec![])]);
    }

    #[test]
    fn failed_indicator_reset_leaves_controller_idle() {
        let mock = MockTransport::new();
        mock.set_fail_writes(true);
        let mut c = controller(&mock, ControllerConfig::default());
        assert!(c.start(corridor_route(&[Table1])).is_err());
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.state().is_none());
    }

    /// Drive a fresh controller to the first confirmation prompt.
    fn at_first_confirmation(mock: &MockTransport, ids: &[StationId]) -> ExecutionController<Recorder> {
        let mut c = controller(mock, ControllerConfig::default());
        c.start(corridor_route(ids)).unwrap();
        c.handle(Event::Ack).unwrap();
        c.handle(Event::Ack).unwrap();
        assert_eq!(c.phase(), Phase::AwaitingConfirmation);
        drain(mock);
        c
    }

    #[test]
    fn failed_segment_announcement_is_sent_on_retry() {
        let mock = MockTransport::new();
        let mut c = at_first_confirmation(&mock, &[Table1, Table2]);

        // FOOD_RECEIVED:1 goes out, PATH_START:2 does not.
        mock.fail_writes_after(1);
        assert!(c.confirm(Table1, true).is_err());
        assert_eq!(drain(&mock), vec!["FOOD_RECEIVED:1"]);
        assert_eq!(c.phase(), Phase::Dispatching);
        assert_eq!(c.state().unwrap().segment, 1);

        mock.set_fail_writes(false);
        c.handle(Event::Retry).unwrap();
        assert_eq!(drain(&mock), vec!["PATH_START:2", "2up"]);
        assert_eq!(c.phase(), Phase::AwaitingAck);
    }

    #[test]
    fn failed_delivery_ack_is_sent_on_retry() {
        let mock = MockTransport::new();
        let mut c = at_first_confirmation(&mock, &[Table1]);

        mock.set_fail_writes(true);
        assert!(c.confirm(Table1, true).is_err());
        assert!(drain(&mock).is_empty());
        assert_eq!(c.phase(), Phase::Dispatching);
        assert!(c.state().unwrap().confirmed.contains(&Table1));

        mock.set_fail_writes(false);
        c.handle(Event::Retry).unwrap();
        assert_eq!(drain(&mock), vec!["FOOD_RECEIVED:1", "2up"]);
    }

    #[test]
    fn failed_delivery_ack_on_last_leg_completes_on_retry() {
        let mock = MockTransport::new();
        // table2 sealed off: the only segment ends at table1.
        let grid = OccupancyGrid::from_ascii(".....#.\n####.#.\n####.##").unwrap();
        let table: StationTable = [(Table1, Pos::new(2, 4)), (Table2, Pos::new(0, 6))]
            .into_iter()
            .collect();
        let request = RouteRequest::new([Table1, Table2], 3, &table).unwrap();
        let route = build_route(&grid, Pos::new(0, 0), &table, &request).unwrap();
        let mut c = controller(&mock, ControllerConfig::default());
        c.start(route).unwrap();
        c.handle(Event::Ack).unwrap();
        c.handle(Event::Ack).unwrap();
        drain(&mock);

        mock.set_fail_writes(true);
        assert!(c.confirm(Table1, true).is_err());
        assert_eq!(c.phase(), Phase::Dispatching);

        mock.set_fail_writes(false);
        c.retry().unwrap();
        assert_eq!(drain(&mock), vec!["FOOD_RECEIVED:1"]);
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(
            c.operator().notes.last(),
            Some(&Note::Completed(vec![Table1]))
        );
    }

    #[test]
    fn failed_alert_is_sent_once_on_retry() {
        let mock = MockTransport::new();
        let mut c = at_first_confirmation(&mock, &[Table1]);

        mock.set_fail_writes(true);
        assert!(c.confirm(Table1, false).is_err());
        assert!(c.confirm(Table1, false).is_err());
        assert_eq!(c.phase(), Phase::AwaitingConfirmation);
        assert!(!c.operator().notes.contains(&Note::Rejected(Table1)));

        mock.set_fail_writes(false);
        c.handle(Event::Retry).unwrap();
        assert_eq!(drain(&mock), vec!["BUZZER_ON"]);
        assert_eq!(c.phase(), Phase::AwaitingConfirmation);

        // Nothing left to resend.
        c.handle(Event::Retry).unwrap();
        assert!(drain(&mock).is_empty());
    }

    #[test]
    fn confirmed_delivery_drops_unsent_alert() {
        let mock = MockTransport::new();
        let mut c = at_first_confirmation(&mock, &[Table1]);

        mock.set_fail_writes(true);
        assert!(c.confirm(Table1, false).is_err());
        mock.set_fail_writes(false);
        c.confirm(Table1, true).unwrap();
        assert_eq!(drain(&mock), vec!["FOOD_RECEIVED:1", "2up"]);
    }

    #[test]
    fn refused_requests_are_not_link_errors() {
        let mock = MockTransport::new();
        let mut c = controller(&mock, ControllerConfig::default());
        let (tx, rx) = event_queue(8);
        tx.send(Event::Start(corridor_route(&[Table1]))).unwrap();
        tx.send(Event::TestLeds).unwrap();
        tx.send(Event::Start(corridor_route(&[Table2]))).unwrap();
        tx.send(Event::Shutdown).unwrap();
        c.run(&rx, &Context::new());

        let notes = &c.operator().notes;
        assert_eq!(
            notes.iter().filter(|n| matches!(n, Note::Refused(_))).count(),
            2
        );
        assert!(!notes.iter().any(|n| matches!(n, Note::Error(_))));
        assert_eq!(c.phase(), Phase::AwaitingAck);
    }

    // -----------------------------------------------------------------------
    // Threaded: listener + simulated device + controller loop
    // -----------------------------------------------------------------------

    struct AutoConfirm {
        events: Sender<Event>,
        completed: Option<Vec<StationId>>,
    }

    impl Operator for AutoConfirm {
        fn request_confirmation(&mut self, _segment: &RouteSegment, station: StationId) {
            let _ = self.events.send(Event::Confirmation {
                station,
                delivered: true,
            });
        }
        fn run_completed(&mut self, confirmed: &BTreeSet<StationId>) {
            self.completed = Some(confirmed.iter().copied().collect());
            let _ = self.events.send(Event::Shutdown);
        }
        fn link_error(&mut self, error: &LinkError) {
            panic!("unexpected link error: {error}");
        }
    }

    #[test]
    fn never_pipelines_with_slow_device() {
        let mock = MockTransport::new();
        let ctx = Context::new();
        let (tx, rx) = event_queue(16);

        let listener = LinkListener::spawn(
            Box::new(mock.clone()),
            tx.clone(),
            ctx.clone(),
            Duration::from_millis(1),
        )
        .unwrap();

        // Device: acknowledge each move after a delay, flagging any move that
        // arrives while another is still outstanding.
        let overlap = Arc::new(AtomicBool::new(false));
        let acked = Arc::new(AtomicUsize::new(0));
        let device = {
            let (mock, ctx, overlap, acked) =
                (mock.clone(), ctx.clone(), overlap.clone(), acked.clone());
            thread::spawn(move || {
                let count_moves = || {
                    mock.written_lines()
                        .iter()
                        .filter(|l| matches!(l.parse::<Command>(), Ok(Command::Move(_))))
                        .count()
                };
                while !ctx.is_done() {
                    let done = acked.load(Ordering::SeqCst);
                    if count_moves() > done {
                        thread::sleep(Duration::from_millis(5));
                        if count_moves() > done + 1 {
                            overlap.store(true, Ordering::SeqCst);
                        }
                        acked.store(done + 1, Ordering::SeqCst);
                        mock.inject_line("DIRECTION_DONE");
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            })
        };

        let route = corridor_route(&[Table1, Table2]);
        let expected: Vec<String> = route
            .segments
            .iter()
            .flat_map(|s| s.commands.iter().map(ToString::to_string))
            .collect();

        let operator = AutoConfirm {
            events: tx.clone(),
            completed: None,
        };
        let mut c = ExecutionController::new(
            Box::new(mock.clone()),
            operator,
            ControllerConfig::default(),
        );
        tx.send(Event::Start(route)).unwrap();
        c.run(&rx, &ctx);

        ctx.cancel();
        listener.join();
        device.join().unwrap();

        assert!(!overlap.load(Ordering::SeqCst), "command sent before ack");
        let moves: Vec<String> = mock
            .written_lines()
            .into_iter()
            .filter(|l| matches!(l.parse::<Command>(), Ok(Command::Move(_))))
            .collect();
        assert_eq!(moves, expected);
        assert_eq!(acked.load(Ordering::SeqCst), expected.len());
        assert_eq!(c.operator().completed, Some(vec![Table1, Table2]));
        assert_eq!(c.phase(), Phase::Idle);
    }
}
