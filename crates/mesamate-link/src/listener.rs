//! The background thread that turns device bytes into [`Event`]s.
//!
//! The listener never touches execution state. It only reads, classifies
//! and posts, so the controller stays the single writer of
//! [`ExecutionState`](crate::ExecutionState).

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{SendTimeoutError, Sender};

use crate::context::Context;
use crate::event::Event;
use crate::protocol::DeviceMessage;
use crate::transport::Transport;

/// Sleep between empty reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Longest line kept before it is discarded as noise.
const MAX_LINE_LEN: usize = 256;

// ---------------------------------------------------------------------------
// LineBuffer
// ---------------------------------------------------------------------------

/// Reassembles newline-terminated lines from arbitrarily split reads.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    overflowed: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes; returns every line completed by them, trimmed,
    /// with blank lines dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' {
                if !self.overflowed {
                    let line = String::from_utf8_lossy(&self.pending);
                    let line = line.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                }
                self.pending.clear();
                self.overflowed = false;
                continue;
            }
            if self.pending.len() >= MAX_LINE_LEN {
                if !self.overflowed {
                    log::warn!("discarding over-long device line");
                }
                self.overflowed = true;
                continue;
            }
            self.pending.push(b);
        }
        lines
    }
}

// ---------------------------------------------------------------------------
// LinkListener
// ---------------------------------------------------------------------------

/// Handle to the running listener thread.
pub struct LinkListener {
    handle: JoinHandle<()>,
}

impl LinkListener {
    /// Spawn the listener on `reader`, posting into `events` until `ctx` is
    /// cancelled or the queue's receiver is dropped.
    pub fn spawn(
        mut reader: Box<dyn Transport>,
        events: Sender<Event>,
        ctx: Context,
        poll_interval: Duration,
    ) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("link-listener".into())
            .spawn(move || listen(&mut *reader, &events, &ctx, poll_interval))?;
        Ok(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the thread to exit. Cancel the context first.
    pub fn join(self) {
        if self.handle.join().is_err() {
            log::error!("link listener panicked");
        }
    }
}

fn listen(reader: &mut dyn Transport, events: &Sender<Event>, ctx: &Context, poll: Duration) {
    let mut buf = [0u8; 128];
    let mut lines = LineBuffer::new();
    log::debug!("link listener started");

    'listen: while !ctx.is_done() {
        match reader.read(&mut buf) {
            Ok(0) => {
                ctx.pause(poll);
            }
            Ok(n) => {
                for line in lines.push(&buf[..n]) {
                    let event = match DeviceMessage::parse(&line) {
                        DeviceMessage::DirectionDone => {
                            log::debug!("received acknowledgment");
                            Event::Ack
                        }
                        DeviceMessage::Other(text) => {
                            log::info!("Received from device: {text}");
                            Event::DeviceLine(text)
                        }
                    };
                    if !post(events, event, ctx, poll) {
                        break 'listen;
                    }
                }
            }
            Err(e) => {
                log::error!("Error reading from serial port: {e}");
                if !post(events, Event::LinkFailed(e.to_string()), ctx, poll) {
                    break 'listen;
                }
                ctx.pause(poll);
            }
        }
    }
    log::debug!("link listener stopped");
}

/// Queue `event`, waiting for room while `ctx` is live. Returns `false`
/// once the listener should stop.
fn post(events: &Sender<Event>, mut event: Event, ctx: &Context, poll: Duration) -> bool {
    loop {
        match events.send_timeout(event, poll) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(pending)) => {
                if ctx.is_done() {
                    log::debug!("listener cancelled with a full event queue");
                    return false;
                }
                event = pending;
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                log::debug!("event queue closed, listener exiting");
                return false;
            }
        }
    }
}
