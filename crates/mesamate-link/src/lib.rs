//! **mesamate-link**: driving the robot over its serial command link.
//!
//! The link is half-duplex and line oriented: the controller writes one
//! command line, the device answers `DIRECTION_DONE` once the move has been
//! physically executed. Two units of execution cooperate:
//!
//! - the [`LinkListener`] thread owns the read half of the [`Transport`],
//!   assembles lines and posts typed [`Event`]s into a bounded queue;
//! - the [`ExecutionController`] consumes exactly one event per step, owns
//!   the [`ExecutionState`] and is the only writer of the transport.
//!
//! Operator front-ends post their decisions (start, confirmation, abort,
//! retry) into the same queue and receive notifications through the
//! [`Operator`] trait.

pub mod context;
pub mod controller;
pub mod error;
pub mod event;
pub mod listener;
pub mod protocol;
pub mod state;
pub mod transport;

pub use context::Context;
pub use controller::{ControllerConfig, ExecutionController, Operator};
pub use error::{LinkError, Result};
pub use event::{DEFAULT_QUEUE_CAPACITY, Event, event_queue};
pub use listener::{DEFAULT_POLL_INTERVAL, LineBuffer, LinkListener};
pub use protocol::{Command, DeviceMessage};
pub use state::{ExecutionState, Phase};
pub use transport::{DEFAULT_BAUD_RATE, MockTransport, SerialTransport, Transport, send_command};
