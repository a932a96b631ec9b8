//! Route building for the mesamate delivery robot.
//!
//! - [`direction`] compiles a [`CellPath`](mesamate_paths::CellPath) into
//!   run-length [`DirectionCommand`]s and expands them back.
//! - [`station`] holds the closed set of service stations and their grid
//!   coordinates.
//! - [`request`] validates the operator's ordered station selection.
//! - [`sequencer`] plans every leg of a delivery run into a [`Route`].

pub mod direction;
pub mod error;
pub mod request;
pub mod sequencer;
pub mod station;

pub use direction::{
    CompileError, Direction, DirectionCommand, ParseCommandError, compile, expand,
};
pub use error::{Result, RouteError};
pub use request::{DEFAULT_MAX_STATIONS, RouteRequest};
pub use sequencer::{Route, RouteSegment, SkippedLeg, build_route};
pub use station::{StationId, StationTable, UnknownStationName, Waypoint, default_home};
