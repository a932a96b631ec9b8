//! Error types for route construction.

use mesamate_core::Pos;

use crate::direction::CompileError;
use crate::station::{StationId, Waypoint};

/// Result type alias
pub type Result<T> = std::result::Result<T, RouteError>;

/// Errors raised while validating a request or the station layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// No stations were selected.
    #[error("at least one station must be selected")]
    EmptyRequest,

    /// More stations than the configured cap.
    #[error("{requested} stations selected, at most {max} allowed")]
    TooManyStations { requested: usize, max: usize },

    /// A station appears twice in the visiting order.
    #[error("station {0} selected more than once")]
    DuplicateStation(StationId),

    /// The station is not present in the loaded station table.
    #[error("station {0} has no configured coordinates")]
    UnknownStation(StationId),

    /// A waypoint lies outside the floor plan.
    #[error("{waypoint} at {pos} is outside the {rows}x{cols} floor plan")]
    OutOfBounds {
        waypoint: Waypoint,
        pos: Pos,
        rows: usize,
        cols: usize,
    },

    /// A waypoint lies on a wall or other obstacle.
    #[error("{waypoint} at {pos} is on a blocked cell")]
    BlockedCell { waypoint: Waypoint, pos: Pos },

    /// A planned path contained a non-cardinal step.
    #[error("path compilation failed: {0}")]
    Compile(#[from] CompileError),
}
