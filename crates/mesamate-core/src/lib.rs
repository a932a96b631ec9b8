//! **mesamate-core**: floor-plan types for the mesamate delivery robot.
//!
//! This crate provides the foundational types used across the *mesamate*
//! workspace: the `(row, col)` geometry primitive, the immutable occupancy
//! grid, and the raster thresholding that builds one from a grayscale
//! floor plan.

pub mod geom;
pub mod grid;
pub mod raster;

pub use geom::Pos;
pub use grid::{Occupancy, OccupancyGrid};
pub use raster::{DEFAULT_THRESHOLD, GridError, build_grid, build_grid_from_raw};
