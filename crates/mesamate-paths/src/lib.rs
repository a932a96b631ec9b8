//! Path planning on occupancy grids.
//!
//! This crate provides the planner used to route the robot between
//! waypoints:
//!
//! - **A\*** shortest-path search ([`PathRange::astar_path`], [`find_path`])
//! - **BFS** unweighted distance maps ([`PathRange::bfs_map`])
//!
//! Both algorithms operate through [`PathRange`], which owns and reuses
//! internal caches so that planning several legs on the same floor plan
//! incurs no allocations after the first query.
//!
//! # Trait hierarchy
//!
//! | Trait | Required for |
//! |---|---|
//! | [`Pather`] | BFS |
//! | [`AstarPather`] : [`Pather`] | A* |
//!
//! [`GridPather`] implements both for a 4-connected, unit-cost walk over the
//! free cells of an [`OccupancyGrid`](mesamate_core::OccupancyGrid).

mod astar;
mod bfs;
mod distance;
mod path;
mod pather;
mod pathrange;
mod traits;

pub use distance::manhattan;
pub use path::CellPath;
pub use pather::GridPather;
pub use pathrange::{PathNode, PathRange, UNREACHABLE};
pub use traits::{AstarPather, Pather};

use mesamate_core::{OccupancyGrid, Pos};

/// Shortest 4-connected path from `start` to `goal` over free cells.
///
/// Returns an empty [`CellPath`] when the goal cannot be reached, including
/// when either endpoint is blocked or outside the grid.
pub fn find_path(grid: &OccupancyGrid, start: Pos, goal: Pos) -> CellPath {
    PathRange::for_grid(grid).astar_path(&GridPather::new(grid), start, goal)
}
