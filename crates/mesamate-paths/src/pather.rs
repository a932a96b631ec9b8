use mesamate_core::{OccupancyGrid, Pos};

use crate::distance::manhattan;
use crate::traits::{AstarPather, Pather};

/// 4-connected unit-cost walk over the free cells of an [`OccupancyGrid`].
///
/// Manhattan distance is admissible and consistent for this move set, so A*
/// with this pather returns optimal paths.
#[derive(Clone, Copy, Debug)]
pub struct GridPather<'a> {
    grid: &'a OccupancyGrid,
}

impl<'a> GridPather<'a> {
    pub fn new(grid: &'a OccupancyGrid) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &'a OccupancyGrid {
        self.grid
    }
}

impl Pather for GridPather<'_> {
    fn neighbors(&self, p: Pos, buf: &mut Vec<Pos>) {
        buf.extend(p.neighbors_4().into_iter().filter(|&n| self.grid.is_free(n)));
    }

    fn passable(&self, p: Pos) -> bool {
        self.grid.is_free(p)
    }
}

impl AstarPather for GridPather<'_> {
    #[inline]
    fn cost(&self, _from: Pos, _to: Pos) -> i32 {
        1
    }

    #[inline]
    fn estimate(&self, from: Pos, to: Pos) -> i32 {
        manhattan(from, to)
    }
}
