//! The [`CellPath`] type, the planner's output.

use mesamate_core::{OccupancyGrid, Pos};

/// An ordered walk of grid cells, each 4-adjacent to the next.
///
/// The first cell is the leg start and the last cell the leg goal. An empty
/// path means the goal was unreachable; it is a normal outcome, not an
/// error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellPath {
    cells: Vec<Pos>,
}

impl CellPath {
    /// The "no path" value.
    pub const fn empty() -> Self {
        Self { cells: Vec::new() }
    }

    /// Wrap a cell sequence without validation.
    pub fn from_cells(cells: Vec<Pos>) -> Self {
        Self { cells }
    }

    #[inline]
    pub fn cells(&self) -> &[Pos] {
        &self.cells
    }

    /// Number of cells (one more than the number of moves).
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of unit moves along the path.
    #[inline]
    pub fn steps(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    pub fn start(&self) -> Option<Pos> {
        self.cells.first().copied()
    }

    pub fn goal(&self) -> Option<Pos> {
        self.cells.last().copied()
    }

    /// Whether every cell is free on `grid` and consecutive cells are
    /// 4-adjacent.
    pub fn is_valid_on(&self, grid: &OccupancyGrid) -> bool {
        self.cells.iter().all(|&p| grid.is_free(p))
            && self.cells.windows(2).all(|w| w[0].is_adjacent_4(w[1]))
    }
}

impl From<Vec<Pos>> for CellPath {
    fn from(cells: Vec<Pos>) -> Self {
        Self::from_cells(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_has_no_steps() {
        let p = CellPath::empty();
        assert!(p.is_empty());
        assert_eq!(p.steps(), 0);
        assert_eq!(p.start(), None);
    }

    #[test]
    fn validity_checks_adjacency_and_freedom() {
        let grid = OccupancyGrid::from_ascii("...\n.#.").unwrap();
        let ok = CellPath::from(vec![Pos::new(0, 0), Pos::new(0, 1), Pos::new(0, 2)]);
        assert!(ok.is_valid_on(&grid));
        assert_eq!(ok.steps(), 2);

        let jump = CellPath::from(vec![Pos::new(0, 0), Pos::new(0, 2)]);
        assert!(!jump.is_valid_on(&grid));

        let through_wall = CellPath::from(vec![Pos::new(0, 1), Pos::new(1, 1)]);
        assert!(!through_wall.is_valid_on(&grid));
    }
}
