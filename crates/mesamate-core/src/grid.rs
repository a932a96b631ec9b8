//! The [`OccupancyGrid`] type: an immutable 2D grid of [`Occupancy`] cells.
//!
//! Unlike a drawable grid, an occupancy grid is built once from a floor plan
//! and never mutated afterwards, so it can be shared across threads by
//! reference without synchronization.

use std::fmt;

use crate::geom::Pos;

/// Traversability of a single grid cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Occupancy {
    /// Floor the robot may drive over.
    #[default]
    Free,
    /// Wall, furniture or anything else the robot must avoid.
    Blocked,
}

impl Occupancy {
    #[inline]
    pub const fn is_free(self) -> bool {
        matches!(self, Occupancy::Free)
    }
}

// ---------------------------------------------------------------------------
// OccupancyGrid
// ---------------------------------------------------------------------------

/// A `rows × cols` grid of [`Occupancy`] values stored row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct OccupancyGrid {
    cells: Vec<Occupancy>,
    rows: usize,
    cols: usize,
}

impl OccupancyGrid {
    /// Build a grid from row-major cells. Returns `None` if `cells.len()` is
    /// not `rows * cols`.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<Occupancy>) -> Option<Self> {
        if cells.len() != rows * cols {
            return None;
        }
        Some(Self { cells, rows, cols })
    }

    /// A grid where every cell is [`Occupancy::Free`].
    pub fn open(rows: usize, cols: usize) -> Self {
        Self {
            cells: vec![Occupancy::Free; rows * cols],
            rows,
            cols,
        }
    }

    /// Parse an ASCII map: `#` is blocked, anything else is free. Lines must
    /// have equal width.
    pub fn from_ascii(map: &str) -> Option<Self> {
        let lines: Vec<&str> = map.lines().filter(|l| !l.is_empty()).collect();
        let cols = lines.first().map_or(0, |l| l.chars().count());
        let mut cells = Vec::with_capacity(lines.len() * cols);
        for line in &lines {
            if line.chars().count() != cols {
                return None;
            }
            cells.extend(line.chars().map(|ch| {
                if ch == '#' {
                    Occupancy::Blocked
                } else {
                    Occupancy::Free
                }
            }));
        }
        Self::from_cells(lines.len(), cols, cells)
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether `p` lies inside the grid.
    #[inline]
    pub fn contains(&self, p: Pos) -> bool {
        p.row >= 0 && p.col >= 0 && (p.row as usize) < self.rows && (p.col as usize) < self.cols
    }

    /// Flat row-major index of `p`, or `None` if out of bounds.
    #[inline]
    pub fn index(&self, p: Pos) -> Option<usize> {
        if !self.contains(p) {
            return None;
        }
        Some(p.row as usize * self.cols + p.col as usize)
    }

    /// Position of a flat row-major index.
    #[inline]
    pub fn pos(&self, idx: usize) -> Pos {
        Pos::new((idx / self.cols) as i32, (idx % self.cols) as i32)
    }

    /// The cell at `p`, or `None` if out of bounds.
    #[inline]
    pub fn at(&self, p: Pos) -> Option<Occupancy> {
        self.index(p).map(|i| self.cells[i])
    }

    /// Whether `p` is inside the grid and free. Out-of-bounds positions are
    /// treated as blocked.
    #[inline]
    pub fn is_free(&self, p: Pos) -> bool {
        self.at(p).is_some_and(Occupancy::is_free)
    }

    /// Count of free cells.
    pub fn free_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_free()).count()
    }

    /// Row-major iterator over `(Pos, Occupancy)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Pos, Occupancy)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, &c)| (self.pos(i), c))
    }
}

impl fmt::Debug for OccupancyGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OccupancyGrid")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("free", &self.free_count())
            .finish()
    }
}

impl fmt::Display for OccupancyGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.cols.max(1)) {
            for c in row {
                f.write_str(if c.is_free() { "." } else { "#" })?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}
