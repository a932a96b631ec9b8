use mesamate_core::{OccupancyGrid, Pos};

/// A position with an associated cost, returned from BFS map queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathNode {
    pub pos: Pos,
    pub cost: i32,
}

// ---------------------------------------------------------------------------
// Internal node for A* priority-queue searches
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct Node {
    pub(crate) g: i32,
    pub(crate) f: i32,
    pub(crate) parent: usize,
    pub(crate) generation: u32,
    pub(crate) open: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            g: 0,
            f: 0,
            parent: usize::MAX,
            generation: 0,
            open: false,
        }
    }
}

/// Reference into the node array, ordered by `f` then by push order for use
/// in `BinaryHeap`.
#[derive(Clone, Copy, Eq, PartialEq)]
pub(crate) struct NodeRef {
    pub(crate) idx: usize,
    pub(crate) f: i32,
    /// Monotonic push counter. Lower = pushed earlier = popped first among
    /// equal `f`.
    pub(crate) seq: u64,
}

impl Ord for NodeRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse so BinaryHeap (max-heap) pops smallest f, then oldest, first.
        other.f.cmp(&self.f).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for NodeRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Sentinel value meaning "unreachable" in BFS maps.
pub const UNREACHABLE: i32 = i32::MAX;

// ---------------------------------------------------------------------------
// PathRange
// ---------------------------------------------------------------------------

/// Central coordinator for path planning on a `rows × cols` grid.
///
/// `PathRange` owns all internal caches (node arrays, BFS maps, neighbor
/// scratch space) so that planning the legs of a route back to back incurs
/// no allocations after the first leg.
pub struct PathRange {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    // A* caches
    pub(crate) nodes: Vec<Node>,
    pub(crate) search_gen: u32,
    // BFS caches
    pub(crate) dist: Vec<i32>,
    pub(crate) reached: Vec<PathNode>,
    // shared scratch buffer for neighbor queries
    pub(crate) scratch: Vec<Pos>,
}

impl PathRange {
    /// Create a new `PathRange` for a grid of the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        let len = rows * cols;
        Self {
            rows,
            cols,
            nodes: vec![Node::default(); len],
            search_gen: 0,
            dist: vec![UNREACHABLE; len],
            reached: Vec::new(),
            scratch: Vec::with_capacity(4),
        }
    }

    /// Create a `PathRange` matching the dimensions of `grid`.
    pub fn for_grid(grid: &OccupancyGrid) -> Self {
        Self::new(grid.rows(), grid.cols())
    }

    // -----------------------------------------------------------------------
    // Coordinate helpers
    // -----------------------------------------------------------------------

    /// Convert a `Pos` to a flat index. Returns `None` if out of range.
    #[inline]
    pub(crate) fn idx(&self, p: Pos) -> Option<usize> {
        if p.row < 0 || p.col < 0 || p.row as usize >= self.rows || p.col as usize >= self.cols {
            return None;
        }
        Some(p.row as usize * self.cols + p.col as usize)
    }

    /// Convert a flat index back to a `Pos`.
    #[inline]
    pub(crate) fn pos(&self, idx: usize) -> Pos {
        Pos::new((idx / self.cols) as i32, (idx % self.cols) as i32)
    }
}
