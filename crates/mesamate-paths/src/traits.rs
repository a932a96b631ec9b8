use mesamate_core::Pos;

/// Minimal pathfinding interface: neighbor enumeration and passability.
pub trait Pather {
    /// Append traversable neighbors of `p` into `buf`. The caller clears
    /// `buf` before calling.
    fn neighbors(&self, p: Pos, buf: &mut Vec<Pos>);

    /// Whether `p` may appear in a path at all.
    fn passable(&self, p: Pos) -> bool;
}

/// Pather with positive edge costs and an admissible heuristic.
pub trait AstarPather: Pather {
    /// Cost of moving from `from` to adjacent `to`. Must be > 0.
    fn cost(&self, from: Pos, to: Pos) -> i32;

    /// Heuristic estimate of distance from `from` to `to`.
    /// Must never overestimate the true cost (admissible).
    fn estimate(&self, from: Pos, to: Pos) -> i32;
}
