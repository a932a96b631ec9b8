use std::collections::VecDeque;

use mesamate_core::Pos;

use crate::PathRange;
use crate::pathrange::{PathNode, UNREACHABLE};
use crate::traits::Pather;

impl PathRange {
    /// Breadth-first distance map from every source at once.
    ///
    /// Unit step cost; cells farther than `max_dist` stay unreached.
    /// Sources outside the range or not passable are skipped. Returns the
    /// reached cells in visiting order.
    pub fn bfs_map<P: Pather>(&mut self, pather: &P, sources: &[Pos], max_dist: i32) -> &[PathNode] {
        self.dist.fill(UNREACHABLE);
        self.reached.clear();

        let mut frontier: VecDeque<PathNode> = sources
            .iter()
            .copied()
            .filter(|&p| pather.passable(p))
            .filter_map(|p| self.mark(p, 0))
            .collect();

        let mut scratch = std::mem::take(&mut self.scratch);
        while let Some(node) = frontier.pop_front() {
            if node.cost >= max_dist {
                continue;
            }
            scratch.clear();
            pather.neighbors(node.pos, &mut scratch);
            for &next in &scratch {
                if let Some(reached) = self.mark(next, node.cost + 1) {
                    frontier.push_back(reached);
                }
            }
        }
        self.scratch = scratch;

        &self.reached
    }

    /// Record `cost` at `p` if it is in range and not yet reached.
    fn mark(&mut self, p: Pos, cost: i32) -> Option<PathNode> {
        let i = self.idx(p)?;
        if self.dist[i] != UNREACHABLE {
            return None;
        }
        self.dist[i] = cost;
        let node = PathNode { pos: p, cost };
        self.reached.push(node);
        Some(node)
    }

    /// Distance to `p` from the last [`bfs_map`](Self::bfs_map), or
    /// [`UNREACHABLE`].
    pub fn bfs_at(&self, p: Pos) -> i32 {
        self.idx(p).map_or(UNREACHABLE, |i| self.dist[i])
    }
}
