use std::collections::BinaryHeap;

use mesamate_core::Pos;

use crate::PathRange;
use crate::path::CellPath;
use crate::pathrange::{NodeRef, UNREACHABLE};
use crate::traits::AstarPather;

impl PathRange {
    /// Compute the shortest path from `from` to `to` using A*.
    ///
    /// Returns the full path (including both endpoints), or an empty
    /// [`CellPath`] if no path exists. Endpoints that are outside the range
    /// or not passable yield an empty path.
    ///
    /// Among equal-`f` open entries the one pushed first is expanded first,
    /// so the result is deterministic for a given grid.
    pub fn astar_path<P: AstarPather>(&mut self, pather: &P, from: Pos, to: Pos) -> CellPath {
        let (Some(start_idx), Some(goal_idx)) = (self.idx(from), self.idx(to)) else {
            return CellPath::empty();
        };
        if !pather.passable(from) || !pather.passable(to) {
            return CellPath::empty();
        }

        if start_idx == goal_idx {
            return CellPath::from_cells(vec![from]);
        }

        // Nodes from earlier searches are invalid once the generation moves.
        self.search_gen = self.search_gen.wrapping_add(1);
        let cur_gen = self.search_gen;

        {
            let node = &mut self.nodes[start_idx];
            node.g = 0;
            node.f = pather.estimate(from, to);
            node.parent = usize::MAX;
            node.generation = cur_gen;
            node.open = true;
        }

        let mut seq: u64 = 0;
        let mut open: BinaryHeap<NodeRef> = BinaryHeap::new();
        open.push(NodeRef {
            idx: start_idx,
            f: self.nodes[start_idx].f,
            seq,
        });

        let mut scratch = std::mem::take(&mut self.scratch);

        let found = 'search: loop {
            let Some(current) = open.pop() else {
                break 'search false;
            };

            let ci = current.idx;

            // Skip stale entries.
            if self.nodes[ci].generation != cur_gen
                || !self.nodes[ci].open
                || current.f != self.nodes[ci].f
            {
                continue;
            }

            if ci == goal_idx {
                break 'search true;
            }

            self.nodes[ci].open = false;
            let current_g = self.nodes[ci].g;
            let current_pos = self.pos(ci);

            scratch.clear();
            pather.neighbors(current_pos, &mut scratch);

            for &np in scratch.iter() {
                let Some(ni) = self.idx(np) else {
                    continue;
                };
                let tentative_g = current_g + pather.cost(current_pos, np);

                let n = &mut self.nodes[ni];
                if n.generation == cur_gen {
                    if tentative_g >= n.g {
                        continue;
                    }
                } else {
                    n.generation = cur_gen;
                    n.g = UNREACHABLE;
                }

                n.g = tentative_g;
                n.f = tentative_g + pather.estimate(np, to);
                n.parent = ci;
                n.open = true;

                seq += 1;
                open.push(NodeRef { idx: ni, f: n.f, seq });
            }
        };

        self.scratch = scratch;

        if !found {
            return CellPath::empty();
        }

        let mut cells: Vec<Pos> = std::iter::successors(Some(goal_idx), |&i| {
            let parent = self.nodes[i].parent;
            (parent != usize::MAX).then_some(parent)
        })
        .map(|i| self.pos(i))
        .collect();
        cells.reverse();
        CellPath::from_cells(cells)
    }
}
