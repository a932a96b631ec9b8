//! Multi-leg route sequencing: home → s₁ → … → sₙ → home.
//!
//! Planning is best-effort. A leg whose goal cannot be reached is logged,
//! recorded as a [`SkippedLeg`] and left out of the route; the remaining
//! legs are still planned.

use mesamate_core::{OccupancyGrid, Pos};
use mesamate_paths::{CellPath, GridPather, PathRange};

use crate::direction::{DirectionCommand, compile};
use crate::error::Result;
use crate::request::RouteRequest;
use crate::station::{StationTable, Waypoint};

/// One planned leg of a route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSegment {
    /// 1-based position of this leg among all planned legs, skipped ones
    /// included. Used as the indicator number on the device.
    pub leg: u32,
    pub from: Waypoint,
    pub to: Waypoint,
    pub path: CellPath,
    pub commands: Vec<DirectionCommand>,
    pub description: String,
}

impl RouteSegment {
    /// Total unit moves across all commands.
    pub fn moves(&self) -> u32 {
        self.commands.iter().map(|c| c.count()).sum()
    }
}

/// A leg left out of the route because its goal was unreachable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedLeg {
    pub leg: u32,
    pub from: Waypoint,
    pub to: Waypoint,
    pub description: String,
}

/// An ordered list of segments for one delivery run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Route {
    pub segments: Vec<RouteSegment>,
    pub skipped: Vec<SkippedLeg>,
}

impl Route {
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether every requested leg was planned.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

fn describe(leg: u32, from: Waypoint, to: Waypoint) -> String {
    format!("Path {leg} ({from} to {to})")
}

/// Plan every leg of `request`.
///
/// Fails only on configuration problems (a requested station missing from
/// `stations`). Unreachable legs are reported through [`Route::skipped`].
pub fn build_route(
    grid: &OccupancyGrid,
    home: Pos,
    stations: &StationTable,
    request: &RouteRequest,
) -> Result<Route> {
    let mut waypoints: Vec<(Waypoint, Pos)> = Vec::with_capacity(request.len() + 2);
    waypoints.push((Waypoint::Home, home));
    for &id in request.stations() {
        waypoints.push((Waypoint::Station(id), stations.get(id)?));
    }
    waypoints.push((Waypoint::Home, home));

    log::info!(
        "planning {} legs for {:?}",
        waypoints.len() - 1,
        request.stations()
    );

    let pather = GridPather::new(grid);
    let mut range = PathRange::for_grid(grid);
    let mut route = Route::default();

    for (i, pair) in waypoints.windows(2).enumerate() {
        let leg = i as u32 + 1;
        let ((from, from_pos), (to, to_pos)) = (pair[0], pair[1]);
        let description = describe(leg, from, to);

        let path = range.astar_path(&pather, from_pos, to_pos);
        if path.is_empty() {
            log::warn!("{description}: no path from {from_pos} to {to_pos}, leg skipped");
            route.skipped.push(SkippedLeg {
                leg,
                from,
                to,
                description,
            });
            continue;
        }

        let commands = compile(&path)?;
        log::info!(
            "{description}: {} cells, commands [{}]",
            path.len(),
            commands
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        route.segments.push(RouteSegment {
            leg,
            from,
            to,
            path,
            commands,
            description,
        });
    }

    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::{Direction, expand};
    use crate::station::StationId::{self, *};

    fn table(entries: &[(StationId, (i32, i32))]) -> StationTable {
        entries
            .iter()
            .map(|&(id, (r, c))| (id, Pos::new(r, c)))
            .collect()
    }

    fn request(ids: &[StationId], t: &StationTable) -> RouteRequest {
        RouteRequest::new(ids.iter().copied(), 3, t).unwrap()
    }

    #[test]
    fn one_more_segment_than_stations() {
        let grid = OccupancyGrid::open(8, 8);
        let t = table(&[(Table1, (7, 0)), (Table2, (7, 7)), (Table3, (4, 4))]);
        for ids in [
            &[Table1][..],
            &[Table1, Table2][..],
            &[Table3, Table1, Table2][..],
        ] {
            let route = build_route(&grid, Pos::new(0, 4), &t, &request(ids, &t)).unwrap();
            assert_eq!(route.len(), ids.len() + 1);
            assert!(route.is_complete());
        }
    }

    #[test]
    fn legs_chain_home_stations_home() {
        let grid = OccupancyGrid::open(5, 5);
        let home = Pos::new(0, 2);
        let t = table(&[(Table1, (4, 0)), (Table2, (4, 4))]);
        let route = build_route(&grid, home, &t, &request(&[Table1, Table2], &t)).unwrap();

        let ends: Vec<(Waypoint, Waypoint)> =
            route.segments.iter().map(|s| (s.from, s.to)).collect();
        assert_eq!(
            ends,
            vec![
                (Waypoint::Home, Waypoint::Station(Table1)),
                (Waypoint::Station(Table1), Waypoint::Station(Table2)),
                (Waypoint::Station(Table2), Waypoint::Home),
            ]
        );
        assert_eq!(route.segments[0].description, "Path 1 (home to table1)");
        assert_eq!(route.segments[2].description, "Path 3 (table2 to home)");

        for seg in &route.segments {
            let start = seg.path.start().unwrap();
            assert_eq!(expand(start, &seg.commands), seg.path.cells());
            assert_eq!(seg.moves() as usize, seg.path.steps());
        }
        assert_eq!(route.segments[0].path.start(), Some(home));
        assert_eq!(route.segments[2].path.goal(), Some(home));
    }

    #[test]
    fn straight_leg_compiles_to_single_run() {
        let grid = OccupancyGrid::open(5, 5);
        let t = table(&[(Table1, (0, 4))]);
        let route = build_route(&grid, Pos::new(0, 0), &t, &request(&[Table1], &t)).unwrap();
        assert_eq!(
            route.segments[0].commands,
            vec![DirectionCommand::new(4, Direction::Right).unwrap()]
        );
    }

    #[test]
    fn unreachable_leg_is_skipped_not_fatal() {
        // table2 sits in a sealed pocket; table1 is reachable.
        let grid = OccupancyGrid::from_ascii(
            "\
......
......
...###
...#..
...###",
        )
        .unwrap();
        let home = Pos::new(0, 0);
        let t = table(&[(Table1, (4, 0)), (Table2, (3, 4))]);
        let route = build_route(&grid, home, &t, &request(&[Table1, Table2], &t)).unwrap();

        assert_eq!(route.skipped.len(), 2);
        assert_eq!(route.skipped[0].leg, 2);
        assert_eq!(route.skipped[0].to, Waypoint::Station(Table2));
        assert_eq!(route.skipped[1].leg, 3);
        assert_eq!(route.skipped[1].from, Waypoint::Station(Table2));

        assert_eq!(route.len(), 1);
        assert_eq!(route.segments[0].leg, 1);
        assert_eq!(route.segments[0].to, Waypoint::Station(Table1));
    }

    #[test]
    fn blocked_goal_skips_only_that_leg() {
        let grid = OccupancyGrid::from_ascii(
            "\
.....
.....
..#..",
        )
        .unwrap();
        let home = Pos::new(0, 0);
        let t = table(&[(Table1, (2, 2))]);
        let route = build_route(&grid, home, &t, &request(&[Table1], &t)).unwrap();
        assert!(route.is_empty());
        assert_eq!(route.skipped.len(), 2);
    }

    #[test]
    fn station_at_home_yields_empty_command_leg() {
        let grid = OccupancyGrid::open(3, 3);
        let home = Pos::new(1, 1);
        let t = table(&[(Table1, (1, 1))]);
        let route = build_route(&grid, home, &t, &request(&[Table1], &t)).unwrap();
        assert_eq!(route.len(), 2);
        assert!(route.segments.iter().all(|s| s.commands.is_empty()));
    }
}
