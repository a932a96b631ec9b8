//! Service stations: the closed [`StationId`] set and its [`StationTable`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use mesamate_core::{OccupancyGrid, Pos};

use crate::error::{Result, RouteError};

/// Identifier of a service station.
///
/// The set is closed: configuration naming any other station fails to load.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StationId {
    Table1,
    Table2,
    Table3,
    Table4,
}

impl StationId {
    /// Every station, in display order.
    pub const ALL: [StationId; 4] = [
        StationId::Table1,
        StationId::Table2,
        StationId::Table3,
        StationId::Table4,
    ];

    /// Stable lowercase name, as used in configuration and logs.
    pub const fn name(self) -> &'static str {
        match self {
            StationId::Table1 => "table1",
            StationId::Table2 => "table2",
            StationId::Table3 => "table3",
            StationId::Table4 => "table4",
        }
    }

    /// 1-based table number shown to the operator.
    pub const fn number(self) -> u32 {
        match self {
            StationId::Table1 => 1,
            StationId::Table2 => 2,
            StationId::Table3 => 3,
            StationId::Table4 => 4,
        }
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown station name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown station `{0}`")]
pub struct UnknownStationName(pub String);

impl FromStr for StationId {
    type Err = UnknownStationName;

    /// Accepts `table3`, `Table 3` or a bare `3`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        StationId::ALL
            .into_iter()
            .find(|id| norm == id.name() || norm == id.number().to_string())
            .ok_or_else(|| UnknownStationName(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Waypoint
// ---------------------------------------------------------------------------

/// One end of a route leg.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Waypoint {
    Home,
    Station(StationId),
}

impl Waypoint {
    pub fn station(self) -> Option<StationId> {
        match self {
            Waypoint::Home => None,
            Waypoint::Station(id) => Some(id),
        }
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waypoint::Home => f.write_str("home"),
            Waypoint::Station(id) => id.fmt(f),
        }
    }
}

impl From<StationId> for Waypoint {
    fn from(id: StationId) -> Self {
        Waypoint::Station(id)
    }
}

// ---------------------------------------------------------------------------
// StationTable
// ---------------------------------------------------------------------------

/// Static mapping from station to grid coordinate.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StationTable {
    coords: BTreeMap<StationId, Pos>,
}

impl Default for StationTable {
    /// The deployed restaurant layout.
    fn default() -> Self {
        Self::from_iter([
            (StationId::Table1, Pos::new(43, 146)),
            (StationId::Table2, Pos::new(43, 355)),
            (StationId::Table3, Pos::new(255, 355)),
            (StationId::Table4, Pos::new(255, 146)),
        ])
    }
}

impl FromIterator<(StationId, Pos)> for StationTable {
    fn from_iter<I: IntoIterator<Item = (StationId, Pos)>>(iter: I) -> Self {
        Self {
            coords: iter.into_iter().collect(),
        }
    }
}

impl StationTable {
    /// Coordinate of `id`.
    pub fn get(&self, id: StationId) -> Result<Pos> {
        self.coords
            .get(&id)
            .copied()
            .ok_or(RouteError::UnknownStation(id))
    }

    pub fn contains(&self, id: StationId) -> bool {
        self.coords.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Stations in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (StationId, Pos)> + '_ {
        self.coords.iter().map(|(&id, &p)| (id, p))
    }

    /// Check that `home` and every station lie on free cells of `grid`.
    pub fn validate(&self, grid: &OccupancyGrid, home: Pos) -> Result<()> {
        check_waypoint(grid, Waypoint::Home, home)?;
        for (id, pos) in self.iter() {
            check_waypoint(grid, Waypoint::Station(id), pos)?;
        }
        Ok(())
    }
}

fn check_waypoint(grid: &OccupancyGrid, waypoint: Waypoint, pos: Pos) -> Result<()> {
    if !grid.contains(pos) {
        return Err(RouteError::OutOfBounds {
            waypoint,
            pos,
            rows: grid.rows(),
            cols: grid.cols(),
        });
    }
    if !grid.is_free(pos) {
        return Err(RouteError::BlockedCell { waypoint, pos });
    }
    Ok(())
}

/// Default home position: top row, middle column.
pub fn default_home(grid: &OccupancyGrid) -> Pos {
    Pos::new(0, (grid.cols() / 2) as i32)
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn table_deserializes_from_map() {
        let t: StationTable =
            serde_json::from_str(r#"{"table1":[1,2],"table4":[3,4]}"#).unwrap();
        assert_eq!(t.get(StationId::Table4), Ok(Pos::new(3, 4)));
        assert!(!t.contains(StationId::Table2));
    }

    #[test]
    fn unknown_station_fails_to_load() {
        let r: std::result::Result<StationTable, _> = serde_json::from_str(r#"{"table7":[1,2]}"#);
        assert!(r.is_err());
    }
}
