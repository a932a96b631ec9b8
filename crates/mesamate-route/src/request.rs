//! The operator's ordered station selection.

use crate::error::{Result, RouteError};
use crate::station::{StationId, StationTable};

/// Default cap on stations per delivery run.
pub const DEFAULT_MAX_STATIONS: usize = 3;

/// An ordered list of 1..=K distinct stations. Order is the visiting order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteRequest {
    stations: Vec<StationId>,
}

impl RouteRequest {
    /// Validate a selection against the station cap and the loaded table.
    pub fn new(
        stations: impl IntoIterator<Item = StationId>,
        max_stations: usize,
        table: &StationTable,
    ) -> Result<Self> {
        let stations: Vec<StationId> = stations.into_iter().collect();
        if stations.is_empty() {
            return Err(RouteError::EmptyRequest);
        }
        if stations.len() > max_stations {
            return Err(RouteError::TooManyStations {
                requested: stations.len(),
                max: max_stations,
            });
        }
        for (i, id) in stations.iter().enumerate() {
            if stations[..i].contains(id) {
                return Err(RouteError::DuplicateStation(*id));
            }
            if !table.contains(*id) {
                return Err(RouteError::UnknownStation(*id));
            }
        }
        Ok(Self { stations })
    }

    #[inline]
    pub fn stations(&self) -> &[StationId] {
        &self.stations
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Always `false`; a request holds at least one station.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
