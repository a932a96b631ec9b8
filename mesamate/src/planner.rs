//! Floor plan loading and per-run route planning.

use std::path::Path;

use mesamate_core::{GridError, OccupancyGrid, Pos, build_grid};
use mesamate_route::{
    Route, RouteError, RouteRequest, StationId, StationTable, build_route, default_home,
};

use crate::config::MapConfig;

/// Decode the floor-plan image and threshold it into a grid.
pub fn load_grid(path: &Path, threshold: u8) -> Result<OccupancyGrid, GridError> {
    let image = image::open(path)?.to_luma8();
    let grid = build_grid(&image, threshold)?;
    log::info!(
        "Loaded floor plan {}: {}x{} cells, {} free",
        path.display(),
        grid.rows(),
        grid.cols(),
        grid.free_count()
    );
    Ok(grid)
}

/// Everything needed to turn an operator's selection into a [`Route`].
#[derive(Debug)]
pub struct Planner {
    grid: OccupancyGrid,
    home: Pos,
    stations: StationTable,
    max_stations: usize,
}

impl Planner {
    /// Validate `home` and every station against `grid`.
    pub fn new(
        grid: OccupancyGrid,
        home: Pos,
        stations: StationTable,
        max_stations: usize,
    ) -> Result<Self, RouteError> {
        stations.validate(&grid, home)?;
        Ok(Self {
            grid,
            home,
            stations,
            max_stations,
        })
    }

    /// Build a planner from the map section, using the default home when
    /// none is configured.
    pub fn from_map(
        map: &MapConfig,
        stations: StationTable,
        max_stations: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let grid = load_grid(&map.image, map.threshold)?;
        let home = map.home.unwrap_or_else(|| default_home(&grid));
        Ok(Self::new(grid, home, stations, max_stations)?)
    }

    pub fn home(&self) -> Pos {
        self.home
    }

    pub fn stations(&self) -> &StationTable {
        &self.stations
    }

    pub fn max_stations(&self) -> usize {
        self.max_stations
    }

    /// Plan home → `selection`… → home.
    pub fn plan(&self, selection: &[StationId]) -> Result<Route, RouteError> {
        let request =
            RouteRequest::new(selection.iter().copied(), self.max_stations, &self.stations)?;
        build_route(&self.grid, self.home, &self.stations, &request)
    }
}
