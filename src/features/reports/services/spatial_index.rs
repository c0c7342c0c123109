//! Grid index over report locations
//!
//! Coordinate space is cut into square cells (in degrees). A radius query
//! collects the cells overlapping the query's bounding box, then keeps only
//! candidates whose Haversine distance is within the radius. The index is a
//! cache derived from the report store and can be rebuilt from a full scan.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::features::reports::models::{GeoPoint, Report};
use crate::shared::constants::{EARTH_RADIUS_METERS, METERS_PER_DEGREE};

/// Fallback cell edge when configured with a non-positive size
const DEFAULT_CELL_SIZE_METERS: f64 = 500.0;

/// Slack added to bounding boxes to absorb floating point error (~1cm)
const BOUNDS_EPSILON_DEGREES: f64 = 1e-7;

type CellKey = (i64, i64);

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("cannot index report {0}: location is out of range")]
    InvalidLocation(Uuid),
}

/// Derived (report id, location) pair owned by the index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialIndexEntry {
    pub report_id: Uuid,
    pub location: GeoPoint,
}

impl From<&Report> for SpatialIndexEntry {
    fn from(r: &Report) -> Self {
        Self {
            report_id: r.id,
            location: r.location,
        }
    }
}

/// Marks the insert sequence at which a rebuild's store scan began
#[derive(Debug, Clone, Copy)]
pub struct RebuildTicket(u64);

#[derive(Default)]
struct Grid {
    /// cell -> report id -> (location, insert sequence)
    cells: HashMap<CellKey, HashMap<Uuid, (GeoPoint, u64)>>,
    len: usize,
    next_seq: u64,
}

impl Grid {
    fn insert(&mut self, key: CellKey, entry: SpatialIndexEntry) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let cell = self.cells.entry(key).or_default();
        if cell.insert(entry.report_id, (entry.location, seq)).is_none() {
            self.len += 1;
        }
    }
}

pub struct SpatialIndex {
    cell_degrees: f64,
    grid: RwLock<Grid>,
    stale: AtomicBool,
    #[cfg(test)]
    inject_index_failure: AtomicBool,
}

impl SpatialIndex {
    pub fn new(cell_size_meters: f64) -> Self {
        let cell_size_meters = if cell_size_meters.is_finite() && cell_size_meters > 0.0 {
            cell_size_meters
        } else {
            tracing::warn!(
                "Invalid index cell size {}, using {}m",
                cell_size_meters,
                DEFAULT_CELL_SIZE_METERS
            );
            DEFAULT_CELL_SIZE_METERS
        };

        Self {
            cell_degrees: cell_size_meters / METERS_PER_DEGREE,
            grid: RwLock::new(Grid::default()),
            stale: AtomicBool::new(false),
            #[cfg(test)]
            inject_index_failure: AtomicBool::new(false),
        }
    }

    fn row(&self, lat: f64) -> i64 {
        (lat / self.cell_degrees).floor() as i64
    }

    fn col(&self, lng: f64) -> i64 {
        (lng / self.cell_degrees).floor() as i64
    }

    fn cell_of(&self, location: GeoPoint) -> CellKey {
        (self.row(location.lat), self.col(location.lng))
    }

    /// Add an entry. Re-indexing the same report is a no-op.
    pub async fn index(&self, report_id: Uuid, location: GeoPoint) -> Result<(), IndexError> {
        if !location.is_valid() {
            return Err(IndexError::InvalidLocation(report_id));
        }

        #[cfg(test)]
        if self.inject_index_failure.swap(false, Ordering::SeqCst) {
            return Err(IndexError::InvalidLocation(report_id));
        }

        let key = self.cell_of(location);
        let mut grid = self.grid.write().await;
        grid.insert(
            key,
            SpatialIndexEntry {
                report_id,
                location,
            },
        );
        Ok(())
    }

    /// Ids of indexed reports within `radius_meters` (great-circle) of `center`
    pub async fn query(&self, center: GeoPoint, radius_meters: f64) -> HashSet<Uuid> {
        let mut found = HashSet::new();
        if !center.is_valid() || radius_meters.is_nan() || radius_meters < 0.0 {
            return found;
        }

        let (rows, cols) = self.cell_ranges(center, radius_meters);
        let grid = self.grid.read().await;

        let mut visit = |cell: &HashMap<Uuid, (GeoPoint, u64)>| {
            for (id, (location, _)) in cell {
                if haversine_distance(center, *location) <= radius_meters {
                    found.insert(*id);
                }
            }
        };

        let row_count = (rows.1 - rows.0 + 1) as u128;
        let col_count: u128 = cols.iter().map(|(lo, hi)| (hi - lo + 1) as u128).sum();

        if row_count * col_count > grid.cells.len() as u128 {
            // Range is wider than the occupied set; walk occupied cells instead
            for ((row, col), cell) in grid.cells.iter() {
                let in_rows = (rows.0..=rows.1).contains(row);
                let in_cols = cols.iter().any(|(lo, hi)| (*lo..=*hi).contains(col));
                if in_rows && in_cols {
                    visit(cell);
                }
            }
        } else {
            for row in rows.0..=rows.1 {
                for &(lo, hi) in &cols {
                    for col in lo..=hi {
                        if let Some(cell) = grid.cells.get(&(row, col)) {
                            visit(cell);
                        }
                    }
                }
            }
        }

        found
    }

    /// Row range and (possibly wrapped) column ranges covering the query circle
    fn cell_ranges(&self, center: GeoPoint, radius_meters: f64) -> ((i64, i64), Vec<(i64, i64)>) {
        let angular = radius_meters / EARTH_RADIUS_METERS;
        let lat_delta = angular.to_degrees() + BOUNDS_EPSILON_DEGREES;

        let min_lat = center.lat - lat_delta;
        let max_lat = center.lat + lat_delta;
        let rows = (self.row(min_lat.max(-90.0)), self.row(max_lat.min(90.0)));

        let full = vec![(self.col(-180.0), self.col(180.0))];

        // Circle reaches a pole: every longitude is in range
        if min_lat <= -90.0 || max_lat >= 90.0 {
            return (rows, full);
        }

        if angular >= std::f64::consts::FRAC_PI_2 {
            return (rows, full);
        }

        let ratio = angular.sin() / center.lat.to_radians().cos();
        if ratio >= 1.0 {
            return (rows, full);
        }
        let lng_delta = ratio.asin().to_degrees() + BOUNDS_EPSILON_DEGREES;
        if lng_delta >= 180.0 {
            return (rows, full);
        }

        let min_lng = center.lng - lng_delta;
        let max_lng = center.lng + lng_delta;

        let cols = if min_lng < -180.0 {
            vec![
                (self.col(-180.0), self.col(max_lng)),
                (self.col(min_lng + 360.0), self.col(180.0)),
            ]
        } else if max_lng > 180.0 {
            vec![
                (self.col(min_lng), self.col(180.0)),
                (self.col(-180.0), self.col(max_lng - 360.0)),
            ]
        } else {
            vec![(self.col(min_lng), self.col(max_lng))]
        };

        (rows, cols)
    }

    /// Start a rebuild; take the store scan after calling this.
    ///
    /// Clears the stale flag, so failures from here on mark the index stale again.
    pub async fn begin_rebuild(&self) -> RebuildTicket {
        self.stale.store(false, Ordering::SeqCst);
        RebuildTicket(self.grid.read().await.next_seq)
    }

    /// Replace the grid with `entries`, keeping anything indexed since `ticket`
    /// so concurrent submissions are not lost.
    pub async fn finish_rebuild(
        &self,
        ticket: RebuildTicket,
        entries: impl IntoIterator<Item = SpatialIndexEntry>,
    ) -> usize {
        let mut fresh = Grid::default();
        let mut skipped = 0usize;
        for entry in entries {
            if entry.location.is_valid() {
                fresh.insert(self.cell_of(entry.location), entry);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            tracing::warn!("Skipped {} entries with invalid locations during rebuild", skipped);
        }

        let mut grid = self.grid.write().await;

        let since = ticket.0;
        let recent: Vec<(CellKey, SpatialIndexEntry)> = grid
            .cells
            .iter()
            .flat_map(move |(key, cell)| {
                cell.iter()
                    .filter(move |(_, (_, seq))| *seq >= since)
                    .map(move |(id, (location, _))| {
                        (
                            *key,
                            SpatialIndexEntry {
                                report_id: *id,
                                location: *location,
                            },
                        )
                    })
            })
            .collect();
        for (key, entry) in recent {
            fresh.insert(key, entry);
        }

        fresh.next_seq = fresh.next_seq.max(grid.next_seq);
        let len = fresh.len;
        *grid = fresh;

        len
    }

    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.grid.read().await.len
    }

    /// Make the next `index` call fail
    #[cfg(test)]
    pub fn fail_next_index(&self) {
        self.inject_index_failure.store(true, Ordering::SeqCst);
    }
}

/// Great-circle distance between two points in meters
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}
