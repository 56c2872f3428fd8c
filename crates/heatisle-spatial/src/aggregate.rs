//! Per-location feature aggregation
//!
//! Builds the hexagon around a location and combines the building and
//! terrain statistics with the location coordinates into one record.

use std::{num::NonZeroUsize, thread};

use geo::Point;

use crate::{
    SpatialError,
    building::{CentroidBuilding, average_building_height_with_centroid},
    feature::{FeatureRecord, LAT_KEY, LON_KEY},
    hexagon::{Hexagon, create_hexagon},
    terrain::{TerrainGrid, terrain_stats},
};

/// Features of one location together with the hexagon they were computed on.
#[derive(Debug, Clone)]
pub struct LocationFeatures {
    pub hexagon: Hexagon,
    pub record: FeatureRecord,
}

impl LocationFeatures {
    /// Returns `true` if no building with a height was found in the hexagon.
    #[must_use]
    pub fn has_no_buildings(&self) -> bool {
        crate::building::centroid_stat_keys()
            .all(|key| self.record.get(&key).is_none_or(f64::is_nan))
    }
}

/// Computes the feature record of a single location.
///
/// The record holds the building statistics, then the terrain statistics
/// if a grid is given, then `Lat` and `Lon`.
///
/// # Errors
///
/// Propagates the errors of [`average_building_height_with_centroid`].
pub fn aggregate_location(
    center: Point<f64>,
    radius_meters: f64,
    buildings: &[CentroidBuilding],
    terrain: Option<&TerrainGrid>,
) -> Result<LocationFeatures, SpatialError> {
    let hexagon = create_hexagon(center, radius_meters);
    let mut record = average_building_height_with_centroid(buildings, hexagon.polygon())?;
    if let Some(grid) = terrain {
        record.extend(terrain_stats(grid, hexagon.polygon()));
    }
    record.insert(LAT_KEY, center.y());
    record.insert(LON_KEY, center.x());
    Ok(LocationFeatures { hexagon, record })
}

/// Computes the feature records of many independent locations in parallel.
///
/// Locations are split into contiguous chunks, one per worker thread. The
/// output is in the same order as `centers`. The first error in input order
/// is returned.
///
/// # Errors
///
/// Propagates the errors of [`aggregate_location`].
pub fn aggregate_locations(
    centers: &[Point<f64>],
    radius_meters: f64,
    buildings: &[CentroidBuilding],
    terrain: Option<&TerrainGrid>,
) -> Result<Vec<LocationFeatures>, SpatialError> {
    let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    let chunk_size = centers.len().div_ceil(workers).max(1);
    log::debug!(
        "Aggregating {} locations with {} workers",
        centers.len(),
        centers.len().div_ceil(chunk_size)
    );

    let mut results = centers.iter().map(|_| None).collect::<Vec<_>>();
    thread::scope(|s| {
        for (centers, slots) in centers.chunks(chunk_size).zip(results.chunks_mut(chunk_size)) {
            s.spawn(move || {
                for (center, slot) in centers.iter().zip(slots) {
                    *slot = Some(aggregate_location(*center, radius_meters, buildings, terrain));
                }
            });
        }
    });

    // every slot is filled once the scope has joined all workers
    results.into_iter().flatten().collect()
}
