//! Terrain elevation statistics
//!
//! A [`TerrainGrid`] is a north-up raster already reprojected to WGS84
//! degrees. Cells are selected by the hexagon when their center lies inside
//! the hexagon or on its boundary.

use std::{fs::File, io::BufReader, ops::Range, path::Path};

use geo::{BoundingRect as _, Intersects as _, Point, Polygon};
use heatisle_stats::{descriptive::DescriptiveStats, percentiles::Percentiles};
use serde::{Deserialize, Serialize};

use crate::{SpatialError, feature::FeatureRecord};

/// Prefix shared by all terrain statistic keys.
pub const TERRAIN_STAT_PREFIX: &str = "terrain_stat_";

/// Terrain statistic names, in output order.
pub const TERRAIN_STAT_NAMES: [&str; 7] = ["mean", "std_dev", "min", "25%", "50%", "75%", "max"];

/// Returns the terrain statistic keys, e.g. `terrain_stat_mean`.
pub fn terrain_stat_keys() -> impl Iterator<Item = String> {
    TERRAIN_STAT_NAMES
        .iter()
        .map(|name| format!("{TERRAIN_STAT_PREFIX}{name}"))
}

/// Serialized form of a [`TerrainGrid`], validated on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TerrainGridData {
    origin_lon: f64,
    origin_lat: f64,
    cell_width: f64,
    cell_height: f64,
    rows: usize,
    cols: usize,
    values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nodata: Option<f64>,
}

/// A regular elevation grid in WGS84 degrees.
///
/// `origin_lon`/`origin_lat` is the top-left corner of the top-left cell.
/// Row indices grow southwards and column indices grow eastwards. Values are
/// stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TerrainGridData", into = "TerrainGridData")]
pub struct TerrainGrid {
    origin: Point<f64>,
    cell_width: f64,
    cell_height: f64,
    rows: usize,
    cols: usize,
    values: Vec<f64>,
    nodata: Option<f64>,
}

impl TerrainGrid {
    /// Creates a grid from row-major `values`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidTerrainGrid`] if the origin is not
    /// finite, a cell size is not positive, or `values` does not hold
    /// `rows * cols` entries.
    pub fn new(
        origin: Point<f64>,
        cell_width: f64,
        cell_height: f64,
        rows: usize,
        cols: usize,
        values: Vec<f64>,
        nodata: Option<f64>,
    ) -> Result<Self, SpatialError> {
        TerrainGridData {
            origin_lon: origin.x(),
            origin_lat: origin.y(),
            cell_width,
            cell_height,
            rows,
            cols,
            values,
            nodata,
        }
        .try_into()
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the center of cell (`row`, `col`) in degrees.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn cell_center(&self, row: usize, col: usize) -> Point<f64> {
        Point::new(
            self.origin.x() + (col as f64 + 0.5) * self.cell_width,
            self.origin.y() - (row as f64 + 0.5) * self.cell_height,
        )
    }

    /// Returns the elevation of a cell, or `None` for nodata and non-finite cells.
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let value = self.values[row * self.cols + col];
        if !value.is_finite() || self.nodata == Some(value) {
            return None;
        }
        Some(value)
    }

    /// Collects the valid values of the cells whose center lies in `polygon`.
    #[must_use]
    pub fn masked_values(&self, polygon: &Polygon<f64>) -> Vec<f64> {
        let Some(rect) = polygon.bounding_rect() else {
            return vec![];
        };
        // fractional indices of the cell centers at the bounding box edges
        let cols = Self::index_range(
            (rect.min().x - self.origin.x()) / self.cell_width - 0.5,
            (rect.max().x - self.origin.x()) / self.cell_width - 0.5,
            self.cols,
        );
        let rows = Self::index_range(
            (self.origin.y() - rect.max().y) / self.cell_height - 0.5,
            (self.origin.y() - rect.min().y) / self.cell_height - 0.5,
            self.rows,
        );

        let mut values = vec![];
        for row in rows {
            for col in cols.clone() {
                if polygon.intersects(&self.cell_center(row, col))
                    && let Some(value) = self.value(row, col)
                {
                    values.push(value);
                }
            }
        }
        values
    }

    // Widened by one cell on each side; the exact test is done per cell.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn index_range(lo: f64, hi: f64, len: usize) -> Range<usize> {
        let start = ((lo.floor() - 1.0).max(0.0) as usize).min(len);
        let end = ((hi.ceil() + 2.0).max(0.0) as usize).min(len);
        start..end.max(start)
    }
}

impl TryFrom<TerrainGridData> for TerrainGrid {
    type Error = SpatialError;

    fn try_from(data: TerrainGridData) -> Result<Self, Self::Error> {
        let invalid = |reason: String| SpatialError::InvalidTerrainGrid { reason };
        if !data.origin_lon.is_finite() || !data.origin_lat.is_finite() {
            return Err(invalid(format!(
                "origin must be finite, got ({}, {})",
                data.origin_lon, data.origin_lat
            )));
        }
        if !(data.cell_width.is_finite() && data.cell_width > 0.0)
            || !(data.cell_height.is_finite() && data.cell_height > 0.0)
        {
            return Err(invalid(format!(
                "cell size must be positive, got {} x {}",
                data.cell_width, data.cell_height
            )));
        }
        let expected = data.rows.checked_mul(data.cols);
        if expected != Some(data.values.len()) {
            return Err(invalid(format!(
                "expected {} x {} values, got {}",
                data.rows,
                data.cols,
                data.values.len()
            )));
        }
        Ok(Self {
            origin: Point::new(data.origin_lon, data.origin_lat),
            cell_width: data.cell_width,
            cell_height: data.cell_height,
            rows: data.rows,
            cols: data.cols,
            values: data.values,
            nodata: data.nodata,
        })
    }
}

impl From<TerrainGrid> for TerrainGridData {
    fn from(grid: TerrainGrid) -> Self {
        Self {
            origin_lon: grid.origin.x(),
            origin_lat: grid.origin.y(),
            cell_width: grid.cell_width,
            cell_height: grid.cell_height,
            rows: grid.rows,
            cols: grid.cols,
            values: grid.values,
            nodata: grid.nodata,
        }
    }
}

/// Reads a terrain grid from a JSON file.
///
/// # Errors
///
/// Returns [`SpatialError::Io`] if the file cannot be opened and
/// [`SpatialError::Parse`] if it is not a valid grid.
pub fn read_terrain_grid<P>(path: P) -> Result<TerrainGrid, SpatialError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| SpatialError::Io {
        path: path.to_owned(),
        source,
    })?;
    let grid = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        SpatialError::Parse {
            path: path.to_owned(),
            source,
        }
    })?;
    log::debug!("Loaded terrain grid from {}", path.display());
    Ok(grid)
}

/// Computes unweighted elevation statistics of the cells in `hexagon`.
///
/// The standard deviation is the population standard deviation. If no valid
/// cell is selected, every `terrain_stat_*` key is `NaN`.
///
/// # Examples
///
/// ```
/// use geo::{Point, polygon};
/// use heatisle_spatial::terrain::{TerrainGrid, terrain_stats};
///
/// // 2 x 2 grid of 1° cells with its top-left corner at (0, 2)
/// let grid = TerrainGrid::new(Point::new(0.0, 2.0), 1.0, 1.0, 2, 2, vec![1.0, 2.0, 3.0, 4.0], None)
///     .unwrap();
/// let area = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
/// let stats = terrain_stats(&grid, &area);
/// assert_eq!(stats.get("terrain_stat_mean"), Some(2.5));
/// assert_eq!(stats.get("terrain_stat_max"), Some(4.0));
/// ```
#[must_use]
pub fn terrain_stats(grid: &TerrainGrid, hexagon: &Polygon<f64>) -> FeatureRecord {
    let values = grid.masked_values(hexagon);
    let Some(stats) = DescriptiveStats::new(values.iter().copied()) else {
        return FeatureRecord::nan(terrain_stat_keys());
    };
    let percentiles = Percentiles::new(&values, &[25.0, 50.0, 75.0]);

    let key = |name: &str| format!("{TERRAIN_STAT_PREFIX}{name}");
    let mut record = FeatureRecord::new();
    record.insert(key("mean"), stats.mean);
    record.insert(key("std_dev"), stats.std_dev);
    record.insert(key("min"), stats.min);
    for (percentile, value) in percentiles.iter() {
        record.insert(key(&format!("{percentile}%")), value);
    }
    record.insert(key("max"), stats.max);
    record
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::polygon;

    use super::*;
    use crate::hexagon::create_hexagon;

    fn grid_3x3(values: Vec<f64>, nodata: Option<f64>) -> TerrainGrid {
        TerrainGrid::new(Point::new(10.0, 50.0), 0.001, 0.001, 3, 3, values, nodata).unwrap()
    }

    #[test]
    fn test_cell_center() {
        let grid = grid_3x3(vec![0.0; 9], None);
        let center = grid.cell_center(2, 1);
        assert_abs_diff_eq!(center.x(), 10.0015, epsilon = 1e-12);
        assert_abs_diff_eq!(center.y(), 49.9975, epsilon = 1e-12);
    }

    #[test]
    fn test_hexagon_selects_center_cell() {
        let values = (1..=9).map(f64::from).collect();
        let grid = grid_3x3(values, None);
        // the middle cell center is (10.0015, 49.9985); a 50 m hexagon covers
        // only that center
        let hexagon = create_hexagon(grid.cell_center(1, 1), 50.0);
        let stats = terrain_stats(&grid, hexagon.polygon());
        for key in terrain_stat_keys() {
            let expected = if key.ends_with("std_dev") { 0.0 } else { 5.0 };
            assert_abs_diff_eq!(stats.get(&key).unwrap(), expected);
        }
    }

    #[test]
    fn test_stats_over_whole_grid() {
        let values = (1..=9).map(f64::from).collect();
        let grid = grid_3x3(values, None);
        let area = polygon![
            (x: 9.0, y: 49.0),
            (x: 11.0, y: 49.0),
            (x: 11.0, y: 51.0),
            (x: 9.0, y: 51.0),
        ];
        let stats = terrain_stats(&grid, &area);
        assert_eq!(
            stats.keys().collect::<Vec<_>>(),
            terrain_stat_keys().collect::<Vec<_>>()
        );
        assert_abs_diff_eq!(stats.get("terrain_stat_mean").unwrap(), 5.0);
        assert_abs_diff_eq!(
            stats.get("terrain_stat_std_dev").unwrap(),
            (60.0_f64 / 9.0).sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(stats.get("terrain_stat_min"), Some(1.0));
        assert_eq!(stats.get("terrain_stat_25%"), Some(3.0));
        assert_eq!(stats.get("terrain_stat_50%"), Some(5.0));
        assert_eq!(stats.get("terrain_stat_75%"), Some(7.0));
        assert_eq!(stats.get("terrain_stat_max"), Some(9.0));
    }

    #[test]
    fn test_nodata_and_non_finite_cells_are_skipped() {
        let mut values = vec![-9999.0; 9];
        values[0] = 2.0;
        values[1] = f64::NAN;
        values[2] = 4.0;
        let grid = grid_3x3(values, Some(-9999.0));
        let area = polygon![
            (x: 9.0, y: 49.0),
            (x: 11.0, y: 49.0),
            (x: 11.0, y: 51.0),
            (x: 9.0, y: 51.0),
        ];
        let stats = terrain_stats(&grid, &area);
        assert_eq!(stats.get("terrain_stat_mean"), Some(3.0));
        assert_eq!(stats.get("terrain_stat_min"), Some(2.0));
    }

    #[test]
    fn test_no_cells_selected_is_all_nan() {
        let grid = grid_3x3(vec![1.0; 9], None);
        let hexagon = create_hexagon(Point::new(0.0, 0.0), 100.0);
        let stats = terrain_stats(&grid, hexagon.polygon());
        assert_eq!(stats.len(), 7);
        assert!(stats.is_all_nan());
    }

    #[test]
    fn test_invalid_grid_is_rejected() {
        let err = TerrainGrid::new(Point::new(0.0, 0.0), 1.0, 1.0, 2, 2, vec![1.0; 3], None)
            .unwrap_err();
        assert!(matches!(err, SpatialError::InvalidTerrainGrid { .. }));
        let err = TerrainGrid::new(Point::new(0.0, 0.0), 0.0, 1.0, 1, 1, vec![1.0], None)
            .unwrap_err();
        assert!(matches!(err, SpatialError::InvalidTerrainGrid { .. }));

        let json = r#"{"origin_lon":0,"origin_lat":0,"cell_width":1,"cell_height":1,"rows":1,"cols":2,"values":[1]}"#;
        assert!(serde_json::from_str::<TerrainGrid>(json).is_err());
    }

    #[test]
    fn test_read_terrain_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seattle_terrain.json");
        let grid = grid_3x3(vec![1.0; 9], Some(-1.0));
        std::fs::write(&path, serde_json::to_string(&grid).unwrap()).unwrap();
        assert_eq!(read_terrain_grid(&path).unwrap(), grid);

        let err = read_terrain_grid(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, SpatialError::Io { .. }));
    }
}
