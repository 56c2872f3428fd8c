//! Area-weighted building height statistics
//!
//! Every building inside a hexagon contributes its height weighted by its
//! footprint area. A building belongs to a hexagon when its footprint
//! centroid lies inside the hexagon or on its boundary. Areas are planar
//! areas in squared degrees, the same units the hexagon area is measured in.
//!
//! The `min` and `max` statistics are the 0th and 100th weighted
//! percentiles. They are weighted extremes and may differ from the literal
//! extremes of the height sample when some footprints have zero area.

use std::iter;

use geo::{Area as _, Centroid as _, Geometry, Intersects as _, Point, Polygon};
use heatisle_stats::weighted;

use crate::{SpatialError, feature::FeatureRecord};

/// Prefix shared by all building statistic keys.
pub const CENTROID_STAT_PREFIX: &str = "centroid_stat_";

/// Building statistic names, in output order.
pub const CENTROID_STAT_NAMES: [&str; 9] = [
    "total_height_area",
    "avg_height_area",
    "mean",
    "std_dev",
    "min",
    "25%",
    "50%",
    "75%",
    "max",
];

const PERCENTILES: [(&str, f64); 5] = [
    ("min", 0.0),
    ("25%", 25.0),
    ("50%", 50.0),
    ("75%", 75.0),
    ("max", 100.0),
];

/// Returns the building statistic keys, e.g. `centroid_stat_mean`.
pub fn centroid_stat_keys() -> impl Iterator<Item = String> {
    CENTROID_STAT_NAMES
        .iter()
        .map(|name| format!("{CENTROID_STAT_PREFIX}{name}"))
}

/// A building footprint with its height in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingRecord {
    pub geometry: Geometry<f64>,
    /// `None` when the provider has no height for this building.
    pub height: Option<f64>,
}

impl BuildingRecord {
    #[must_use]
    pub fn new(geometry: impl Into<Geometry<f64>>, height: Option<f64>) -> Self {
        Self {
            geometry: geometry.into(),
            height,
        }
    }
}

/// A [`BuildingRecord`] augmented with its footprint centroid and area.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidBuilding {
    record: BuildingRecord,
    centroid: Point<f64>,
    footprint_area: f64,
}

impl CentroidBuilding {
    #[must_use]
    pub fn record(&self) -> &BuildingRecord {
        &self.record
    }

    #[must_use]
    pub fn centroid(&self) -> Point<f64> {
        self.centroid
    }

    #[must_use]
    pub fn footprint_area(&self) -> f64 {
        self.footprint_area
    }

    /// Returns the height if it is present and finite.
    #[must_use]
    pub fn height(&self) -> Option<f64> {
        self.record.height.filter(|h| h.is_finite())
    }
}

/// Computes the centroid of every building footprint.
///
/// The input is consumed and an augmented collection is returned.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidGeometry`] if a footprint is not a
/// polygon, multi-polygon or point, or if it is empty.
///
/// # Examples
///
/// ```
/// use geo::polygon;
/// use heatisle_spatial::building::{BuildingRecord, get_centroid};
///
/// let square = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
/// let buildings = get_centroid(vec![BuildingRecord::new(square, Some(10.0))]).unwrap();
/// let centroid = buildings[0].centroid();
/// assert!((centroid.x() - 1.0).abs() < 1e-12 && (centroid.y() - 1.0).abs() < 1e-12);
/// assert!((buildings[0].footprint_area() - 4.0).abs() < 1e-12);
/// ```
pub fn get_centroid<I>(records: I) -> Result<Vec<CentroidBuilding>, SpatialError>
where
    I: IntoIterator<Item = BuildingRecord>,
{
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            match &record.geometry {
                Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Point(_) => {}
                other => {
                    return Err(SpatialError::invalid_geometry(format!(
                        "building {index} has unsupported geometry type {}",
                        geometry_type_name(other)
                    )));
                }
            }
            let centroid = record.geometry.centroid().ok_or_else(|| {
                SpatialError::invalid_geometry(format!("building {index} has an empty footprint"))
            })?;
            let footprint_area = record.geometry.unsigned_area();
            Ok(CentroidBuilding {
                record,
                centroid,
                footprint_area,
            })
        })
        .collect()
}

pub(crate) fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Computes area-weighted height statistics of the buildings in `hexagon`.
///
/// Buildings without a height are ignored. If no building is selected, every
/// `centroid_stat_*` key is `NaN`.
///
/// # Errors
///
/// Returns [`SpatialError::Stats`] if the selected footprints have zero total
/// area, since no area-weighted statistic exists then.
///
/// # Examples
///
/// ```
/// use geo::{Point, polygon};
/// use heatisle_spatial::{
///     building::{BuildingRecord, average_building_height_with_centroid, get_centroid},
///     hexagon::create_hexagon,
/// };
///
/// let footprint = |x: f64| polygon![
///     (x: x, y: 0.0), (x: x + 1e-5, y: 0.0), (x: x + 1e-5, y: 1e-5), (x: x, y: 1e-5),
/// ];
/// let buildings = get_centroid(vec![
///     BuildingRecord::new(footprint(0.0), Some(10.0)),
///     BuildingRecord::new(footprint(2e-5), Some(20.0)),
///     BuildingRecord::new(footprint(1.0), Some(99.0)), // far away
/// ])
/// .unwrap();
///
/// let hexagon = create_hexagon(Point::new(0.0, 0.0), 1_000.0);
/// let record = average_building_height_with_centroid(&buildings, hexagon.polygon()).unwrap();
/// assert!((record.get("centroid_stat_mean").unwrap() - 15.0).abs() < 1e-9);
/// assert_eq!(record.len(), 9);
/// ```
pub fn average_building_height_with_centroid(
    buildings: &[CentroidBuilding],
    hexagon: &Polygon<f64>,
) -> Result<FeatureRecord, SpatialError> {
    let (heights, areas): (Vec<f64>, Vec<f64>) = buildings
        .iter()
        .filter(|building| hexagon.intersects(&building.centroid))
        .filter_map(|building| Some((building.height()?, building.footprint_area)))
        .unzip();

    if heights.is_empty() {
        return Ok(FeatureRecord::nan(centroid_stat_keys()));
    }

    let total_height_area = iter::zip(&heights, &areas).map(|(h, a)| h * a).sum::<f64>();
    let hexagon_area = hexagon.unsigned_area();
    let avg_height_area = if hexagon_area > 0.0 {
        total_height_area / hexagon_area
    } else {
        0.0
    };

    let mut record = FeatureRecord::new();
    let key = |name: &str| format!("{CENTROID_STAT_PREFIX}{name}");
    record.insert(key("total_height_area"), total_height_area);
    record.insert(key("avg_height_area"), avg_height_area);
    record.insert(key("mean"), weighted::weighted_mean(&heights, &areas)?);
    record.insert(key("std_dev"), weighted::weighted_std(&heights, &areas)?);
    for (name, percentile) in PERCENTILES {
        let value = weighted::weighted_percentile(&heights, &areas, percentile)?;
        record.insert(key(name), value);
    }
    Ok(record)
}
