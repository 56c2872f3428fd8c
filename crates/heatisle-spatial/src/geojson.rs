//! GeoJSON reading and writing
//!
//! Only the subset of GeoJSON used by the pipeline is modeled: feature
//! collections of features with a geometry and free-form properties.
//! Positions may carry an altitude, which is ignored.

use std::{fs::File, io::BufReader, path::Path};

use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    SpatialError,
    building::{BuildingRecord, geometry_type_name},
    feature::{FeatureRecord, LAT_KEY, LON_KEY},
};

/// Property holding the building height in meters.
pub const HEIGHT_PROPERTY: &str = "height";

/// Height value used by the footprint provider for unknown heights.
pub const MISSING_HEIGHT: f64 = -1.0;

/// A GeoJSON position: longitude, latitude and optional altitude.
pub type Position = Vec<f64>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureCollectionType {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureType {
    #[default]
    Feature,
}

/// A GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: FeatureCollectionType,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: FeatureCollectionType::FeatureCollection,
            features,
        }
    }
}

/// A GeoJSON `Feature`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: FeatureType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub geometry: Option<GeometryObject>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// A GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeometryObject {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<GeometryObject> },
}

fn to_coord(position: &[f64]) -> Result<Coord<f64>, SpatialError> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        _ => Err(SpatialError::invalid_geometry(format!(
            "position must hold at least two finite numbers, got {position:?}"
        ))),
    }
}

fn to_line_string(positions: &[Position]) -> Result<LineString<f64>, SpatialError> {
    positions
        .iter()
        .map(|p| to_coord(p))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn to_polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, SpatialError> {
    let mut rings = rings.iter().map(|ring| to_line_string(ring));
    let exterior = rings
        .next()
        .transpose()?
        .ok_or_else(|| SpatialError::invalid_geometry("polygon has no exterior ring"))?;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn from_line_string(line: &LineString<f64>) -> Vec<Position> {
    line.coords().map(|c| vec![c.x, c.y]).collect()
}

fn from_polygon(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(from_line_string)
        .collect()
}

impl TryFrom<&GeometryObject> for Geometry<f64> {
    type Error = SpatialError;

    fn try_from(object: &GeometryObject) -> Result<Self, Self::Error> {
        let geometry: Geometry<f64> = match object {
            GeometryObject::Point { coordinates } => Point::from(to_coord(coordinates)?).into(),
            GeometryObject::MultiPoint { coordinates } => coordinates
                .iter()
                .map(|p| to_coord(p).map(Point::from))
                .collect::<Result<Vec<_>, _>>()
                .map(geo::MultiPoint::new)?
                .into(),
            GeometryObject::LineString { coordinates } => to_line_string(coordinates)?.into(),
            GeometryObject::MultiLineString { coordinates } => coordinates
                .iter()
                .map(|line| to_line_string(line))
                .collect::<Result<Vec<_>, _>>()
                .map(geo::MultiLineString::new)?
                .into(),
            GeometryObject::Polygon { coordinates } => to_polygon(coordinates)?.into(),
            GeometryObject::MultiPolygon { coordinates } => coordinates
                .iter()
                .map(|rings| to_polygon(rings))
                .collect::<Result<Vec<_>, _>>()
                .map(MultiPolygon::new)?
                .into(),
            GeometryObject::GeometryCollection { geometries } => geometries
                .iter()
                .map(Geometry::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(|members| Geometry::GeometryCollection(geo::GeometryCollection(members)))?,
        };
        Ok(geometry)
    }
}

impl From<&Polygon<f64>> for GeometryObject {
    fn from(polygon: &Polygon<f64>) -> Self {
        Self::Polygon {
            coordinates: from_polygon(polygon),
        }
    }
}

impl From<Point<f64>> for GeometryObject {
    fn from(point: Point<f64>) -> Self {
        Self::Point {
            coordinates: vec![point.x(), point.y()],
        }
    }
}

impl Feature {
    #[must_use]
    pub fn new(geometry: Option<GeometryObject>, properties: Map<String, Value>) -> Self {
        Self {
            kind: FeatureType::Feature,
            id: None,
            geometry,
            properties: Some(properties),
        }
    }

    /// Returns the value of `key`, treating a missing properties object as empty.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(key)
    }

    /// Returns `true` if the feature has a property named `key`, even if it is `null`.
    #[must_use]
    pub fn has_property(&self, key: &str) -> bool {
        self.property(key).is_some()
    }

    /// Reads a numeric property.
    ///
    /// Returns `Ok(None)` if the property is missing or `null`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidProperty`] if the value is neither a
    /// number nor `null`.
    pub fn property_f64(&self, key: &str) -> Result<Option<f64>, SpatialError> {
        match self.property(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| {
                SpatialError::InvalidProperty {
                    property: key.to_owned(),
                    reason: format!("{n} is not representable as a float"),
                }
            }),
            Some(other) => Err(SpatialError::InvalidProperty {
                property: key.to_owned(),
                reason: format!("expected a number, got {other}"),
            }),
        }
    }

    /// Converts the geometry to a `geo` geometry.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidGeometry`] if the geometry is `null` or malformed.
    pub fn to_geometry(&self) -> Result<Geometry<f64>, SpatialError> {
        let object = self
            .geometry
            .as_ref()
            .ok_or_else(|| SpatialError::invalid_geometry("feature has no geometry"))?;
        Geometry::try_from(object)
    }

    /// Returns the location of a point feature.
    ///
    /// Uses the point geometry if there is one and falls back to the `Lat`
    /// and `Lon` properties.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the geometry nor the properties hold a location.
    pub fn location(&self) -> Result<Point<f64>, SpatialError> {
        if let Some(GeometryObject::Point { coordinates }) = &self.geometry {
            return to_coord(coordinates).map(Point::from);
        }
        match (self.property_f64(LON_KEY)?, self.property_f64(LAT_KEY)?) {
            (Some(lon), Some(lat)) if lon.is_finite() && lat.is_finite() => {
                Ok(Point::new(lon, lat))
            }
            _ => Err(SpatialError::invalid_geometry(
                "feature has neither a point geometry nor Lat/Lon properties",
            )),
        }
    }

    /// Copies every value of `record` into the properties, overwriting existing keys.
    ///
    /// Non-finite values are stored as `null`.
    pub fn insert_record(&mut self, record: &FeatureRecord) {
        let properties = self.properties.get_or_insert_with(Map::new);
        for (key, value) in record.iter() {
            properties.insert(key.to_owned(), Value::from(value));
        }
    }
}

/// Reads a GeoJSON feature collection.
///
/// # Errors
///
/// Returns [`SpatialError::Io`] if the file cannot be opened and
/// [`SpatialError::Parse`] if it is not a feature collection.
pub fn read_feature_collection<P>(path: P) -> Result<FeatureCollection, SpatialError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| SpatialError::Io {
        path: path.to_owned(),
        source,
    })?;
    let collection: FeatureCollection = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| SpatialError::Parse {
            path: path.to_owned(),
            source,
        })?;
    log::debug!(
        "Read {} features from {}",
        collection.features.len(),
        path.display()
    );
    Ok(collection)
}

/// Extracts building footprints and heights.
///
/// A `null`, missing or `-1` height marks a building without height.
///
/// # Errors
///
/// Returns an error if a feature has no valid geometry or a non-numeric height.
///
/// # Examples
///
/// ```
/// use heatisle_spatial::geojson::{FeatureCollection, load_buildings};
///
/// let collection: FeatureCollection = serde_json::from_str(r#"{
///     "type": "FeatureCollection",
///     "features": [
///         {"type": "Feature", "properties": {"height": 12.5},
///          "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
///         {"type": "Feature", "properties": {"height": -1},
///          "geometry": {"type": "Polygon", "coordinates": [[[2, 0], [3, 0], [3, 1], [2, 0]]]}}
///     ]
/// }"#).unwrap();
/// let buildings = load_buildings(&collection).unwrap();
/// assert_eq!(buildings[0].height, Some(12.5));
/// assert_eq!(buildings[1].height, None);
/// ```
pub fn load_buildings(collection: &FeatureCollection) -> Result<Vec<BuildingRecord>, SpatialError> {
    collection
        .features
        .iter()
        .map(|feature| {
            let geometry = feature.to_geometry()?;
            let height = feature
                .property_f64(HEIGHT_PROPERTY)?
                .filter(|h| *h != MISSING_HEIGHT);
            Ok(BuildingRecord { geometry, height })
        })
        .collect()
}

/// Merges every polygon of a boundary collection into one multi-polygon.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidGeometry`] if a feature is not a polygon or
/// multi-polygon, or if the collection holds no polygon at all.
pub fn load_boundary(collection: &FeatureCollection) -> Result<MultiPolygon<f64>, SpatialError> {
    let mut polygons = vec![];
    for feature in &collection.features {
        match feature.to_geometry()? {
            Geometry::Polygon(polygon) => polygons.push(polygon),
            Geometry::MultiPolygon(multi) => polygons.extend(multi),
            other => {
                return Err(SpatialError::invalid_geometry(format!(
                    "boundary must be made of polygons, got {}",
                    geometry_type_name(&other)
                )));
            }
        }
    }
    if polygons.is_empty() {
        return Err(SpatialError::invalid_geometry("boundary has no polygon"));
    }
    Ok(MultiPolygon::new(polygons))
}
