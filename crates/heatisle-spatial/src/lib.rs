//! Spatial feature extraction for heat island modeling
//!
//! This crate turns raw geospatial inputs into flat feature records:
//!
//! - [`hexagon`]: hexagonal areas of interest around a location
//! - [`building`]: area-weighted building height statistics
//! - [`terrain`]: elevation statistics over a terrain grid
//! - [`aggregate`]: per-location records combining both, computed in parallel
//! - [`geojson`]: reading stations, footprints and boundaries, writing hexagons
//!
//! # Example
//!
//! ```
//! use geo::{Point, polygon};
//! use heatisle_spatial::{
//!     aggregate::aggregate_location,
//!     building::{BuildingRecord, get_centroid},
//!     hexagon::DEFAULT_RADIUS_METERS,
//! };
//!
//! let footprint = polygon![
//!     (x: 0.0, y: 0.0), (x: 1e-5, y: 0.0), (x: 1e-5, y: 1e-5), (x: 0.0, y: 1e-5),
//! ];
//! let buildings = get_centroid(vec![BuildingRecord::new(footprint, Some(30.0))]).unwrap();
//!
//! let features =
//!     aggregate_location(Point::new(0.0, 0.0), DEFAULT_RADIUS_METERS, &buildings, None).unwrap();
//! assert_eq!(features.record.get("centroid_stat_50%"), Some(30.0));
//! assert_eq!(features.record.get("Lon"), Some(0.0));
//! ```

pub use self::error::SpatialError;

pub mod aggregate;
pub mod building;
mod error;
pub mod feature;
pub mod geojson;
pub mod hexagon;
pub mod terrain;
