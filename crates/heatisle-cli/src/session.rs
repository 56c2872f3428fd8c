//! Per-city input configuration
//!
//! A [`Session`] names the input files of one city. Paths can be given
//! explicitly or derived from the city name and a data directory:
//!
//! ```text
//! <data_dir>/<city>_weather.geojson
//! <data_dir>/<city>_boundary.geojson
//! <data_dir>/<city>_building.geojson
//! <data_dir>/<city>_terrain.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use geo::MultiPolygon;
use heatisle_spatial::{
    building::{CentroidBuilding, get_centroid},
    geojson::{FeatureCollection, load_boundary, load_buildings, read_feature_collection},
    hexagon::DEFAULT_RADIUS_METERS,
    terrain::{TerrainGrid, read_terrain_grid},
};
use serde::{Deserialize, Serialize};

use crate::util::read_json_file;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Session {
    pub city: Option<String>,
    pub data_dir: PathBuf,
    pub boundary_path: Option<PathBuf>,
    pub weather_path: Option<PathBuf>,
    pub building_path: Option<PathBuf>,
    pub terrain_path: Option<PathBuf>,
    /// Hexagon radius in meters
    pub radius: f64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            city: None,
            data_dir: PathBuf::from("."),
            boundary_path: None,
            weather_path: None,
            building_path: None,
            terrain_path: None,
            radius: DEFAULT_RADIUS_METERS,
        }
    }
}

impl Session {
    fn derived_path(&self, suffix: &str) -> Option<PathBuf> {
        let city = self.city.as_deref()?;
        Some(self.data_dir.join(format!("{city}_{suffix}")))
    }

    /// Path of a mandatory input: the explicit path, else the derived one.
    fn required_path(
        &self,
        explicit: Option<&Path>,
        suffix: &str,
        kind: &str,
    ) -> anyhow::Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_owned());
        }
        match self.derived_path(suffix) {
            Some(path) => Ok(path),
            None => bail!("No {kind} file given; set --city or the {kind} path"),
        }
    }

    /// Path of an optional input: the explicit path, else the derived one if
    /// that file exists.
    fn optional_path(&self, explicit: Option<&Path>, suffix: &str) -> Option<PathBuf> {
        explicit
            .map(Path::to_owned)
            .or_else(|| self.derived_path(suffix).filter(|path| path.is_file()))
    }

    pub fn weather_path(&self) -> anyhow::Result<PathBuf> {
        self.required_path(self.weather_path.as_deref(), "weather.geojson", "weather")
    }

    pub fn building_path(&self) -> anyhow::Result<PathBuf> {
        self.required_path(self.building_path.as_deref(), "building.geojson", "building")
    }

    pub fn boundary_path(&self) -> Option<PathBuf> {
        self.optional_path(self.boundary_path.as_deref(), "boundary.geojson")
    }

    pub fn terrain_path(&self) -> Option<PathBuf> {
        self.optional_path(self.terrain_path.as_deref(), "terrain.json")
    }

    pub fn load_weather(&self) -> anyhow::Result<FeatureCollection> {
        let path = self.weather_path()?;
        read_feature_collection(&path)
            .with_context(|| format!("Failed to read weather file: {}", path.display()))
    }

    pub fn load_buildings(&self) -> anyhow::Result<Vec<CentroidBuilding>> {
        let path = self.building_path()?;
        let collection = read_feature_collection(&path)
            .with_context(|| format!("Failed to read building file: {}", path.display()))?;
        let records = load_buildings(&collection)
            .with_context(|| format!("Invalid building in {}", path.display()))?;
        let buildings = get_centroid(records)
            .with_context(|| format!("Invalid building footprint in {}", path.display()))?;
        log::info!("Loaded {} buildings from {}", buildings.len(), path.display());
        Ok(buildings)
    }

    pub fn load_boundary(&self) -> anyhow::Result<Option<MultiPolygon<f64>>> {
        let Some(path) = self.boundary_path() else {
            return Ok(None);
        };
        let collection = read_feature_collection(&path)
            .with_context(|| format!("Failed to read boundary file: {}", path.display()))?;
        let boundary = load_boundary(&collection)
            .with_context(|| format!("Invalid boundary in {}", path.display()))?;
        Ok(Some(boundary))
    }

    pub fn load_terrain(&self) -> anyhow::Result<Option<TerrainGrid>> {
        let Some(path) = self.terrain_path() else {
            return Ok(None);
        };
        let grid = read_terrain_grid(&path)
            .with_context(|| format!("Failed to read terrain file: {}", path.display()))?;
        log::info!(
            "Loaded {}x{} terrain grid from {}",
            grid.rows(),
            grid.cols(),
            path.display()
        );
        Ok(Some(grid))
    }
}

/// Session options shared by the subcommands that read city inputs.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct SessionArg {
    /// Session file (JSON); the options below override its values
    #[arg(long)]
    session: Option<PathBuf>,
    /// City name used to derive input file names
    #[arg(long)]
    city: Option<String>,
    /// Directory holding the derived input files
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Weather station GeoJSON file
    #[arg(long)]
    weather: Option<PathBuf>,
    /// Building footprint GeoJSON file
    #[arg(long)]
    buildings: Option<PathBuf>,
    /// City boundary GeoJSON file
    #[arg(long)]
    boundary: Option<PathBuf>,
    /// Terrain grid JSON file
    #[arg(long)]
    terrain: Option<PathBuf>,
    /// Hexagon radius in meters
    #[arg(long)]
    radius: Option<f64>,
}

impl SessionArg {
    pub(crate) fn resolve(&self) -> anyhow::Result<Session> {
        let mut session = match &self.session {
            Some(path) => read_json_file("session", path)?,
            None => Session::default(),
        };
        if let Some(city) = &self.city {
            session.city = Some(city.clone());
        }
        if let Some(data_dir) = &self.data_dir {
            session.data_dir.clone_from(data_dir);
        }
        let overrides = [
            (&mut session.weather_path, &self.weather),
            (&mut session.building_path, &self.buildings),
            (&mut session.boundary_path, &self.boundary),
            (&mut session.terrain_path, &self.terrain),
        ];
        for (field, value) in overrides {
            if value.is_some() {
                field.clone_from(value);
            }
        }
        if let Some(radius) = self.radius {
            session.radius = radius;
        }
        if !(session.radius.is_finite() && session.radius > 0.0) {
            bail!(
                "Hexagon radius must be a positive number, got {}",
                session.radius
            );
        }
        Ok(session)
    }
}
