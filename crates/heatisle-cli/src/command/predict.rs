use std::path::PathBuf;

use anyhow::{Context as _, bail};
use chrono::{DateTime, Utc};
use geo::{Intersects as _, Point};
use heatisle_spatial::{aggregate::aggregate_location, feature::FeatureRecord};
use heatisle_training::{load_model, predict, regressor::ModelFamily};
use serde::Serialize;

use crate::{session::SessionArg, util::write_json};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PredictArg {
    #[clap(flatten)]
    session: SessionArg,
    /// Trained model file (.bin)
    #[arg(long)]
    model: PathBuf,
    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
}

impl PredictArg {
    pub(crate) fn location(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

#[derive(Debug, Serialize)]
struct Prediction {
    lon: f64,
    lat: f64,
    temperature: f64,
    family: ModelFamily,
    trained_at: DateTime<Utc>,
    features: FeatureRecord,
}

pub(crate) fn run(arg: &PredictArg) -> anyhow::Result<()> {
    let location = arg.location();
    if !(location.x().is_finite() && location.y().is_finite()) {
        bail!("Location must be finite, got ({}, {})", arg.lon, arg.lat);
    }
    let session = arg.session.resolve()?;
    let (model, scaler) = load_model(&arg.model)
        .with_context(|| format!("Failed to load model file: {}", arg.model.display()))?;

    if let Some(boundary) = session.load_boundary()?
        && !boundary.intersects(&location)
    {
        bail!(
            "Location ({}, {}) is outside the city boundary",
            arg.lon,
            arg.lat
        );
    }

    let buildings = session.load_buildings()?;
    let terrain = session.load_terrain()?;
    let features = aggregate_location(location, session.radius, &buildings, terrain.as_ref())
        .context("Failed to compute location features")?;
    if features.has_no_buildings() {
        bail!(
            "No building with a height within {} m of ({}, {})",
            session.radius,
            arg.lon,
            arg.lat
        );
    }

    let Some(row) = features.record.values_for(&model.feature_names) else {
        bail!(
            "The model expects features that this session does not provide: {}",
            model.feature_names.join(", ")
        );
    };
    if let Some((key, _)) = model
        .feature_names
        .iter()
        .zip(&row)
        .find(|(_, value)| !value.is_finite())
    {
        bail!("Feature {key} is not available at this location");
    }

    let temperature = predict(&model, &scaler, &[row])?
        .first()
        .copied()
        .context("Model returned no prediction")?;
    log::info!("Predicted {temperature:.2} with the {} model", model.family());

    write_json(
        &Prediction {
            lon: arg.lon,
            lat: arg.lat,
            temperature,
            family: model.family(),
            trained_at: model.trained_at,
            features: features.record,
        },
        None,
    )
}
