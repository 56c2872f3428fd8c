use std::path::PathBuf;

use anyhow::{Context as _, bail};
use geo::{Intersects as _, MultiPolygon, Point};
use heatisle_dataset::{
    DEFAULT_TARGET,
    stations::{DEFAULT_ID_KEY, prepare_stations},
};
use heatisle_spatial::{
    aggregate::aggregate_locations,
    geojson::{Feature, FeatureCollection, GeometryObject},
};

use crate::{session::SessionArg, util::write_json};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AggregateArg {
    #[clap(flatten)]
    session: SessionArg,
    /// Observed temperature property of the weather stations
    #[arg(long, default_value = DEFAULT_TARGET)]
    target: String,
    /// Station identifier property used to drop duplicated stations
    #[arg(long, default_value = DEFAULT_ID_KEY)]
    id_key: String,
    /// Output GeoJSON file; must not exist yet (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &AggregateArg) -> anyhow::Result<()> {
    let session = arg.session.resolve()?;

    if let Some(path) = &arg.output
        && path.exists()
    {
        bail!("Output file already exists: {}", path.display());
    }

    let stations = prepare_stations(session.load_weather()?, &arg.target, &arg.id_key)
        .context("Failed to prepare weather stations")?;
    let located = stations
        .features
        .into_iter()
        .map(|feature| {
            let location = feature
                .location()
                .context("Weather station without a location")?;
            Ok((feature, location))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let located = match session.load_boundary()? {
        Some(boundary) => within_boundary(located, &boundary),
        None => located,
    };

    let buildings = session.load_buildings()?;
    let terrain = session.load_terrain()?;
    let centers = located.iter().map(|(_, point)| *point).collect::<Vec<_>>();
    eprintln!(
        "Aggregating {} stations with a {} m hexagon radius...",
        centers.len(),
        session.radius
    );
    let aggregated = aggregate_locations(&centers, session.radius, &buildings, terrain.as_ref())
        .context("Failed to aggregate hexagon features")?;

    let mut without_buildings = 0;
    let features = located
        .into_iter()
        .zip(aggregated)
        .map(|((station, _), location)| {
            if location.has_no_buildings() {
                without_buildings += 1;
            }
            let properties = station.properties.unwrap_or_default();
            let mut hexagon = Feature::new(
                Some(GeometryObject::from(location.hexagon.polygon())),
                properties,
            );
            hexagon.id = station.id;
            hexagon.insert_record(&location.record);
            hexagon
        })
        .collect::<Vec<_>>();
    if without_buildings > 0 {
        log::warn!("{without_buildings} hexagons contain no building with a height");
    }

    let count = features.len();
    write_json(&FeatureCollection::new(features), arg.output.as_deref())?;
    match &arg.output {
        Some(path) => eprintln!("Wrote {count} hexagons to {}", path.display()),
        None => eprintln!("Wrote {count} hexagons"),
    }
    Ok(())
}

/// Keeps the stations located inside or on the boundary.
fn within_boundary<T>(
    located: Vec<(T, Point<f64>)>,
    boundary: &MultiPolygon<f64>,
) -> Vec<(T, Point<f64>)> {
    let total = located.len();
    let inside = located
        .into_iter()
        .filter(|(_, point)| boundary.intersects(point))
        .collect::<Vec<_>>();
    if inside.len() < total {
        log::warn!(
            "Dropped {} stations outside the boundary",
            total - inside.len()
        );
    }
    inside
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    #[test]
    fn test_within_boundary_keeps_edge_points() {
        let boundary = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0),
        ]]);
        let located = vec![
            ("inside", Point::new(1.0, 1.0)),
            ("edge", Point::new(2.0, 1.0)),
            ("outside", Point::new(3.0, 1.0)),
        ];
        let kept = within_boundary(located, &boundary)
            .into_iter()
            .map(|(name, _)| name)
            .collect::<Vec<_>>();
        assert_eq!(kept, ["inside", "edge"]);
    }
}
