//! Feature key contract
//!
//! The order of the keys is the column order of the model input. Scaler
//! parameters and model weights are stored in this order, so it must never
//! change for an existing model.

use heatisle_spatial::{
    building::centroid_stat_keys,
    feature::{LAT_KEY, LON_KEY},
    terrain::terrain_stat_keys,
};

/// Which statistics make up the model input.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum FeatureSet {
    /// Building statistics and location
    #[default]
    Default,
    /// [`FeatureSet::Default`] followed by the terrain statistics
    WithTerrain,
}

impl FeatureSet {
    #[must_use]
    pub fn keys(self) -> Vec<String> {
        let mut keys = get_keys();
        if self == Self::WithTerrain {
            keys.extend(terrain_stat_keys());
        }
        keys
    }
}

/// Returns the default feature keys in model input order.
///
/// # Examples
///
/// ```
/// let keys = heatisle_dataset::get_keys();
/// assert_eq!(keys.len(), 11);
/// assert_eq!(keys[0], "centroid_stat_total_height_area");
/// assert_eq!(keys[10], "Lon");
/// ```
#[must_use]
pub fn get_keys() -> Vec<String> {
    centroid_stat_keys()
        .chain([LAT_KEY.to_owned(), LON_KEY.to_owned()])
        .collect()
}
