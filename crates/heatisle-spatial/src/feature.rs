//! Flat feature records
//!
//! A [`FeatureRecord`] maps statistic names to values and keeps the order in
//! which they were inserted, so that a record can be written out or turned
//! into a model input row without reordering surprises.

use serde::{Serialize, Serializer, ser::SerializeMap as _};

/// Key of the latitude feature.
pub const LAT_KEY: &str = "Lat";
/// Key of the longitude feature.
pub const LON_KEY: &str = "Lon";

/// Named statistics computed for one area of interest.
///
/// Missing statistics are stored as `NaN` and serialized as `null`.
///
/// # Examples
///
/// ```
/// use heatisle_spatial::feature::FeatureRecord;
///
/// let mut record = FeatureRecord::new();
/// record.insert("Lat", 47.6);
/// record.insert("Lon", -122.3);
/// record.insert("Lat", 47.7);
///
/// assert_eq!(record.len(), 2);
/// assert_eq!(record.get("Lat"), Some(47.7));
/// assert_eq!(record.values_for(&["Lon", "Lat"]), Some(vec![-122.3, 47.7]));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRecord {
    entries: Vec<(String, f64)>,
}

impl FeatureRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record with every key set to `NaN`.
    pub fn nan<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        keys.into_iter().map(|key| (key.into(), f64::NAN)).collect()
    }

    /// Sets `key` to `value`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(*v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Returns `true` if the record holds no finite value.
    #[must_use]
    pub fn is_all_nan(&self) -> bool {
        self.entries.iter().all(|(_, v)| v.is_nan())
    }

    /// Looks up `keys` in order.
    ///
    /// Returns `None` if any key is absent.
    #[must_use]
    pub fn values_for<S>(&self, keys: &[S]) -> Option<Vec<f64>>
    where
        S: AsRef<str>,
    {
        keys.iter().map(|key| self.get(key.as_ref())).collect()
    }
}

impl<K> FromIterator<(K, f64)> for FeatureRecord
where
    K: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        let mut record = Self::new();
        record.extend(iter);
        record
    }
}

impl<K> Extend<(K, f64)> for FeatureRecord
where
    K: Into<String>,
{
    fn extend<T: IntoIterator<Item = (K, f64)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for FeatureRecord {
    type Item = (String, f64);
    type IntoIter = std::vec::IntoIter<(String, f64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for FeatureRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            let value = value.is_finite().then_some(*value);
            map.serialize_entry(key, &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_kept() {
        let record = [("b", 2.0), ("a", 1.0), ("c", 3.0)]
            .into_iter()
            .collect::<FeatureRecord>();
        assert_eq!(record.keys().collect::<Vec<_>>(), ["b", "a", "c"]);
    }

    #[test]
    fn test_missing_key() {
        let record = FeatureRecord::nan(["x"]);
        assert!(record.get("x").unwrap().is_nan());
        assert_eq!(record.get("y"), None);
        assert_eq!(record.values_for(&["x", "y"]), None);
        assert!(record.is_all_nan());
    }

    #[test]
    fn test_non_finite_values_serialize_as_null() {
        let record = [("a", 1.5), ("b", f64::NAN), ("c", f64::INFINITY)]
            .into_iter()
            .collect::<FeatureRecord>();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"a":1.5,"b":null,"c":null}"#);
    }
}
