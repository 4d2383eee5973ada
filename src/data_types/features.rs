
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named numeric attributes of a locus/sample, in the order they were computed
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: IndexMap<String, f64>
}

impl FeatureVector {
    /// Sets a feature value, replacing any previous value with the same name
    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureVector {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect()
        }
    }
}

/// Features attached to a locus for empirical variant scoring.
/// `core` is the model input, `development` holds extra values that are only reported.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct EvsFeatures {
    pub core: FeatureVector,
    #[serde(default, skip_serializing_if = "FeatureVector::is_empty")]
    pub development: FeatureVector
}
