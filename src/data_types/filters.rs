
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// All the sample-level filters the germline classifier can apply
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd,
    Deserialize, Serialize,
    strum_macros::AsRefStr, strum_macros::Display, strum_macros::EnumIter, strum_macros::EnumString
)]
pub enum GermlineFilter {
    /// Genotype quality (or empirical variant score) is below the minimum
    #[strum(serialize = "LowGQX")]
    #[serde(rename = "LowGQX")]
    LowGqx,
    /// Total locus depth across all samples is above the maximum
    #[strum(serialize = "HighDepth")]
    #[serde(rename = "HighDepth")]
    HighDepth,
    /// Fraction of filtered basecalls is above the maximum
    #[strum(serialize = "HighBaseFilt")]
    #[serde(rename = "HighBaseFilt")]
    HighBaseFilt,
    /// SNV strand bias is above the maximum; reserved, never set right now
    #[strum(serialize = "HighSNVSB")]
    #[serde(rename = "HighSNVSB")]
    HighSnvStrandBias,
    /// SNV is inside a homopolymer longer than the maximum
    #[strum(serialize = "HighSNVHPOL")]
    #[serde(rename = "HighSNVHPOL")]
    HighSnvHpol,
    /// Indel is inside a short tandem repeat with too many reference copies
    #[strum(serialize = "HighRefRep")]
    #[serde(rename = "HighRefRep")]
    HighRefRep
}

/// An ordered set of filters; an empty set means the record passes.
/// Filters only ever get added to a set, never removed.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct FilterSet {
    filters: BTreeSet<GermlineFilter>
}

impl FilterSet {
    /// Creates a set from any collection of filters
    pub fn from_filters(filters: impl IntoIterator<Item = GermlineFilter>) -> Self {
        Self {
            filters: filters.into_iter().collect()
        }
    }

    /// Adds a filter to the set, this is a no-op if it is already present
    pub fn set(&mut self, filter: GermlineFilter) {
        self.filters.insert(filter);
    }

    pub fn contains(&self, filter: GermlineFilter) -> bool {
        self.filters.contains(&filter)
    }

    /// Returns true if no filters are set
    pub fn is_pass(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GermlineFilter> {
        self.filters.iter()
    }
}

impl std::fmt::Display for FilterSet {
    /// Renders like a VCF FILTER column: "PASS" or a ';'-delimited list
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_pass() {
            write!(f, "PASS")
        } else {
            write!(f, "{}", self.filters.iter().join(";"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_filter_labels() {
        assert_eq!(GermlineFilter::LowGqx.as_ref(), "LowGQX");
        assert_eq!(GermlineFilter::HighSnvHpol.to_string(), "HighSNVHPOL");
        for filter in GermlineFilter::iter() {
            assert_eq!(GermlineFilter::from_str(filter.as_ref()).unwrap(), filter);
        }
    }

    #[test]
    fn test_filter_set() {
        let mut filters = FilterSet::default();
        assert!(filters.is_pass());
        assert_eq!(filters.to_string(), "PASS");

        filters.set(GermlineFilter::HighDepth);
        filters.set(GermlineFilter::LowGqx);
        filters.set(GermlineFilter::LowGqx);
        assert_eq!(filters.len(), 2);
        assert!(filters.contains(GermlineFilter::LowGqx));
        assert!(!filters.contains(GermlineFilter::HighRefRep));
        assert_eq!(filters.to_string(), "LowGQX;HighDepth");

        // order of insertion does not matter for equality
        let other = FilterSet::from_filters([GermlineFilter::LowGqx, GermlineFilter::HighDepth]);
        assert_eq!(filters, other);
    }

    #[test]
    fn test_filter_set_serde() {
        let filters = FilterSet::from_filters([GermlineFilter::HighRefRep, GermlineFilter::LowGqx]);
        let json = serde_json::to_string(&filters).unwrap();
        assert_eq!(json, "[\"LowGQX\",\"HighRefRep\"]");
        let parsed: FilterSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, filters);
    }
}
