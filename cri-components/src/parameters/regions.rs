//! Regional risk parameters

use cri_core::timeseries::FloatValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Replacement values for one built-in region profile.
///
/// Unset fields keep the built-in value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionOverride {
    pub multiplier: Option<FloatValue>,
    pub exposure: Option<FloatValue>,
    pub adaptive_capacity: Option<FloatValue>,
    pub key_risk: Option<String>,
    pub description: Option<String>,
}

/// Parameters for translating the global rate into regional risk levels
///
/// A region-adjusted rate (°C/decade) below `high_threshold` is Low, below
/// `critical_threshold` High, otherwise Critical.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionalRiskParameters {
    /// Default: 0.2 °C/decade
    pub high_threshold: FloatValue,

    /// Default: 0.4 °C/decade
    pub critical_threshold: FloatValue,

    /// Overrides keyed by region name or alias.
    ///
    /// Default: empty
    pub overrides: IndexMap<String, RegionOverride>,
}

impl Default for RegionalRiskParameters {
    fn default() -> Self {
        Self {
            high_threshold: 0.2,
            critical_threshold: 0.4,
            overrides: IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_from_toml() {
        let params: RegionalRiskParameters = toml::from_str(
            r#"
            [overrides.Europe]
            multiplier = 1.5
            "#,
        )
        .unwrap();
        assert_eq!(params.high_threshold, 0.2);
        assert_eq!(params.overrides["Europe"].multiplier, Some(1.5));
        assert_eq!(params.overrides["Europe"].exposure, None);
    }
}
