//! Regional and country risk context.
//!
//! The datasets this tool reads are global. Regional views are risk
//! translations: the global rate scaled by a consensus amplification
//! multiplier, together with the exposure and adaptive capacity used by the
//! composite score. They are not local temperature forecasts.

use crate::assessment::RiskLevel;
use crate::parameters::{RegionOverride, RegionalRiskParameters};
use cri_core::errors::{CRIError, CRIResult};
use cri_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Amplification and vulnerability of one region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionProfile {
    pub name: String,
    /// Alternative names accepted by [`RegionCatalog::get`]
    pub aliases: Vec<String>,
    /// Regional warming rate relative to the global rate
    pub multiplier: FloatValue,
    pub key_risk: String,
    pub description: String,
    /// Share of people and assets exposed to warming impacts, in `[0, 1]`
    pub exposure: FloatValue,
    /// Ability to absorb impacts, in `[0, 1]`
    pub adaptive_capacity: FloatValue,
}

impl RegionProfile {
    fn new(
        name: &str,
        aliases: &[&str],
        multiplier: FloatValue,
        key_risk: &str,
        description: &str,
        exposure: FloatValue,
        adaptive_capacity: FloatValue,
    ) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            multiplier,
            key_risk: key_risk.to_string(),
            description: description.to_string(),
            exposure,
            adaptive_capacity,
        }
    }

    fn matches(&self, query: &str) -> bool {
        self.name.eq_ignore_ascii_case(query)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(query))
    }

    fn apply(&mut self, patch: &RegionOverride) -> CRIResult<()> {
        if let Some(multiplier) = patch.multiplier {
            if !(multiplier.is_finite() && multiplier >= 0.0) {
                return Err(CRIError::InvalidParameter(format!(
                    "Multiplier for {} must be a non-negative number, got {}",
                    self.name, multiplier
                )));
            }
            self.multiplier = multiplier;
        }
        for (name, value, target) in [
            ("exposure", patch.exposure, &mut self.exposure),
            (
                "adaptive_capacity",
                patch.adaptive_capacity,
                &mut self.adaptive_capacity,
            ),
        ] {
            if let Some(value) = value {
                if !(0.0..=1.0).contains(&value) {
                    return Err(CRIError::InvalidParameter(format!(
                        "{} for {} must lie in [0, 1], got {}",
                        name, self.name, value
                    )));
                }
                *target = value;
            }
        }
        if let Some(key_risk) = &patch.key_risk {
            self.key_risk = key_risk.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        Ok(())
    }
}

/// The regions offered for selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionCatalog {
    profiles: Vec<RegionProfile>,
    high_threshold: FloatValue,
    critical_threshold: FloatValue,
}

impl Default for RegionCatalog {
    fn default() -> Self {
        let defaults = RegionalRiskParameters::default();
        Self {
            profiles: builtin_profiles(),
            high_threshold: defaults.high_threshold,
            critical_threshold: defaults.critical_threshold,
        }
    }
}

fn builtin_profiles() -> Vec<RegionProfile> {
    vec![
        RegionProfile::new(
            "Global Average",
            &["Global", "Global Avg"],
            1.0,
            "General Warming",
            "Follows global trend.",
            0.5,
            0.5,
        ),
        RegionProfile::new(
            "Arctic / Polar",
            &["Arctic", "Polar"],
            2.5,
            "Ice Sheet Collapse",
            "Warming at 2-3x the global average.",
            0.9,
            0.4,
        ),
        RegionProfile::new(
            "South Asia",
            &["South Asia (India/Pakistan)"],
            1.1,
            "Wet Bulb Heatwaves",
            "High humidity amplifies heat stress risk.",
            0.85,
            0.35,
        ),
        RegionProfile::new(
            "Europe",
            &[],
            1.4,
            "Summer Droughts",
            "Increasing frequency of heat domes.",
            0.55,
            0.8,
        ),
        RegionProfile::new(
            "Sub-Saharan Africa",
            &["Africa"],
            1.2,
            "Desertification",
            "Expansion of arid zones affecting agriculture.",
            0.8,
            0.25,
        ),
        RegionProfile::new(
            "Small Island States",
            &["SIDS"],
            1.0,
            "Existential Sea Level Rise",
            "Direct threat from thermal expansion.",
            0.95,
            0.3,
        ),
    ]
}

impl RegionCatalog {
    /// Built-in profiles with `parameters` applied.
    ///
    /// Overrides naming an unknown region are rejected so that typos in a
    /// configuration file do not pass silently.
    pub fn from_parameters(parameters: &RegionalRiskParameters) -> CRIResult<Self> {
        if !(parameters.high_threshold < parameters.critical_threshold) {
            return Err(CRIError::InvalidParameter(format!(
                "Regional high threshold {} must be below the critical threshold {}",
                parameters.high_threshold, parameters.critical_threshold
            )));
        }
        let mut profiles = builtin_profiles();
        for (name, patch) in &parameters.overrides {
            let profile = profiles
                .iter_mut()
                .find(|p| p.matches(name))
                .ok_or_else(|| CRIError::UnknownRegion(name.clone()))?;
            profile.apply(patch)?;
            log::debug!("Applied override to region {}", profile.name);
        }
        Ok(Self {
            profiles,
            high_threshold: parameters.high_threshold,
            critical_threshold: parameters.critical_threshold,
        })
    }

    pub fn profiles(&self) -> &[RegionProfile] {
        &self.profiles
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name.as_str())
    }

    /// Look up a region by name or alias, ignoring case.
    pub fn get(&self, name: &str) -> CRIResult<&RegionProfile> {
        self.profiles
            .iter()
            .find(|p| p.matches(name.trim()))
            .ok_or_else(|| CRIError::UnknownRegion(name.to_string()))
    }

    /// Risk level for a region-adjusted rate (°C/decade).
    pub fn classify(&self, rate_per_decade: FloatValue) -> RiskLevel {
        if rate_per_decade < self.high_threshold {
            RiskLevel::Low
        } else if rate_per_decade < self.critical_threshold {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    /// Translate the global rate into a [`RegionalRate`] for `region`.
    pub fn regional_rate(
        &self,
        global_rate_per_decade: FloatValue,
        region: &str,
    ) -> CRIResult<RegionalRate> {
        let profile = self.get(region)?;
        let rate = regional_rate(global_rate_per_decade, profile);
        Ok(RegionalRate {
            region: profile.name.clone(),
            global_rate_per_decade,
            multiplier: profile.multiplier,
            rate_per_decade: rate,
            level: self.classify(rate),
        })
    }
}

/// Region-adjusted warming rate.
pub fn regional_rate(global_rate_per_decade: FloatValue, profile: &RegionProfile) -> FloatValue {
    global_rate_per_decade * profile.multiplier
}

/// Outcome of [`RegionCatalog::regional_rate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionalRate {
    pub region: String,
    pub global_rate_per_decade: FloatValue,
    pub multiplier: FloatValue,
    pub rate_per_decade: FloatValue,
    pub level: RiskLevel,
}

impl RegionalRate {
    pub fn guidance(&self) -> &'static str {
        match self.level {
            RiskLevel::Critical => "Rapid warming likely to overwhelm adaptation capacity.",
            RiskLevel::High | RiskLevel::Medium => {
                "Significant adaptation required to reduce impacts."
            }
            RiskLevel::Low => "Lower risk, but monitoring remains essential.",
        }
    }
}

/// Groups most affected by regional warming.
pub const MOST_AFFECTED: [&str; 4] = [
    "Outdoor workers",
    "Elderly populations",
    "Small-scale farmers",
    "Coastal communities",
];

/// Caveats shown with every regional translation.
pub const LIMITATIONS: [&str; 3] = [
    "Regional values are risk translations, not local temperature forecasts",
    "Country impacts reflect exposure and vulnerability, not exact outcomes",
    "Results indicate direction and relative magnitude, not certainty",
];

/// Qualitative country context within a region.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountryProfile {
    pub name: &'static str,
    pub region: &'static str,
    pub note: &'static str,
    pub heat: RiskLevel,
    pub food: RiskLevel,
    pub coastal: RiskLevel,
}

static COUNTRIES: [CountryProfile; 4] = [
    CountryProfile {
        name: "India",
        region: "South Asia",
        note: "High population exposure and humid heat stress.",
        heat: RiskLevel::High,
        food: RiskLevel::High,
        coastal: RiskLevel::Medium,
    },
    CountryProfile {
        name: "Pakistan",
        region: "South Asia",
        note: "Water stress amplifies heat impacts.",
        heat: RiskLevel::High,
        food: RiskLevel::Medium,
        coastal: RiskLevel::Low,
    },
    CountryProfile {
        name: "Bangladesh",
        region: "South Asia",
        note: "Low elevation increases flood vulnerability.",
        heat: RiskLevel::Medium,
        food: RiskLevel::High,
        coastal: RiskLevel::High,
    },
    CountryProfile {
        name: "Sri Lanka",
        region: "South Asia",
        note: "Moderate warming but high agricultural sensitivity.",
        heat: RiskLevel::Medium,
        food: RiskLevel::Medium,
        coastal: RiskLevel::Medium,
    },
];

/// Countries with a context profile inside `region` (canonical name).
pub fn countries_in(region: &str) -> Vec<&'static CountryProfile> {
    COUNTRIES.iter().filter(|c| c.region == region).collect()
}

pub fn country(name: &str) -> CRIResult<&'static CountryProfile> {
    COUNTRIES
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| CRIError::UnknownRegion(name.to_string()))
}

/// Perspective used to read regional risk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLens {
    HumanHealth,
    FoodSystems,
    Infrastructure,
}

impl RiskLens {
    pub const ALL: [RiskLens; 3] = [
        RiskLens::HumanHealth,
        RiskLens::FoodSystems,
        RiskLens::Infrastructure,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RiskLens::HumanHealth => "Human health",
            RiskLens::FoodSystems => "Food systems",
            RiskLens::Infrastructure => "Infrastructure",
        }
    }

    pub fn focus(&self) -> &'static str {
        match self {
            RiskLens::HumanHealth => {
                "Focus on heat stress, mortality risk, and vulnerable populations."
            }
            RiskLens::FoodSystems => "Focus on crop yield stability and seasonal disruption.",
            RiskLens::Infrastructure => {
                "Focus on urban systems, energy demand, and infrastructure stress."
            }
        }
    }
}

impl fmt::Display for RiskLens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RiskLens {
    type Err = CRIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match key.as_str() {
            "human health" | "health" => Ok(RiskLens::HumanHealth),
            "food systems" | "food" => Ok(RiskLens::FoodSystems),
            "infrastructure" => Ok(RiskLens::Infrastructure),
            _ => Err(CRIError::InvalidParameter(format!("Unknown risk lens '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use is_close::is_close;

    #[test]
    fn test_lookup_by_alias() {
        let catalog = RegionCatalog::default();
        assert_eq!(catalog.get("arctic").unwrap().name, "Arctic / Polar");
        assert_eq!(catalog.get("Global").unwrap().name, "Global Average");
        assert!(matches!(
            catalog.get("Atlantis"),
            Err(CRIError::UnknownRegion(_))
        ));
        assert_eq!(catalog.names().count(), 6);
    }

    #[test]
    fn test_regional_classification() {
        let catalog = RegionCatalog::default();
        let arctic = catalog.regional_rate(0.2, "Arctic").unwrap();
        assert!(is_close!(arctic.rate_per_decade, 0.5));
        assert_eq!(arctic.level, RiskLevel::Critical);

        let europe = catalog.regional_rate(0.2, "Europe").unwrap();
        assert!(is_close!(europe.rate_per_decade, 0.28));
        assert_eq!(europe.level, RiskLevel::High);

        let global = catalog.regional_rate(0.15, "Global Average").unwrap();
        assert_eq!(global.level, RiskLevel::Low);
        assert_eq!(global.guidance(), "Lower risk, but monitoring remains essential.");
    }

    #[test]
    fn test_overrides() {
        let mut overrides = IndexMap::new();
        overrides.insert(
            "europe".to_string(),
            RegionOverride {
                multiplier: Some(1.5),
                ..RegionOverride::default()
            },
        );
        let params = RegionalRiskParameters {
            overrides,
            ..RegionalRiskParameters::default()
        };
        let catalog = RegionCatalog::from_parameters(&params).unwrap();
        assert_eq!(catalog.get("Europe").unwrap().multiplier, 1.5);
        assert_eq!(catalog.get("Europe").unwrap().adaptive_capacity, 0.8);
    }

    #[test]
    fn test_invalid_overrides() {
        let mut params = RegionalRiskParameters::default();
        params
            .overrides
            .insert("Atlantis".to_string(), RegionOverride::default());
        assert!(RegionCatalog::from_parameters(&params).is_err());

        let mut params = RegionalRiskParameters::default();
        params.overrides.insert(
            "Europe".to_string(),
            RegionOverride {
                exposure: Some(1.5),
                ..RegionOverride::default()
            },
        );
        assert!(RegionCatalog::from_parameters(&params).is_err());
    }

    #[test]
    fn test_countries() {
        assert_eq!(countries_in("South Asia").len(), 4);
        assert!(countries_in("Europe").is_empty());
        let bangladesh = country("bangladesh").unwrap();
        assert_eq!(bangladesh.coastal, RiskLevel::High);
        assert!(country("Nepal").is_err());
    }

    #[test]
    fn test_lenses() {
        assert_eq!("food".parse::<RiskLens>().unwrap(), RiskLens::FoodSystems);
        assert_eq!(
            "human-health".parse::<RiskLens>().unwrap(),
            RiskLens::HumanHealth
        );
        assert!(RiskLens::Infrastructure.focus().contains("energy demand"));
    }
}
