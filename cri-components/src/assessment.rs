//! Rule-based impact assessment.
//!
//! Translates a warming rate and the current anomaly into three impact
//! cards: extreme heat, coastal inundation and food security.

use cri_core::errors::CRIError;
use cri_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered qualitative risk level.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = CRIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err(CRIError::InvalidParameter(format!("Unknown risk level '{}'", s))),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactKind {
    ExtremeHeat,
    CoastalInundation,
    FoodSecurity,
}

/// One assessed impact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskCard {
    pub kind: ImpactKind,
    pub title: String,
    pub level: RiskLevel,
    pub description: String,
}

/// Heat stress follows the anomaly directly.
fn heat_level(anomaly: FloatValue) -> RiskLevel {
    if anomaly > 1.5 {
        RiskLevel::Critical
    } else if anomaly > 1.0 {
        RiskLevel::High
    } else if anomaly > 0.5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Coastal risk follows the rate of warming (°C per year). The cut-offs are
/// 0.25, 0.15 and 0.1 °C per decade expressed per year.
fn coastal_level(rate_per_year: FloatValue) -> RiskLevel {
    if rate_per_year > 0.025 {
        RiskLevel::Critical
    } else if rate_per_year > 0.015 {
        RiskLevel::High
    } else if rate_per_year > 0.01 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Crop thresholds: yield shifts above 1 °C, failures above 2 °C.
fn food_level(anomaly: FloatValue) -> RiskLevel {
    if anomaly > 2.0 {
        RiskLevel::Critical
    } else if anomaly > 1.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Assess the three impact cards.
///
/// # Arguments
///
/// * `warming_rate_per_year` - Warming rate in °C per year
/// * `anomaly` - Current anomaly against the baseline in °C
///
/// # Returns
///
/// Cards in the order extreme heat, coastal inundation, food security.
pub fn assess_risks(warming_rate_per_year: FloatValue, anomaly: FloatValue) -> Vec<RiskCard> {
    vec![
        RiskCard {
            kind: ImpactKind::ExtremeHeat,
            title: "Extreme Heat & Human Health".to_string(),
            level: heat_level(anomaly),
            description: "Frequency of deadly heatwaves affecting urban areas.".to_string(),
        },
        RiskCard {
            kind: ImpactKind::CoastalInundation,
            title: "Coastal Inundation".to_string(),
            level: coastal_level(warming_rate_per_year),
            description: format!(
                "Glacial melt acceleration driven by {:.2}°C/decade warming.",
                warming_rate_per_year * 10.0
            ),
        },
        RiskCard {
            kind: ImpactKind::FoodSecurity,
            title: "Food Security".to_string(),
            level: food_level(anomaly),
            description: "Risk of crop yield reduction due to temperature thresholds."
                .to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(rate: FloatValue, anomaly: FloatValue) -> Vec<RiskLevel> {
        assess_risks(rate, anomaly).iter().map(|c| c.level).collect()
    }

    #[test]
    fn test_calm_climate_is_low() {
        assert_eq!(levels(0.0, 0.0), vec![RiskLevel::Low; 3]);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        assert_eq!(
            levels(0.01, 1.0),
            vec![RiskLevel::Medium, RiskLevel::Low, RiskLevel::Low]
        );
        assert_eq!(
            levels(0.02, 1.2),
            vec![RiskLevel::High, RiskLevel::High, RiskLevel::Medium]
        );
        assert_eq!(
            levels(0.03, 2.1),
            vec![RiskLevel::Critical, RiskLevel::Critical, RiskLevel::Critical]
        );
    }

    #[test]
    fn test_coastal_thresholds_are_per_year() {
        let coastal = |rate: FloatValue| assess_risks(rate, 0.0)[1].level;
        assert_eq!(coastal(0.026), RiskLevel::Critical);
        assert_eq!(coastal(0.025), RiskLevel::High);
        assert_eq!(coastal(0.016), RiskLevel::High);
        assert_eq!(coastal(0.015), RiskLevel::Medium);
        assert_eq!(coastal(0.011), RiskLevel::Medium);
        assert_eq!(coastal(0.01), RiskLevel::Low);
        // A realistic modern rate of 0.2 °C per decade already reads as High
        assert_eq!(coastal(0.2 / 10.0), RiskLevel::High);
    }

    #[test]
    fn test_coastal_description_uses_decadal_rate() {
        let cards = assess_risks(0.02, 1.0);
        assert!(cards[1].description.contains("0.20°C/decade"));
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert_eq!("critical".parse::<RiskLevel>().unwrap(), RiskLevel::Critical);
        assert!("extreme".parse::<RiskLevel>().is_err());
    }
}
