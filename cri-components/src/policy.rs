//! Policy summary generator.
//!
//! Maps scores and rates onto canned interpretive text. Every text depends
//! only on the band a number falls into, so small changes inside a band
//! never change the message.

use crate::assessment::RiskCard;
use crate::risk_pulse::RiskPulseScore;
use chrono::NaiveDate;
use cri_core::correction::CorrectionStats;
use cri_core::errors::CRIError;
use cri_core::scenario::projected_additional_warming;
use cri_core::timeseries::FloatValue;
use cri_core::trend::Acceleration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Score at which the band becomes Elevated.
pub const ELEVATED_THRESHOLD: FloatValue = 0.6;
/// Score at which the band becomes High.
pub const HIGH_THRESHOLD: FloatValue = 0.8;

/// Interpretation band of a score in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PolicyBand {
    Moderate,
    Elevated,
    High,
}

impl PolicyBand {
    pub fn from_score(score: FloatValue) -> Self {
        if score >= HIGH_THRESHOLD {
            PolicyBand::High
        } else if score >= ELEVATED_THRESHOLD {
            PolicyBand::Elevated
        } else {
            PolicyBand::Moderate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyBand::Moderate => "Moderate",
            PolicyBand::Elevated => "Elevated",
            PolicyBand::High => "High",
        }
    }

    fn narrative(&self) -> &'static str {
        match self {
            PolicyBand::High => {
                "Signals point to an emerging high-risk regime. Adaptation measures \
                 should move from planning into implementation now."
            }
            PolicyBand::Elevated => {
                "Risk signals are elevated. Contingency plans should be reviewed and \
                 monitoring intensified before thresholds are crossed."
            }
            PolicyBand::Moderate => {
                "Risk signals are moderate. Routine preparedness and monitoring remain \
                 essential as the baseline keeps shifting."
            }
        }
    }
}

impl fmt::Display for PolicyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sector whose recommendations are requested.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    PublicHealth,
    FoodSystems,
    Infrastructure,
    WaterSecurity,
}

impl Sector {
    pub const ALL: [Sector; 4] = [
        Sector::PublicHealth,
        Sector::FoodSystems,
        Sector::Infrastructure,
        Sector::WaterSecurity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Sector::PublicHealth => "Public health",
            Sector::FoodSystems => "Food systems",
            Sector::Infrastructure => "Infrastructure",
            Sector::WaterSecurity => "Water security",
        }
    }

    pub fn recommendations(&self) -> [&'static str; 3] {
        match self {
            Sector::PublicHealth => [
                "Activate heat early-warning systems and public alerts.",
                "Expand cooling centers and occupational heat protections.",
                "Track heat-related morbidity in near-real time.",
            ],
            Sector::FoodSystems => [
                "Prioritize drought-resilient crop portfolios.",
                "Increase strategic food storage buffers.",
                "Accelerate irrigation efficiency upgrades.",
            ],
            Sector::Infrastructure => [
                "Stress-test energy and transport systems for peak heat.",
                "Fast-track retrofit plans for critical assets.",
                "Review design standards for extreme temperature exposure.",
            ],
            Sector::WaterSecurity => [
                "Enhance monitoring of reservoirs and groundwater drawdown.",
                "Plan demand-management programs for heat peaks.",
                "Assess transboundary water risk coordination.",
            ],
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Sector {
    type Err = CRIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match key.as_str() {
            "public health" | "health" => Ok(Sector::PublicHealth),
            "food systems" | "food" => Ok(Sector::FoodSystems),
            "infrastructure" => Ok(Sector::Infrastructure),
            "water security" | "water" => Ok(Sector::WaterSecurity),
            _ => Err(CRIError::InvalidParameter(format!("Unknown sector '{}'", s))),
        }
    }
}

/// Interpretation of a score for one region and sector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicySummary {
    pub score: RiskPulseScore,
    pub band: PolicyBand,
    pub region: String,
    pub sector: Sector,
    pub headline: String,
    pub narrative: String,
    pub recommendations: Vec<String>,
}

impl PolicySummary {
    pub fn for_score(score: RiskPulseScore, region: &str, sector: Sector) -> Self {
        let band = score.band();
        Self {
            score,
            band,
            region: region.to_string(),
            sector,
            headline: format!("{} risk signal for {} in {}.", band, region, sector),
            narrative: band.narrative().to_string(),
            recommendations: sector
                .recommendations()
                .iter()
                .map(|r| r.to_string())
                .collect(),
        }
    }

    /// Same text for the same band, region and sector.
    pub fn text_eq(&self, other: &PolicySummary) -> bool {
        self.headline == other.headline
            && self.narrative == other.narrative
            && self.recommendations == other.recommendations
    }
}

/// Plain-language reading of an [`Acceleration`] classification.
pub fn acceleration_narrative(acceleration: Acceleration) -> &'static str {
    match acceleration {
        Acceleration::Accelerated => {
            "Warming has accelerated in recent decades. The post-1980 warming rate is \
             significantly higher than earlier periods."
        }
        Acceleration::Modest => {
            "Warming continues, but acceleration relative to earlier periods is modest."
        }
        Acceleration::Unknown => {
            "Not enough data to confidently assess acceleration for all periods."
        }
    }
}

/// Qualitative reading of a projected additional warming.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioOutlook {
    CriticalThresholds,
    HighImpact,
    LowerImpact,
}

impl ScenarioOutlook {
    pub fn from_warming(additional_warming: FloatValue) -> Self {
        if additional_warming > 1.5 {
            ScenarioOutlook::CriticalThresholds
        } else if additional_warming > 1.0 {
            ScenarioOutlook::HighImpact
        } else {
            ScenarioOutlook::LowerImpact
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ScenarioOutlook::CriticalThresholds => {
                "High likelihood of crossing critical climate thresholds."
            }
            ScenarioOutlook::HighImpact => "High-impact warming range.",
            ScenarioOutlook::LowerImpact => "Lower-impact pathway if sustained.",
        }
    }
}

/// Additional warming at a constant rate and its outlook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProjection {
    pub rate_per_decade: FloatValue,
    pub years: u32,
    pub additional_warming: FloatValue,
    pub outlook: ScenarioOutlook,
}

pub fn scenario_outlook(rate_per_decade: FloatValue, years: u32) -> ScenarioProjection {
    let additional_warming = projected_additional_warming(rate_per_decade, years);
    ScenarioProjection {
        rate_per_decade,
        years,
        additional_warming,
        outlook: ScenarioOutlook::from_warming(additional_warming),
    }
}

/// How results should and should not be used.
pub const DECISION_GUIDANCE: [&str; 3] = [
    "To understand direction and magnitude",
    "To support risk-aware planning",
    "Not as a precise prediction engine",
];

/// Executive brief assembled from the analysis results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyBrief {
    pub date: NaiveDate,
    pub rate_per_decade: FloatValue,
    pub anomaly: FloatValue,
    pub summary: PolicySummary,
    pub acceleration: Option<Acceleration>,
    pub risks: Vec<RiskCard>,
    pub correction: Option<CorrectionStats>,
    pub projection: Option<ScenarioProjection>,
}

impl PolicyBrief {
    pub fn new(
        date: NaiveDate,
        rate_per_decade: FloatValue,
        anomaly: FloatValue,
        summary: PolicySummary,
    ) -> Self {
        Self {
            date,
            rate_per_decade,
            anomaly,
            summary,
            acceleration: None,
            risks: Vec::new(),
            correction: None,
            projection: None,
        }
    }

    pub fn with_acceleration(mut self, acceleration: Acceleration) -> Self {
        self.acceleration = Some(acceleration);
        self
    }

    pub fn with_risks(mut self, risks: Vec<RiskCard>) -> Self {
        self.risks = risks;
        self
    }

    pub fn with_correction(mut self, correction: CorrectionStats) -> Self {
        self.correction = Some(correction);
        self
    }

    pub fn with_projection(mut self, projection: ScenarioProjection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Render the brief as Markdown.
    pub fn render_markdown(&self) -> String {
        self.to_string()
    }
}

/// Formats as the Markdown brief.
impl fmt::Display for PolicyBrief {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "# Climate Strategy Briefing: Executive Summary")?;
        writeln!(out)?;
        writeln!(out, "**Date:** {}  ", self.date.format("%Y-%m-%d"))?;
        writeln!(out, "**Region:** {}  ", self.summary.region)?;
        writeln!(
            out,
            "**Status:** {} (Risk Pulse {:.0}/100)",
            self.summary.band.as_str().to_uppercase(),
            self.summary.score.as_index()
        )?;
        writeln!(out)?;

        writeln!(out, "## 1. Situation Analysis")?;
        writeln!(out)?;
        writeln!(
            out,
            "Temperature data indicates a persistent warming trend of **{:+.3}°C per decade**. \
             The current temperature anomaly stands at **{:+.2}°C** above the 1850-1900 baseline.",
            self.rate_per_decade, self.anomaly
        )?;
        if let Some(acceleration) = self.acceleration {
            writeln!(out)?;
            writeln!(out, "{}", acceleration_narrative(acceleration))?;
        }
        writeln!(out)?;
        writeln!(out, "{}", self.summary.narrative)?;
        writeln!(out)?;

        writeln!(out, "## 2. Key Risk Vectors")?;
        writeln!(out)?;
        for risk in &self.risks {
            writeln!(
                out,
                "* **{}:** {} risk. {}",
                risk.title, risk.level, risk.description
            )?;
        }
        if let Some(correction) = &self.correction {
            writeln!(
                out,
                "* **Data Integrity:** {} monthly values of {} were reconstructed from the \
                 recent climatology and the {:+.3}°C/yr trend.",
                correction.months_corrected, correction.year, correction.slope
            )?;
        }
        if self.risks.is_empty() && self.correction.is_none() {
            writeln!(out, "* No individual risk vectors were assessed.")?;
        }
        writeln!(out)?;

        writeln!(
            out,
            "## 3. Strategic Recommendations ({})",
            self.summary.sector
        )?;
        writeln!(out)?;
        for (i, recommendation) in self.summary.recommendations.iter().enumerate() {
            writeln!(out, "{}. {}", i + 1, recommendation)?;
        }
        writeln!(out)?;

        if let Some(projection) = &self.projection {
            writeln!(out, "## 4. Scenario Outlook")?;
            writeln!(out)?;
            writeln!(
                out,
                "At {:.2}°C per decade, {} more years add **{:+.2}°C**. {}",
                projection.rate_per_decade,
                projection.years,
                projection.additional_warming,
                projection.outlook.message()
            )?;
            writeln!(out)?;
        }

        writeln!(out, "## Decision Guidance")?;
        writeln!(out)?;
        for line in DECISION_GUIDANCE {
            writeln!(out, "- {}", line)?;
        }
        writeln!(out)?;
        writeln!(out, "---")?;
        writeln!(out, "*Generated by Climate Risk Interpreter*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::assess_risks;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(PolicyBand::from_score(0.0), PolicyBand::Moderate);
        assert_eq!(PolicyBand::from_score(0.5999), PolicyBand::Moderate);
        assert_eq!(PolicyBand::from_score(0.6), PolicyBand::Elevated);
        assert_eq!(PolicyBand::from_score(0.7999), PolicyBand::Elevated);
        assert_eq!(PolicyBand::from_score(0.8), PolicyBand::High);
        assert_eq!(PolicyBand::from_score(1.0), PolicyBand::High);
    }

    #[test]
    fn test_summary_changes_only_across_bands() {
        let at = |score: FloatValue| {
            PolicySummary::for_score(
                RiskPulseScore::from_value(score),
                "South Asia",
                Sector::PublicHealth,
            )
        };
        let steps: Vec<PolicySummary> = (0..=100).map(|i| at(i as FloatValue / 100.0)).collect();
        for pair in steps.windows(2) {
            let same_band = pair[0].band == pair[1].band;
            assert_eq!(same_band, pair[0].text_eq(&pair[1]));
        }
        assert_eq!(
            at(0.85).headline,
            "High risk signal for South Asia in Public health."
        );
    }

    #[test]
    fn test_sector_parsing() {
        assert_eq!("water".parse::<Sector>().unwrap(), Sector::WaterSecurity);
        assert_eq!(
            "Public-Health".parse::<Sector>().unwrap(),
            Sector::PublicHealth
        );
        assert!("tourism".parse::<Sector>().is_err());
        assert_eq!(Sector::ALL.len(), 4);
    }

    #[test]
    fn test_scenario_outlook() {
        assert_eq!(
            scenario_outlook(0.25, 30).outlook,
            ScenarioOutlook::LowerImpact
        );
        assert_eq!(
            scenario_outlook(0.25, 50).outlook,
            ScenarioOutlook::HighImpact
        );
        assert_eq!(
            scenario_outlook(0.6, 80).outlook,
            ScenarioOutlook::CriticalThresholds
        );
    }

    #[test]
    fn test_brief_markdown() {
        let summary = PolicySummary::for_score(
            RiskPulseScore::from_value(0.65),
            "Europe",
            Sector::Infrastructure,
        );
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let brief = PolicyBrief::new(date, 0.2, 1.3, summary)
            .with_acceleration(Acceleration::Accelerated)
            .with_risks(assess_risks(0.02, 1.3))
            .with_projection(scenario_outlook(0.2, 30));
        let markdown = brief.render_markdown();

        assert!(markdown.starts_with("# Climate Strategy Briefing"));
        assert!(markdown.contains("**Date:** 2024-05-01"));
        assert!(markdown.contains("**Status:** ELEVATED (Risk Pulse 65/100)"));
        assert!(markdown.contains("+0.200°C per decade"));
        assert!(markdown.contains("Warming has accelerated"));
        assert!(markdown.contains("* **Coastal Inundation:** High risk."));
        assert!(markdown.contains("1. Stress-test energy and transport systems for peak heat."));
        assert!(markdown.contains("## 4. Scenario Outlook"));
        assert!(markdown.trim_end().ends_with("*Generated by Climate Risk Interpreter*"));
        assert_eq!(format!("{}", brief), markdown);
    }

    #[test]
    fn test_summary_json() {
        let summary = PolicySummary::for_score(
            RiskPulseScore::from_value(0.9),
            "SIDS",
            Sector::Infrastructure,
        );
        let json = serde_json::to_string(&summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["region"], "SIDS");

        let restored: PolicySummary = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, summary);
        assert_eq!(restored.band, PolicyBand::High);
    }
}
