//! Configuration file.
//!
//! Every section is optional; missing sections and fields take their
//! defaults. A minimal file only names the dataset:
//!
//! ```toml
//! [data]
//! path = "GlobalTemperatures.csv"
//! ```

use anyhow::{Context, Result};
use cri_components::parameters::{CompositeWeights, PulseParameters, RegionalRiskParameters};
use cri_core::bootstrap::BootstrapOptions;
use cri_core::changepoint::ChangePointOptions;
use cri_core::correction::CorrectionOptions;
use cri_core::scenario::ScenarioConfig;
use cri_core::summary::HistogramOptions;
use cri_core::timeseries::{FloatValue, Year, YearWindow};
use cri_core::LoaderOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file to load. The command line `--data` flag takes precedence.
    pub path: Option<PathBuf>,

    /// Region of the dataset to analyse.
    ///
    /// Default: `Global`
    pub region: Option<String>,

    #[serde(flatten)]
    pub loader: LoaderOptions,
}

impl DataConfig {
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(cri_core::GLOBAL_REGION)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Years used for the headline warming rate.
    ///
    /// Default: 30
    pub recent_years: usize,

    /// Years fitted for the forecast.
    ///
    /// Default: 1970-present
    pub forecast_train: YearWindow,

    /// Last forecast year.
    ///
    /// Default: 2050
    pub forecast_until: Year,

    /// Half-width of trend and forecast bands in residual deviations.
    ///
    /// Default: 2.0
    pub band_multiplier: FloatValue,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            recent_years: 30,
            forecast_train: YearWindow::from_year(1970),
            forecast_until: 2050,
            band_multiplier: cri_core::trend::DEFAULT_BAND_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Years averaged for the "now" side of before-vs-now.
    ///
    /// Default: 10
    pub recent_years: usize,

    /// Number of warmest years listed.
    ///
    /// Default: 5
    pub warmest: usize,

    pub histogram: HistogramOptions,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            recent_years: 10,
            warmest: 5,
            histogram: HistogramOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    /// Start the projection from the last observed year, its anomaly and the
    /// observed warming rate instead of the configured values.
    ///
    /// Default: true
    pub anchor_to_data: bool,

    /// Horizon of the simple constant-rate outlook.
    ///
    /// Default: 30
    pub outlook_years: u32,

    #[serde(flatten)]
    pub ensemble: ScenarioConfig,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            anchor_to_data: true,
            outlook_years: 30,
            ensemble: ScenarioConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub trend: TrendConfig,
    pub summary: SummaryConfig,
    pub bootstrap: BootstrapOptions,
    pub changepoint: ChangePointOptions,
    pub scenario: ScenarioSettings,
    pub pulse: PulseParameters,
    pub composite: CompositeWeights,
    pub regions: RegionalRiskParameters,
    /// Reconstruction of a suspect year; disabled unless present.
    pub correction: Option<CorrectionOptions>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that cannot be expressed by the types alone.
    pub fn validate(&self) -> Result<()> {
        self.pulse.validate()?;
        self.composite.normalized()?;
        self.changepoint.validate()?;
        self.scenario.ensemble.validate()?;
        if self.trend.recent_years < 2 {
            anyhow::bail!(
                "trend.recent_years must be at least 2, got {}",
                self.trend.recent_years
            );
        }
        if !(self.trend.band_multiplier >= 0.0) {
            anyhow::bail!(
                "trend.band_multiplier must be non-negative, got {}",
                self.trend.band_multiplier
            );
        }
        if self.summary.recent_years == 0 {
            anyhow::bail!("summary.recent_years must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.trend.recent_years, 30);
        assert_eq!(config.pulse.window, 20);
        assert_eq!(config.data.loader.value_column, "LandAndOceanAverageTemperature");
        assert_eq!(config.data.region(), "Global");
        assert!(config.scenario.anchor_to_data);
        assert_eq!(config.scenario.ensemble.runs, 500);
        assert!(config.correction.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_toml(
            r#"
            [data]
            path = "temps.csv"
            value_column = "LandAverageTemperature"
            fill_trailing_dates = true

            [trend]
            recent_years = 20

            [scenario]
            runs = 200
            anchor_to_data = false

            [scenario.perturbation]
            rate_sd = 0.1

            [pulse]
            window = 30

            [regions.overrides."Europe"]
            multiplier = 1.5

            [correction]
            year = 2017
            "#,
        )
        .unwrap();
        assert_eq!(config.data.path, Some(PathBuf::from("temps.csv")));
        assert_eq!(config.data.loader.value_column, "LandAverageTemperature");
        assert!(config.data.loader.fill_trailing_dates);
        assert_eq!(config.data.loader.date_column, "dt");
        assert_eq!(config.trend.recent_years, 20);
        assert_eq!(config.scenario.ensemble.runs, 200);
        assert_eq!(config.scenario.ensemble.perturbation.rate_sd, 0.1);
        assert_eq!(config.scenario.ensemble.perturbation.offset_sd, 0.1);
        assert!(!config.scenario.anchor_to_data);
        assert_eq!(config.pulse.window, 30);
        assert_eq!(config.regions.overrides["Europe"].multiplier, Some(1.5));
        assert_eq!(config.correction.unwrap().reference.start, 2010);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Config::from_toml("[pulse]\nwindow = 5").is_err());
        assert!(Config::from_toml("[composite]\nexposure = -1.0").is_err());
        assert!(Config::from_toml("[trend]\nrecent_years = 1").is_err());
        assert!(Config::from_toml("[changepoint]\nmin_segment = 1").is_err());
        assert!(Config::from_toml("[scenario]\nhorizon_years = 5000").is_err());
        assert!(Config::from_toml("[trend]\nrecent_years = \"many\"").is_err());
    }
}
