//! Monte Carlo scenario explorer.
//!
//! Each [`ScenarioRun`] perturbs the warming rate and the starting offset of
//! a linear projection and produces one trajectory. The ensemble is
//! summarised as a percentile band per projected year.
//!
//! Each run takes a single standard-normal draw `z` that shifts both the rate
//! and the offset, and the draws depend only on the seed and the run count.
//! A run's deviation from the central path at year offset `t` is therefore
//!
//! ```text
//! z * (offset_sd + rate_sd * t / 10)
//! ```
//!
//! which is monotone in each standard deviation separately, so increasing
//! either one can only widen the band at every year.

use crate::errors::{CRIError, CRIResult};
use crate::stats;
use crate::timeseries::{FloatValue, Year};
use crate::trend::ConfidenceBand;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Standard deviations of the projection parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Perturbation {
    /// Spread of the warming rate (°C per decade).
    ///
    /// Default: 0.05
    pub rate_sd: FloatValue,

    /// Spread of the starting anomaly (°C).
    ///
    /// Default: 0.1
    pub offset_sd: FloatValue,
}

impl Default for Perturbation {
    fn default() -> Self {
        Self {
            rate_sd: 0.05,
            offset_sd: 0.1,
        }
    }
}

impl Perturbation {
    /// Both standard deviations multiplied by `factor`.
    pub fn scaled(&self, factor: FloatValue) -> Self {
        Self {
            rate_sd: self.rate_sd * factor,
            offset_sd: self.offset_sd * factor,
        }
    }
}

/// Longest supported projection.
pub const MAX_HORIZON_YEARS: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// First projected year (offset zero).
    ///
    /// Default: 2020
    pub start_year: Year,

    /// Anomaly at the first projected year (°C).
    ///
    /// Default: 1.2
    pub start_anomaly: FloatValue,

    /// Central warming rate (°C per decade).
    ///
    /// Default: 0.25
    pub rate_per_decade: FloatValue,

    /// Years to project beyond the start year, at most [`MAX_HORIZON_YEARS`].
    ///
    /// Default: 30
    pub horizon_years: u32,

    /// Number of Monte Carlo runs.
    ///
    /// Default: 500
    pub runs: usize,

    pub perturbation: Perturbation,

    /// Default: 42
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            start_year: 2020,
            start_anomaly: 1.2,
            rate_per_decade: 0.25,
            horizon_years: 30,
            runs: 500,
            perturbation: Perturbation::default(),
            seed: 42,
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> CRIResult<()> {
        if self.runs < 2 {
            return Err(CRIError::InvalidParameter(format!(
                "At least 2 scenario runs are required, got {}",
                self.runs
            )));
        }
        if self.horizon_years == 0 || self.horizon_years > MAX_HORIZON_YEARS {
            return Err(CRIError::InvalidParameter(format!(
                "Scenario horizon must be between 1 and {} years, got {}",
                MAX_HORIZON_YEARS, self.horizon_years
            )));
        }
        if self
            .start_year
            .checked_add(MAX_HORIZON_YEARS as Year)
            .is_none()
        {
            return Err(CRIError::InvalidParameter(format!(
                "Scenario start year {} is out of range",
                self.start_year
            )));
        }
        let p = self.perturbation;
        for (name, sd) in [("rate_sd", p.rate_sd), ("offset_sd", p.offset_sd)] {
            if !sd.is_finite() || sd < 0.0 {
                return Err(CRIError::InvalidParameter(format!(
                    "Perturbation {} must be a non-negative number, got {}",
                    name, sd
                )));
            }
        }
        if !self.rate_per_decade.is_finite() || !self.start_anomaly.is_finite() {
            return Err(CRIError::InvalidParameter(
                "Scenario rate and starting anomaly must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Projected years, from the start year to the end of the horizon.
    /// Horizons beyond [`MAX_HORIZON_YEARS`] are cut at that length.
    pub fn years(&self) -> Vec<Year> {
        let horizon = self.horizon_years.min(MAX_HORIZON_YEARS) as Year;
        (0..=horizon)
            .map_while(|t| self.start_year.checked_add(t))
            .collect()
    }
}

/// One perturbed projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRun {
    pub rate_per_decade: FloatValue,
    pub offset: FloatValue,
    /// Anomaly for each projected year, starting at the start year
    pub trajectory: Vec<FloatValue>,
}

/// All runs of a scenario and their percentile band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEnsemble {
    runs: Vec<ScenarioRun>,
    /// 5th percentile, median and 95th percentile per year
    band: ConfidenceBand,
}

impl ScenarioEnsemble {
    pub fn runs(&self) -> &[ScenarioRun] {
        &self.runs
    }

    pub fn band(&self) -> &ConfidenceBand {
        &self.band
    }

    /// `(p5, p95)` at the final projected year.
    pub fn final_range(&self) -> Option<(FloatValue, FloatValue)> {
        Some((*self.band.lower.last()?, *self.band.upper.last()?))
    }

    /// Width of the band at the final projected year.
    pub fn final_width(&self) -> Option<FloatValue> {
        self.final_range().map(|(low, high)| high - low)
    }
}

/// Run the Monte Carlo ensemble described by `config`.
pub fn run_scenarios(config: &ScenarioConfig) -> CRIResult<ScenarioEnsemble> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let draws: Vec<FloatValue> = (0..config.runs)
        .map(|_| rng.sample(StandardNormal))
        .collect();

    let years = config.years();
    let p = config.perturbation;
    let runs: Vec<ScenarioRun> = draws
        .par_iter()
        .map(|z| {
            let rate_per_decade = config.rate_per_decade + p.rate_sd * z;
            let offset = p.offset_sd * z;
            let trajectory = (0..years.len())
                .map(|t| config.start_anomaly + offset + rate_per_decade / 10.0 * t as FloatValue)
                .collect();
            ScenarioRun {
                rate_per_decade,
                offset,
                trajectory,
            }
        })
        .collect();

    let mut lower = Vec::with_capacity(years.len());
    let mut center = Vec::with_capacity(years.len());
    let mut upper = Vec::with_capacity(years.len());
    let mut column = Vec::with_capacity(runs.len());
    for t in 0..years.len() {
        column.clear();
        column.extend(runs.iter().map(|r| r.trajectory[t]));
        column.sort_by(|a, b| a.total_cmp(b));
        lower.push(stats::percentile_sorted(&column, 5.0));
        center.push(stats::percentile_sorted(&column, 50.0));
        upper.push(stats::percentile_sorted(&column, 95.0));
    }

    log::debug!(
        "Ran {} scenarios from {} over {} years",
        runs.len(),
        config.start_year,
        config.horizon_years
    );

    Ok(ScenarioEnsemble {
        runs,
        band: ConfidenceBand {
            years,
            center,
            lower,
            upper,
        },
    })
}

/// Additional warming after `years` at a constant `rate_per_decade`.
pub fn projected_additional_warming(rate_per_decade: FloatValue, years: u32) -> FloatValue {
    rate_per_decade / 10.0 * years as FloatValue
}
