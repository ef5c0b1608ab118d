//! Reference-period baselines and anomalies.
//!
//! The baseline is the mean annual value over a fixed reference window
//! (1850-1900 by default, the conventional pre-industrial period). Anomalies
//! are always derived from a series and its baseline and are never stored
//! apart from the observations they came from.

use crate::errors::{CRIError, CRIResult};
use crate::stats;
use crate::timeseries::{AnnualSeries, FloatValue, Year, YearWindow};
use indexmap::IndexMap;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Default pre-industrial reference window.
pub const PRE_INDUSTRIAL: YearWindow = YearWindow {
    start: 1850,
    end: 1900,
};

/// Mean value of a region over the reference window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    region: String,
    window: YearWindow,
    value: FloatValue,
    /// Number of annual values that contributed to the mean
    n_years: usize,
}

impl Baseline {
    /// Compute the baseline of `series` over `window`.
    ///
    /// Returns [`CRIError::MissingBaselineYears`] when no year of the series falls
    /// inside the window.
    pub fn compute(series: &AnnualSeries, window: YearWindow) -> CRIResult<Self> {
        let in_window: Vec<FloatValue> = series
            .iter()
            .filter(|(year, _)| window.contains(*year))
            .map(|(_, value)| value)
            .collect();

        let value = stats::mean(&in_window).ok_or_else(|| CRIError::MissingBaselineYears {
            region: series.region().to_string(),
            start: window.start,
            end: window.end,
        })?;

        Ok(Self {
            region: series.region().to_string(),
            window,
            value,
            n_years: in_window.len(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn window(&self) -> YearWindow {
        self.window
    }

    pub fn value(&self) -> FloatValue {
        self.value
    }

    pub fn n_years(&self) -> usize {
        self.n_years
    }
}

/// Baselines for every region of a dataset.
///
/// Built once when a dataset is loaded. Regions whose record does not reach
/// back into the window have no entry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BaselineTable {
    window: Option<YearWindow>,
    baselines: IndexMap<String, Baseline>,
}

impl BaselineTable {
    pub fn build<'a>(series: impl IntoIterator<Item = &'a AnnualSeries>, window: YearWindow) -> Self {
        let mut baselines = IndexMap::new();
        for s in series {
            match Baseline::compute(s, window) {
                Ok(baseline) => {
                    log::debug!(
                        "Baseline for {} over {}: {:.3} ({} years)",
                        s.region(),
                        window,
                        baseline.value(),
                        baseline.n_years()
                    );
                    baselines.insert(s.region().to_string(), baseline);
                }
                Err(e) => log::warn!("{}", e),
            }
        }
        Self {
            window: Some(window),
            baselines,
        }
    }

    pub fn window(&self) -> Option<YearWindow> {
        self.window
    }

    pub fn get(&self, region: &str) -> Option<&Baseline> {
        self.baselines.get(region)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Baseline> {
        self.baselines.values()
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

/// Deviation of each annual value from the regional baseline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnomalySeries {
    baseline: Baseline,
    anomalies: AnnualSeries,
}

impl AnomalySeries {
    /// Derive anomalies as `value - baseline` for every year of `series`.
    pub fn from_series(series: &AnnualSeries, baseline: &Baseline) -> CRIResult<Self> {
        if series.region() != baseline.region() {
            return Err(CRIError::InvalidParameter(format!(
                "Baseline for region {} cannot be applied to region {}",
                baseline.region(),
                series.region()
            )));
        }
        let reference = baseline.value();
        Ok(Self {
            baseline: baseline.clone(),
            anomalies: series.map_values(|value| value - reference),
        })
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Anomalies as an annual series sharing the source years.
    pub fn series(&self) -> &AnnualSeries {
        &self.anomalies
    }

    pub fn region(&self) -> &str {
        self.anomalies.region()
    }

    pub fn years(&self) -> &Array1<Year> {
        self.anomalies.years()
    }

    pub fn values(&self) -> &Array1<FloatValue> {
        self.anomalies.values()
    }

    pub fn latest(&self) -> Option<(Year, FloatValue)> {
        Some((self.anomalies.last_year()?, self.anomalies.last_value()?))
    }

    /// Restrict to an analysis period. The baseline is unaffected.
    pub fn window(&self, window: YearWindow) -> AnomalySeries {
        Self {
            baseline: self.baseline.clone(),
            anomalies: self.anomalies.window(window),
        }
    }
}
