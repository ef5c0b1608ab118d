//! Climate Risk Pulse
//!
//! Two related early-warning signals live here.
//!
//! # Pulse index
//!
//! [`RiskPulse::pulse_series`] fuses the level, volatility and acceleration of
//! a rolling anomaly window into one index per year:
//!
//! 1. Trailing rolling mean $\bar{T}$ and rolling sample deviation $\sigma$
//!    over `window` years
//! 2. Acceleration $\ddot{T}$ as the gradient of the gradient of $\bar{T}$
//! 3. Raw pulse $P = z(\bar{T}) + w_{vol} z(\sigma) + w_{acc} z(\ddot{T})$
//! 4. Rescale between the 5th and 95th percentile of $P$ and clip to $[0, 1]$
//!
//! The index is displayed on a 0-100 scale. It is not a forecast; it flags
//! years in which the warming regime is unusually intense.
//!
//! # Composite score
//!
//! [`RiskPulseScore::composite`] combines four normalised [`PulseSignals`]
//! (trend acceleration, anomaly magnitude, regional exposure and adaptive
//! capacity) into a weighted mean in $[0, 1]$ that drives the policy summary.

use crate::parameters::{CompositeWeights, PulseParameters};
use crate::policy::PolicyBand;
use crate::regions::RegionProfile;
use cri_core::errors::{CRIError, CRIResult};
use cri_core::stats;
use cri_core::timeseries::{AnnualSeries, FloatValue, Year};
use serde::{Deserialize, Serialize};

/// Pulse index per year, aligned with the end of each rolling window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseSeries {
    pub years: Vec<Year>,
    /// Pulse index in `[0, 1]`
    pub index: Vec<FloatValue>,
    pub rolling_mean: Vec<FloatValue>,
    pub rolling_std: Vec<FloatValue>,
}

/// The most recent pulse reading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseReading {
    pub year: Year,
    pub index: FloatValue,
    pub rolling_mean: FloatValue,
    pub rolling_std: FloatValue,
}

impl PulseReading {
    /// Index on the 0-100 display scale.
    pub fn as_index(&self) -> FloatValue {
        self.index * 100.0
    }

    pub fn state(&self) -> PolicyBand {
        PolicyBand::from_score(self.index)
    }
}

impl PulseSeries {
    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn latest(&self) -> Option<PulseReading> {
        Some(PulseReading {
            year: *self.years.last()?,
            index: *self.index.last()?,
            rolling_mean: *self.rolling_mean.last()?,
            rolling_std: *self.rolling_std.last()?,
        })
    }
}

/// Years whose pulse reaches `threshold` on the 0-100 scale.
pub fn alerts(series: &PulseSeries, threshold: FloatValue) -> Vec<Year> {
    series
        .years
        .iter()
        .zip(&series.index)
        .filter(|(_, index)| **index * 100.0 >= threshold)
        .map(|(year, _)| *year)
        .collect()
}

/// Rolling Risk Pulse index calculator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskPulse {
    parameters: PulseParameters,
}

impl RiskPulse {
    /// Create a calculator with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a calculator from parameters
    pub fn from_parameters(parameters: PulseParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &PulseParameters {
        &self.parameters
    }

    /// Compute the pulse index of an anomaly series.
    ///
    /// # Arguments
    ///
    /// * `anomalies` - Annual anomalies relative to the baseline
    ///
    /// # Returns
    ///
    /// One index per complete rolling window. Requires more values than the
    /// window length. A series whose raw pulse has no spread maps to zero.
    pub fn pulse_series(&self, anomalies: &AnnualSeries) -> CRIResult<PulseSeries> {
        let p = &self.parameters;
        p.validate()?;
        if anomalies.len() <= p.window {
            return Err(CRIError::InsufficientSamples {
                operation: "risk pulse".to_string(),
                required: p.window + 1,
                actual: anomalies.len(),
            });
        }

        let values = anomalies.values().to_vec();
        let rolling_mean = stats::rolling_mean(&values, p.window);
        let rolling_std = stats::rolling_std(&values, p.window);
        let acceleration = stats::gradient(&stats::gradient(&rolling_mean));
        let years = anomalies.years().to_vec()[p.window - 1..].to_vec();

        let level = stats::z_scores(&rolling_mean);
        let volatility = stats::z_scores(&rolling_std);
        let acceleration = stats::z_scores(&acceleration);
        let raw: Vec<FloatValue> = level
            .iter()
            .zip(&volatility)
            .zip(&acceleration)
            .map(|((z, v), a)| z + p.volatility_weight * v + p.acceleration_weight * a)
            .collect();

        let low = stats::percentile(&raw, p.lower_percentile).unwrap_or(0.0);
        let high = stats::percentile(&raw, p.upper_percentile).unwrap_or(0.0);
        let span = high - low;
        let index = if span > FloatValue::EPSILON {
            raw.iter()
                .map(|r| ((r - low) / span).clamp(0.0, 1.0))
                .collect()
        } else {
            log::debug!("Raw pulse for {} has no spread", anomalies.region());
            vec![0.0; raw.len()]
        };

        Ok(PulseSeries {
            years,
            index,
            rolling_mean,
            rolling_std,
        })
    }
}

/// Normalised inputs to the composite score, each in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseSignals {
    pub trend_acceleration: FloatValue,
    pub anomaly_magnitude: FloatValue,
    pub exposure: FloatValue,
    pub adaptive_capacity: FloatValue,
}

/// Clamp to `[0, 1]`; NaN counts as no signal.
fn unit(value: FloatValue) -> FloatValue {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl PulseSignals {
    /// Normalise observed quantities for `region`.
    ///
    /// # Arguments
    ///
    /// * `recent_rate` - Recent warming rate (°C/decade)
    /// * `earlier_rate` - Warming rate of the preceding period (°C/decade)
    /// * `anomaly` - Current anomaly (°C)
    /// * `region` - Source of exposure and adaptive capacity
    /// * `parameters` - Ceilings mapping rates and anomalies onto `[0, 1]`
    pub fn from_observations(
        recent_rate: Option<FloatValue>,
        earlier_rate: Option<FloatValue>,
        anomaly: FloatValue,
        region: &RegionProfile,
        parameters: &PulseParameters,
    ) -> Self {
        let trend_acceleration = match (recent_rate, earlier_rate) {
            (Some(recent), Some(earlier)) => (recent - earlier) / parameters.acceleration_ceiling,
            _ => 0.0,
        };
        Self {
            trend_acceleration: unit(trend_acceleration),
            anomaly_magnitude: unit(anomaly / parameters.anomaly_ceiling),
            exposure: unit(region.exposure),
            adaptive_capacity: unit(region.adaptive_capacity),
        }
    }

    fn clamped(&self) -> [FloatValue; 4] {
        [
            unit(self.trend_acceleration),
            unit(self.anomaly_magnitude),
            unit(self.exposure),
            // High capacity lowers risk
            1.0 - unit(self.adaptive_capacity),
        ]
    }
}

/// Composite early-warning score in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct RiskPulseScore(FloatValue);

impl RiskPulseScore {
    /// Weighted mean of the signals. Inputs outside `[0, 1]` are clamped;
    /// negative or all-zero weights are rejected.
    pub fn composite(signals: &PulseSignals, weights: &CompositeWeights) -> CRIResult<Self> {
        let weights = weights.normalized()?;
        let total: FloatValue = weights.iter().sum();
        let weighted: FloatValue = signals
            .clamped()
            .iter()
            .zip(weights)
            .map(|(s, w)| s * w)
            .sum();
        Ok(Self(unit(weighted / total)))
    }

    /// Wrap an existing score, clamped to `[0, 1]`.
    pub fn from_value(value: FloatValue) -> Self {
        Self(unit(value))
    }

    pub fn value(&self) -> FloatValue {
        self.0
    }

    /// Score on the 0-100 display scale.
    pub fn as_index(&self) -> FloatValue {
        self.0 * 100.0
    }

    pub fn band(&self) -> PolicyBand {
        PolicyBand::from_score(self.0)
    }
}
