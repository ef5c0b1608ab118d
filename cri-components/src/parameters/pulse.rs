//! Risk Pulse parameters
//!
//! Parameters for the rolling pulse index and for the composite score that
//! blends climate signals with regional exposure.

use cri_core::errors::{CRIError, CRIResult};
use cri_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};

/// Smallest rolling window accepted by the pulse index.
pub const MIN_WINDOW: usize = 10;
/// Largest rolling window accepted by the pulse index.
pub const MAX_WINDOW: usize = 40;

/// Parameters for the rolling Risk Pulse index
///
/// The raw pulse is
///
/// $$P = z(\bar{T}_w) + w_{vol} \cdot z(\sigma_w) + w_{acc} \cdot z(\ddot{T}_w)$$
///
/// where $\bar{T}_w$ is the trailing rolling mean of the anomalies, $\sigma_w$
/// the rolling sample deviation and $\ddot{T}_w$ the second derivative of the
/// rolling mean. $P$ is rescaled between its lower and upper percentiles and
/// clipped to $[0, 1]$.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseParameters {
    /// Rolling window in years (10 to 40).
    ///
    /// Default: 20
    pub window: usize,

    /// Weight of the volatility z-score (0 to 1).
    ///
    /// Default: 0.4
    pub volatility_weight: FloatValue,

    /// Weight of the acceleration z-score (0 to 1).
    ///
    /// Default: 0.6
    pub acceleration_weight: FloatValue,

    /// Percentile mapped to pulse 0.
    ///
    /// Default: 5
    pub lower_percentile: FloatValue,

    /// Percentile mapped to pulse 1.
    ///
    /// Default: 95
    pub upper_percentile: FloatValue,

    /// Alert threshold on the 0-100 pulse index (60 to 95).
    ///
    /// Default: 80
    pub alert_threshold: FloatValue,

    /// Anomaly (°C) treated as the top of the anomaly-magnitude signal.
    ///
    /// Default: 2.0 °C
    pub anomaly_ceiling: FloatValue,

    /// Rate increase (°C/decade, recent minus earlier period) treated as the
    /// top of the trend-acceleration signal.
    ///
    /// Default: 0.2 °C/decade
    pub acceleration_ceiling: FloatValue,
}

impl Default for PulseParameters {
    fn default() -> Self {
        Self {
            window: 20,
            volatility_weight: 0.4,
            acceleration_weight: 0.6,
            lower_percentile: 5.0,
            upper_percentile: 95.0,
            alert_threshold: 80.0,
            anomaly_ceiling: 2.0,
            acceleration_ceiling: 0.2,
        }
    }
}

impl PulseParameters {
    pub fn validate(&self) -> CRIResult<()> {
        if !(MIN_WINDOW..=MAX_WINDOW).contains(&self.window) {
            return Err(CRIError::InvalidParameter(format!(
                "Pulse window must be between {} and {} years, got {}",
                MIN_WINDOW, MAX_WINDOW, self.window
            )));
        }
        for (name, weight) in [
            ("volatility_weight", self.volatility_weight),
            ("acceleration_weight", self.acceleration_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(CRIError::InvalidParameter(format!(
                    "Pulse {} must lie in [0, 1], got {}",
                    name, weight
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.lower_percentile)
            || !(0.0..=100.0).contains(&self.upper_percentile)
            || self.lower_percentile >= self.upper_percentile
        {
            return Err(CRIError::InvalidParameter(format!(
                "Pulse percentiles must satisfy 0 <= lower < upper <= 100, got {} and {}",
                self.lower_percentile, self.upper_percentile
            )));
        }
        if !(0.0..=100.0).contains(&self.alert_threshold) {
            return Err(CRIError::InvalidParameter(format!(
                "Alert threshold must lie in [0, 100], got {}",
                self.alert_threshold
            )));
        }
        if !(self.anomaly_ceiling > 0.0) || !(self.acceleration_ceiling > 0.0) {
            return Err(CRIError::InvalidParameter(
                "Signal ceilings must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Weights of the composite Risk Pulse score
///
/// Weights are relative; the score divides by their sum. Adaptive capacity
/// enters inverted, so higher capacity lowers the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    /// Default: 0.3
    pub trend_acceleration: FloatValue,
    /// Default: 0.3
    pub anomaly_magnitude: FloatValue,
    /// Default: 0.2
    pub exposure: FloatValue,
    /// Default: 0.2
    pub adaptive_capacity: FloatValue,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            trend_acceleration: 0.3,
            anomaly_magnitude: 0.3,
            exposure: 0.2,
            adaptive_capacity: 0.2,
        }
    }
}

impl CompositeWeights {
    pub fn as_array(&self) -> [FloatValue; 4] {
        [
            self.trend_acceleration,
            self.anomaly_magnitude,
            self.exposure,
            self.adaptive_capacity,
        ]
    }

    /// Weights rescaled so the largest is 1, after checking they are finite
    /// and non-negative. Rescaling keeps the sum finite for any valid input.
    pub fn normalized(&self) -> CRIResult<[FloatValue; 4]> {
        let weights = self.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(CRIError::InvalidParameter(format!(
                "Composite weights must be finite and non-negative, got {:?}",
                weights
            )));
        }
        let largest = weights.iter().copied().fold(0.0, FloatValue::max);
        if largest <= 0.0 {
            return Err(CRIError::InvalidParameter(
                "At least one composite weight must be positive".to_string(),
            ));
        }
        Ok(weights.map(|w| w / largest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = PulseParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.window, 20);
        let weights = CompositeWeights::default().normalized().unwrap();
        assert_eq!(weights[0], 1.0);
        assert!((weights[2] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_window_bounds() {
        for window in [9, 41] {
            let params = PulseParameters {
                window,
                ..PulseParameters::default()
            };
            assert!(params.validate().is_err());
        }
    }

    #[test]
    fn test_rejects_negative_weights() {
        let weights = CompositeWeights {
            exposure: -0.1,
            ..CompositeWeights::default()
        };
        assert!(weights.normalized().is_err());

        let zero = CompositeWeights {
            trend_acceleration: 0.0,
            anomaly_magnitude: 0.0,
            exposure: 0.0,
            adaptive_capacity: 0.0,
        };
        assert!(zero.normalized().is_err());

        let infinite = CompositeWeights {
            exposure: FloatValue::INFINITY,
            ..CompositeWeights::default()
        };
        assert!(infinite.normalized().is_err());
    }

    #[test]
    fn test_huge_weights_stay_finite() {
        let huge = CompositeWeights {
            trend_acceleration: 1e308,
            anomaly_magnitude: 1e308,
            exposure: 1e308,
            adaptive_capacity: 1e308,
        };
        assert_eq!(huge.normalized().unwrap(), [1.0; 4]);
    }

    #[test]
    fn test_partial_toml() {
        let params: PulseParameters = toml::from_str("window = 30").unwrap();
        assert_eq!(params.window, 30);
        assert_eq!(params.volatility_weight, 0.4);
    }
}
