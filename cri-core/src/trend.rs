//! Linear trend estimation.
//!
//! Ordinary least squares fits over annual series, with the residual spread
//! used as a simple uncertainty band. Rates are reported per decade, which is
//! how warming rates are usually communicated.

use crate::errors::{CRIError, CRIResult};
use crate::stats;
use crate::timeseries::{AnnualSeries, FloatValue, Year, YearWindow};
use serde::{Deserialize, Serialize};

/// Minimum number of annual values for a period warming rate.
pub const MIN_PERIOD_SAMPLES: usize = 5;

/// Multiplier applied to the residual spread for the default band
/// (roughly a 95% interval for normally distributed residuals).
pub const DEFAULT_BAND_MULTIPLIER: FloatValue = 2.0;

/// Result of an OLS fit `y = slope * x + intercept`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendEstimate {
    pub slope: FloatValue,
    pub intercept: FloatValue,
    /// Population standard deviation of the residuals
    pub residual_std: FloatValue,
    /// Standard error of the slope; `None` with fewer than three points
    pub slope_std_error: Option<FloatValue>,
    /// Coefficient of determination
    pub r_squared: FloatValue,
    /// Number of points in the fit
    pub n: usize,
    /// Years covered by the fit, when fitted from a series
    pub window: Option<YearWindow>,
}

/// Lower and upper envelope around a fitted or projected line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub years: Vec<Year>,
    pub center: Vec<FloatValue>,
    pub lower: Vec<FloatValue>,
    pub upper: Vec<FloatValue>,
}

impl ConfidenceBand {
    pub fn width_at(&self, index: usize) -> Option<FloatValue> {
        Some(self.upper.get(index)? - self.lower.get(index)?)
    }
}

impl TrendEstimate {
    /// Fit a straight line through `(x, y)`.
    pub fn fit(x: &[FloatValue], y: &[FloatValue]) -> CRIResult<Self> {
        if x.len() != y.len() {
            return Err(CRIError::InvalidParameter(format!(
                "x and y lengths differ ({} vs {})",
                x.len(),
                y.len()
            )));
        }
        let n = x.len();
        if n < 2 {
            return Err(CRIError::insufficient("trend fit", 2, n));
        }

        let x_mean = stats::mean(x).unwrap_or_default();
        let y_mean = stats::mean(y).unwrap_or_default();

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (xi, yi) in x.iter().zip(y) {
            sxx += (xi - x_mean).powi(2);
            sxy += (xi - x_mean) * (yi - y_mean);
        }
        if sxx == 0.0 {
            return Err(CRIError::DegenerateFit(x_mean));
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let residuals: Vec<FloatValue> = x
            .iter()
            .zip(y)
            .map(|(xi, yi)| yi - (slope * xi + intercept))
            .collect();
        let sse: FloatValue = residuals.iter().map(|r| r * r).sum();
        let sst: FloatValue = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();

        let residual_std = stats::std_population(&residuals).unwrap_or_default();
        let slope_std_error = (n > 2).then(|| (sse / (n - 2) as FloatValue / sxx).sqrt());
        let r_squared = if sst > 0.0 { 1.0 - sse / sst } else { 1.0 };

        Ok(Self {
            slope,
            intercept,
            residual_std,
            slope_std_error,
            r_squared,
            n,
            window: None,
        })
    }

    /// Fit a trend to the years of `series` that fall inside `window`.
    pub fn fit_series(series: &AnnualSeries, window: Option<YearWindow>) -> CRIResult<Self> {
        let subset = match window {
            Some(w) => series.window(w),
            None => series.clone(),
        };
        let x = subset.x().to_vec();
        let y = subset.values().to_vec();
        let mut estimate = Self::fit(&x, &y)?;
        estimate.window = match (subset.first_year(), subset.last_year()) {
            (Some(start), Some(end)) => Some(YearWindow { start, end }),
            _ => None,
        };
        log::debug!(
            "Trend for {} over {:?}: slope={:.5}/yr r2={:.3}",
            series.region(),
            estimate.window,
            estimate.slope,
            estimate.r_squared
        );
        Ok(estimate)
    }

    pub fn predict(&self, x: FloatValue) -> FloatValue {
        self.slope * x + self.intercept
    }

    /// Slope expressed per decade.
    pub fn rate_per_decade(&self) -> FloatValue {
        self.slope * 10.0
    }

    /// Fitted line for `years` with `± multiplier * residual_std` envelope.
    pub fn confidence_band(&self, years: &[Year], multiplier: FloatValue) -> ConfidenceBand {
        let center: Vec<FloatValue> = years.iter().map(|y| self.predict(*y as FloatValue)).collect();
        let half_width = multiplier * self.residual_std;
        ConfidenceBand {
            years: years.to_vec(),
            lower: center.iter().map(|c| c - half_width).collect(),
            upper: center.iter().map(|c| c + half_width).collect(),
            center,
        }
    }
}

/// Warming rate (per decade) over the most recent `recent_years` of a series.
pub fn warming_rate(series: &AnnualSeries, recent_years: usize) -> CRIResult<FloatValue> {
    let recent = series.tail(recent_years);
    Ok(TrendEstimate::fit_series(&recent, None)?.rate_per_decade())
}

/// A named historical period for rate comparisons.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub label: String,
    pub window: YearWindow,
}

impl Period {
    pub fn new(label: impl Into<String>, window: YearWindow) -> Self {
        Self {
            label: label.into(),
            window,
        }
    }

    /// Early industrial, twentieth-century and post-1980 periods.
    pub fn standard() -> Vec<Period> {
        vec![
            Period::new("1850-1900", YearWindow { start: 1850, end: 1900 }),
            Period::new("1900-1980", YearWindow { start: 1900, end: 1980 }),
            Period::new("Post-1980", YearWindow::from_year(1980)),
        ]
    }
}

/// Warming rate observed over one [`Period`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodRate {
    pub period: Period,
    /// Rate per decade, `None` when the period has too few samples
    pub rate_per_decade: Option<FloatValue>,
    pub n_years: usize,
}

/// Per-period decadal warming rates. Periods with fewer than
/// [`MIN_PERIOD_SAMPLES`] years carry no rate.
pub fn period_rates(series: &AnnualSeries, periods: &[Period]) -> Vec<PeriodRate> {
    periods
        .iter()
        .map(|period| {
            let subset = series.window(period.window);
            let rate_per_decade = if subset.len() < MIN_PERIOD_SAMPLES {
                None
            } else {
                TrendEstimate::fit_series(&subset, None)
                    .map(|t| t.rate_per_decade())
                    .ok()
            };
            PeriodRate {
                period: period.clone(),
                rate_per_decade,
                n_years: subset.len(),
            }
        })
        .collect()
}

/// Whether recent warming outpaces an earlier period.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Acceleration {
    /// The recent rate exceeds the earlier rate
    Accelerated,
    /// Warming continues without clear acceleration
    Modest,
    /// At least one of the rates could not be computed
    Unknown,
}

impl Acceleration {
    pub fn classify(earlier: Option<FloatValue>, recent: Option<FloatValue>) -> Self {
        match (earlier, recent) {
            (Some(earlier), Some(recent)) if recent > earlier => Acceleration::Accelerated,
            (Some(_), Some(_)) => Acceleration::Modest,
            _ => Acceleration::Unknown,
        }
    }

    /// Compare the last two entries of a [`period_rates`] result.
    pub fn from_period_rates(rates: &[PeriodRate]) -> Self {
        match rates {
            [.., earlier, recent] => {
                Self::classify(earlier.rate_per_decade, recent.rate_per_decade)
            }
            _ => Acceleration::Unknown,
        }
    }
}

/// Trend projection beyond the observed record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub trend: TrendEstimate,
    pub band: ConfidenceBand,
}

/// Fit a trend over `train` and project it from the year after the record
/// ends up to `until`, with a `± multiplier * residual_std` envelope.
pub fn forecast(
    series: &AnnualSeries,
    train: YearWindow,
    until: Year,
    multiplier: FloatValue,
) -> CRIResult<Forecast> {
    let trend = TrendEstimate::fit_series(series, Some(train))?;
    let last = series
        .last_year()
        .ok_or_else(|| CRIError::insufficient("forecast", 1, 0))?;
    let years: Vec<Year> = ((last + 1)..=until).collect();
    let band = trend.confidence_band(&years, multiplier);
    Ok(Forecast { trend, band })
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    fn linear_series(slope: f64, intercept: f64) -> AnnualSeries {
        AnnualSeries::from_pairs(
            "Global",
            (1850..2021).map(|y| (y, slope * y as f64 + intercept)),
        )
        .unwrap()
    }

    #[test]
    fn exact_line_is_recovered() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let trend = TrendEstimate::fit(&x, &y).unwrap();
        assert!(is_close!(trend.slope, 2.0));
        assert!(is_close!(trend.intercept, 1.0));
        assert!(trend.residual_std.abs() < 1e-12);
        assert!(is_close!(trend.r_squared, 1.0));
        assert_eq!(trend.n, 4);
    }

    #[test]
    fn noisy_fit_statistics() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 3.0, 2.0, 4.0];
        let trend = TrendEstimate::fit(&x, &y).unwrap();
        // Sxy = 4, Sxx = 5
        assert!(is_close!(trend.slope, 0.8));
        assert!(is_close!(trend.intercept, 0.5));
        // residuals: -0.3, 0.9, -0.9, 0.3 -> SSE = 1.8, SST = 5
        assert!(is_close!(trend.r_squared, 1.0 - 1.8 / 5.0));
        assert!(is_close!(trend.residual_std, (1.8f64 / 4.0).sqrt()));
        assert!(is_close!(trend.slope_std_error.unwrap(), (1.8f64 / 2.0 / 5.0).sqrt()));
    }

    #[test]
    fn fit_errors() {
        assert!(matches!(
            TrendEstimate::fit(&[1.0], &[1.0]),
            Err(CRIError::InsufficientSamples { required: 2, actual: 1, .. })
        ));
        assert!(matches!(
            TrendEstimate::fit(&[2.0, 2.0], &[1.0, 3.0]),
            Err(CRIError::DegenerateFit(_))
        ));
        assert!(TrendEstimate::fit(&[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn fit_series_records_window() {
        let series = linear_series(0.01, -5.0);
        let trend =
            TrendEstimate::fit_series(&series, Some(YearWindow::new(1900, 1950).unwrap())).unwrap();
        assert_eq!(trend.window, Some(YearWindow { start: 1900, end: 1950 }));
        assert_eq!(trend.n, 51);
        assert!((trend.rate_per_decade() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn recent_warming_rate() {
        let series = linear_series(0.02, 0.0);
        let rate = warming_rate(&series, 30).unwrap();
        assert!((rate - 0.2).abs() < 1e-9);
    }

    #[test]
    fn period_rates_and_acceleration() {
        // Flat until 1980, warming afterwards
        let series = AnnualSeries::from_pairs(
            "Global",
            (1850..2021).map(|y| {
                let v = if y <= 1980 { 0.0 } else { 0.03 * (y - 1980) as f64 };
                (y, v)
            }),
        )
        .unwrap();
        let rates = period_rates(&series, &Period::standard());
        assert_eq!(rates.len(), 3);
        assert!(rates[0].rate_per_decade.unwrap().abs() < 1e-9);
        assert!(rates[2].rate_per_decade.unwrap() > 0.2);
        assert_eq!(Acceleration::from_period_rates(&rates), Acceleration::Accelerated);
    }

    #[test]
    fn short_periods_have_no_rate() {
        let series = AnnualSeries::from_pairs("Global", (1990..1994).map(|y| (y, 1.0))).unwrap();
        let rates = period_rates(&series, &Period::standard());
        assert!(rates.iter().all(|r| r.rate_per_decade.is_none()));
        assert_eq!(Acceleration::from_period_rates(&rates), Acceleration::Unknown);
        assert_eq!(Acceleration::classify(Some(0.2), Some(0.1)), Acceleration::Modest);
    }

    #[test]
    fn forecast_band() {
        let series = linear_series(0.02, -30.0);
        let projection =
            forecast(&series, YearWindow::new(1970, 2016).unwrap(), 2050, 2.0).unwrap();
        assert_eq!(projection.band.years.first(), Some(&2021));
        assert_eq!(projection.band.years.last(), Some(&2050));
        let expected = 0.02 * 2050.0 - 30.0;
        assert!((projection.band.center.last().unwrap() - expected).abs() < 1e-6);
        // Perfect line: no spread
        assert!(projection.band.width_at(0).unwrap().abs() < 1e-9);
    }
}
