//! Change-point scanning.
//!
//! Each candidate year splits a series into two segments. For slope changes
//! the two segments receive independent linear fits and the split with the
//! smallest combined squared error wins. For variance changes the series is
//! detrended once and the split that best separates two residual variances
//! (Gaussian likelihood) wins.

use crate::errors::{CRIError, CRIResult};
use crate::stats;
use crate::timeseries::{AnnualSeries, FloatValue, Year, YearWindow};
use crate::trend::TrendEstimate;
use serde::{Deserialize, Serialize};

/// Smallest segment that still supports a linear fit.
pub const MIN_SEGMENT: usize = 2;

/// Lower bound applied to variances before taking logarithms.
const VARIANCE_FLOOR: FloatValue = 1e-12;

/// Search space for change-point scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangePointOptions {
    /// Candidate split years; a candidate `y` puts `y` in the left segment.
    ///
    /// Default: 1910-2009
    pub candidates: YearWindow,

    /// Minimum number of annual values on each side of a split. At least
    /// [`MIN_SEGMENT`].
    ///
    /// Default: 10
    pub min_segment: usize,
}

impl Default for ChangePointOptions {
    fn default() -> Self {
        Self {
            candidates: YearWindow {
                start: 1910,
                end: 2009,
            },
            min_segment: 10,
        }
    }
}

impl ChangePointOptions {
    pub fn validate(&self) -> CRIResult<()> {
        if self.min_segment < MIN_SEGMENT {
            return Err(CRIError::InvalidParameter(format!(
                "Change-point segments need at least {} values, got min_segment = {}",
                MIN_SEGMENT, self.min_segment
            )));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Shift in the linear trend slope
    Slope,
    /// Shift in the spread of detrended values
    Variance,
}

/// A detected shift in a series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangePoint {
    /// Last year of the earlier segment
    pub year: Year,
    /// Strength of the evidence in `[0, 1]`
    pub confidence: FloatValue,
    pub kind: ChangeKind,
    /// Slope per decade (slope scans) or residual standard deviation
    /// (variance scans) of the earlier segment
    pub before: FloatValue,
    /// Same quantity for the later segment
    pub after: FloatValue,
}

fn sum_squared_errors(trend: &TrendEstimate, x: &[FloatValue], y: &[FloatValue]) -> FloatValue {
    x.iter()
        .zip(y)
        .map(|(xi, yi)| (yi - trend.predict(*xi)).powi(2))
        .sum()
}

/// Whether a squared error is at the level of floating point noise for `y`.
fn negligible(sse: FloatValue, y: &[FloatValue]) -> bool {
    let scale: FloatValue = y.iter().map(|v| v * v).sum::<FloatValue>().max(1.0);
    sse <= FloatValue::EPSILON * scale
}

fn population_variance(values: &[FloatValue]) -> Option<FloatValue> {
    stats::std_population(values).map(|sd| (sd * sd).max(VARIANCE_FLOOR))
}

/// Candidate splits as `(year, split_index)` where `split_index` is the
/// number of values in the left segment.
fn candidate_splits(years: &[Year], options: &ChangePointOptions) -> Vec<(Year, usize)> {
    (options.candidates.start..=options.candidates.end)
        .filter_map(|year| {
            let split = years.partition_point(|y| *y <= year);
            let left = split;
            let right = years.len() - split;
            (left >= options.min_segment && right >= options.min_segment).then_some((year, split))
        })
        .collect()
}

/// Find the year at which the linear trend most plausibly changes slope.
///
/// Returns `Ok(None)` when no candidate leaves at least `min_segment` values
/// on both sides. Ties resolve to the earliest year.
pub fn scan_slope(
    series: &AnnualSeries,
    options: &ChangePointOptions,
) -> CRIResult<Option<ChangePoint>> {
    options.validate()?;
    let years = series.years().to_vec();
    let x = series.x().to_vec();
    let y = series.values().to_vec();

    let splits = candidate_splits(&years, options);
    if splits.is_empty() {
        log::debug!("No slope change-point candidates for {}", series.region());
        return Ok(None);
    }

    let global = TrendEstimate::fit(&x, &y)?;
    let global_sse = sum_squared_errors(&global, &x, &y);

    let mut best: Option<(Year, FloatValue, FloatValue, FloatValue)> = None;
    for (year, split) in splits {
        let left = TrendEstimate::fit(&x[..split], &y[..split])?;
        let right = TrendEstimate::fit(&x[split..], &y[split..])?;
        let score = sum_squared_errors(&left, &x[..split], &y[..split])
            + sum_squared_errors(&right, &x[split..], &y[split..]);
        if best.map_or(true, |(_, best_score, _, _)| score < best_score) {
            best = Some((year, score, left.rate_per_decade(), right.rate_per_decade()));
        }
    }

    Ok(best.map(|(year, score, before, after)| {
        let confidence = if negligible(global_sse, &y) {
            0.0
        } else {
            (1.0 - score / global_sse).clamp(0.0, 1.0)
        };
        ChangePoint {
            year,
            confidence,
            kind: ChangeKind::Slope,
            before,
            after,
        }
    }))
}

/// Find the year at which the variability around the long-term trend changes.
///
/// Confidence is `1 - exp(-LR / 2)` where `LR` is the reduction in the
/// Gaussian negative log-likelihood (times two) achieved by the split.
pub fn scan_variance(
    series: &AnnualSeries,
    options: &ChangePointOptions,
) -> CRIResult<Option<ChangePoint>> {
    options.validate()?;
    let years = series.years().to_vec();
    let x = series.x().to_vec();
    let y = series.values().to_vec();

    let splits = candidate_splits(&years, options);
    if splits.is_empty() {
        log::debug!("No variance change-point candidates for {}", series.region());
        return Ok(None);
    }

    let global = TrendEstimate::fit(&x, &y)?;
    let residuals: Vec<FloatValue> = x
        .iter()
        .zip(&y)
        .map(|(xi, yi)| yi - global.predict(*xi))
        .collect();
    let n = residuals.len() as FloatValue;
    let null_cost = n * population_variance(&residuals).unwrap_or(VARIANCE_FLOOR).ln();

    let mut best: Option<(Year, FloatValue, FloatValue, FloatValue)> = None;
    for (year, split) in splits {
        let (left, right) = residuals.split_at(split);
        let (Some(var_left), Some(var_right)) =
            (population_variance(left), population_variance(right))
        else {
            continue;
        };
        let cost = left.len() as FloatValue * var_left.ln() + right.len() as FloatValue * var_right.ln();
        if best.map_or(true, |(_, best_cost, _, _)| cost < best_cost) {
            best = Some((year, cost, var_left.sqrt(), var_right.sqrt()));
        }
    }

    Ok(best.map(|(year, cost, before, after)| {
        let ratio = (null_cost - cost).max(0.0);
        ChangePoint {
            year,
            confidence: (1.0 - (-ratio / 2.0).exp()).clamp(0.0, 1.0),
            kind: ChangeKind::Variance,
            before,
            after,
        }
    }))
}
