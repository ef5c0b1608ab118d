//! Bootstrap uncertainty band for a linear trend.
//!
//! `(year, value)` pairs are resampled with replacement, a line is refitted
//! to each resample and evaluated over every observed year. The band is
//! formed from percentiles of those predictions.

use crate::errors::{CRIError, CRIResult};
use crate::stats;
use crate::timeseries::{AnnualSeries, FloatValue};
use crate::trend::{ConfidenceBand, TrendEstimate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A series needs strictly more values than this to be bootstrapped.
pub const MIN_BOOTSTRAP_LENGTH: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapOptions {
    /// Number of resamples.
    ///
    /// Default: 300
    pub samples: usize,

    /// Lower percentile of the band (0-100).
    ///
    /// Default: 5
    pub lower_percentile: FloatValue,

    /// Upper percentile of the band (0-100).
    ///
    /// Default: 95
    pub upper_percentile: FloatValue,

    /// Seed for the resampling RNG. Results are reproducible for a given seed.
    ///
    /// Default: 42
    pub seed: u64,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            samples: 300,
            lower_percentile: 5.0,
            upper_percentile: 95.0,
            seed: 42,
        }
    }
}

/// Percentile band of bootstrapped trend lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BootstrapBand {
    /// `center` holds the median prediction
    pub band: ConfidenceBand,
    /// Resamples that produced a usable fit
    pub draws_used: usize,
}

impl BootstrapBand {
    /// Band limits at the most recent year.
    pub fn latest(&self) -> Option<(FloatValue, FloatValue)> {
        Some((*self.band.lower.last()?, *self.band.upper.last()?))
    }
}

/// One resample and refit; `None` when the resample has no spread in x.
fn draw(x: &[FloatValue], y: &[FloatValue], rng: &mut StdRng) -> Option<Vec<FloatValue>> {
    let n = x.len();
    let (xs, ys): (Vec<_>, Vec<_>) = (0..n)
        .map(|_| {
            let i = rng.gen_range(0..n);
            (x[i], y[i])
        })
        .unzip();
    let trend = TrendEstimate::fit(&xs, &ys).ok()?;
    Some(x.iter().map(|xi| trend.predict(*xi)).collect())
}

/// Bootstrap percentile band for the linear trend of `series`.
pub fn bootstrap_band(series: &AnnualSeries, options: &BootstrapOptions) -> CRIResult<BootstrapBand> {
    if series.len() <= MIN_BOOTSTRAP_LENGTH {
        return Err(CRIError::insufficient(
            "bootstrap band",
            MIN_BOOTSTRAP_LENGTH + 1,
            series.len(),
        ));
    }
    if options.lower_percentile > options.upper_percentile {
        return Err(CRIError::InvalidParameter(format!(
            "Lower percentile {} exceeds upper percentile {}",
            options.lower_percentile, options.upper_percentile
        )));
    }

    let x = series.x().to_vec();
    let y = series.values().to_vec();

    // One RNG per draw keeps results independent of thread scheduling
    let predictions: Vec<Vec<FloatValue>> = (0..options.samples)
        .into_par_iter()
        .filter_map(|i| {
            let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(i as u64));
            draw(&x, &y, &mut rng)
        })
        .collect();

    if predictions.len() < 2 {
        return Err(CRIError::insufficient("bootstrap band", 2, predictions.len()));
    }
    if predictions.len() < options.samples {
        log::debug!(
            "Discarded {} degenerate bootstrap resamples",
            options.samples - predictions.len()
        );
    }

    let mut lower = Vec::with_capacity(x.len());
    let mut center = Vec::with_capacity(x.len());
    let mut upper = Vec::with_capacity(x.len());
    let mut column = Vec::with_capacity(predictions.len());
    for j in 0..x.len() {
        column.clear();
        column.extend(predictions.iter().map(|p| p[j]));
        column.sort_by(|a, b| a.total_cmp(b));
        lower.push(stats::percentile_sorted(&column, options.lower_percentile));
        center.push(stats::percentile_sorted(&column, 50.0));
        upper.push(stats::percentile_sorted(&column, options.upper_percentile));
    }

    Ok(BootstrapBand {
        band: ConfidenceBand {
            years: series.years().to_vec(),
            center,
            lower,
            upper,
        },
        draws_used: predictions.len(),
    })
}
