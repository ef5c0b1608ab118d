//! Descriptive statistics helpers.
//!
//! Small, allocation-light routines shared by the trend, change-point and
//! pulse calculations. Conventions follow the common numerical-python
//! defaults so results are comparable with notebook analyses:
//! population standard deviation unless noted, linear-interpolation
//! percentiles, and second-order central differences for gradients.

use crate::timeseries::FloatValue;

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[FloatValue]) -> Option<FloatValue> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<FloatValue>() / values.len() as FloatValue)
}

/// Population standard deviation (divides by `n`).
pub fn std_population(values: &[FloatValue]) -> Option<FloatValue> {
    let m = mean(values)?;
    let ss: FloatValue = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / values.len() as FloatValue).sqrt())
}

/// Sample standard deviation (divides by `n - 1`). `None` with fewer than two values.
pub fn std_sample(values: &[FloatValue]) -> Option<FloatValue> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: FloatValue = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as FloatValue).sqrt())
}

/// Percentile `q` (0-100) using linear interpolation between closest ranks.
///
/// NaN values must be removed beforehand; they sort last and would skew the
/// upper percentiles.
pub fn percentile(values: &[FloatValue], q: FloatValue) -> Option<FloatValue> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(percentile_sorted(&sorted, q))
}

/// Percentile of an already sorted, non-empty slice.
pub fn percentile_sorted(sorted: &[FloatValue], q: FloatValue) -> FloatValue {
    let q = q.clamp(0.0, 100.0);
    let rank = q / 100.0 * (sorted.len() - 1) as FloatValue;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as FloatValue;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Fraction of values less than or equal to `value`, in `[0, 1]`.
pub fn percentile_rank(values: &[FloatValue], value: FloatValue) -> Option<FloatValue> {
    if values.is_empty() {
        return None;
    }
    let below = values.iter().filter(|v| **v <= value).count();
    Some(below as FloatValue / values.len() as FloatValue)
}

/// Trailing rolling mean. Element `i` of the output covers
/// `values[i..i + window]`, so the output has `n - window + 1` entries.
pub fn rolling_mean(values: &[FloatValue], window: usize) -> Vec<FloatValue> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| w.iter().sum::<FloatValue>() / window as FloatValue)
        .collect()
}

/// Trailing rolling sample standard deviation, aligned like [`rolling_mean`].
pub fn rolling_std(values: &[FloatValue], window: usize) -> Vec<FloatValue> {
    if window < 2 || values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .filter_map(std_sample)
        .collect()
}

/// Numerical first derivative with unit spacing.
///
/// Interior points use central differences, the two end points one-sided
/// differences. Fewer than two points yield zeros.
pub fn gradient(values: &[FloatValue]) -> Vec<FloatValue> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let mut out = Vec::with_capacity(n);
    out.push(values[1] - values[0]);
    for i in 1..n - 1 {
        out.push((values[i + 1] - values[i - 1]) / 2.0);
    }
    out.push(values[n - 1] - values[n - 2]);
    out
}

/// Spread below this fraction of the value magnitude counts as no spread.
const FLAT_TOLERANCE: FloatValue = 1e-12;

/// Standardise values to zero mean and unit population deviation.
///
/// A series with no spread maps to all zeros. Rounding noise (for example the
/// second derivative of an exact straight line) also counts as no spread.
pub fn z_scores(values: &[FloatValue]) -> Vec<FloatValue> {
    let (Some(m), Some(sd)) = (mean(values), std_population(values)) else {
        return Vec::new();
    };
    let magnitude = values.iter().fold(1.0, |acc: FloatValue, v| acc.max(v.abs()));
    if !sd.is_finite() || sd <= FLAT_TOLERANCE * magnitude {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - m) / sd).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    #[test]
    fn mean_and_spread() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        assert_eq!(std_population(&values), Some(2.0));
        assert!(is_close!(std_sample(&values).unwrap(), 2.138089935299395));
        assert_eq!(mean(&[]), None);
        assert_eq!(std_sample(&[1.0]), None);
    }

    #[test]
    fn percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 50.0), Some(3.0));
        assert_eq!(percentile(&values, 100.0), Some(5.0));
        // rank = 0.05 * 4 = 0.2
        assert!(is_close!(percentile(&values, 5.0).unwrap(), 1.2));
        assert!(is_close!(percentile(&values, 95.0).unwrap(), 4.8));
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn percentile_rank_bounds() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_rank(&values, 0.0), Some(0.0));
        assert_eq!(percentile_rank(&values, 2.0), Some(0.5));
        assert_eq!(percentile_rank(&values, 10.0), Some(1.0));
    }

    #[test]
    fn rolling_windows() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(rolling_mean(&values, 2), vec![1.5, 2.5, 3.5, 4.5]);
        assert_eq!(rolling_mean(&values, 6), Vec::<f64>::new());

        let stds = rolling_std(&values, 3);
        assert_eq!(stds.len(), 3);
        assert!(stds.iter().all(|s| is_close!(*s, 1.0)));
    }

    #[test]
    fn gradient_matches_central_differences() {
        let values = [1.0, 2.0, 4.0, 7.0, 11.0];
        assert_eq!(gradient(&values), vec![1.0, 1.5, 2.5, 3.5, 4.0]);
        assert_eq!(gradient(&[3.0]), vec![0.0]);
    }

    #[test]
    fn z_scores_of_flat_series() {
        assert_eq!(z_scores(&[2.0, 2.0, 2.0]), vec![0.0, 0.0, 0.0]);

        let z = z_scores(&[1.0, 3.0]);
        assert_eq!(z, vec![-1.0, 1.0]);

        // Rounding noise around zero
        let noise = z_scores(&[1e-17, -2e-17, 0.0, 3e-17]);
        assert!(noise.iter().all(|v| *v == 0.0));
    }
}
