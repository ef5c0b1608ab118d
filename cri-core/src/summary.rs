//! Descriptive summaries used by the report panels.

use crate::baseline::Baseline;
use crate::errors::{CRIError, CRIResult};
use crate::stats;
use crate::timeseries::{AnnualSeries, FloatValue, MonthlyObservation, Year};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pre-industrial climate compared with the most recent years.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeforeVsNow {
    pub pre_industrial: FloatValue,
    pub recent_mean: FloatValue,
    /// Number of years actually averaged (the record may be shorter than requested)
    pub recent_years: usize,
    pub delta: FloatValue,
}

/// Compare the baseline with the mean of the last `recent_years` of `series`.
pub fn before_vs_now(
    series: &AnnualSeries,
    baseline: &Baseline,
    recent_years: usize,
) -> CRIResult<BeforeVsNow> {
    let recent = series.tail(recent_years);
    let recent_mean = stats::mean(&recent.values().to_vec())
        .ok_or_else(|| CRIError::insufficient("recent mean", 1, 0))?;
    Ok(BeforeVsNow {
        pre_industrial: baseline.value(),
        recent_mean,
        recent_years: recent.len(),
        delta: recent_mean - baseline.value(),
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecadalMean {
    /// First year of the decade, e.g. 1990
    pub decade: Year,
    pub mean: FloatValue,
    pub n_years: usize,
}

fn decade_of(year: Year) -> Year {
    year.div_euclid(10) * 10
}

/// Mean value per calendar decade.
pub fn decadal_means(series: &AnnualSeries) -> Vec<DecadalMean> {
    let mut grouped: BTreeMap<Year, Vec<FloatValue>> = BTreeMap::new();
    for (year, value) in series.iter() {
        grouped.entry(decade_of(year)).or_default().push(value);
    }
    grouped
        .into_iter()
        .filter_map(|(decade, values)| {
            Some(DecadalMean {
                decade,
                mean: stats::mean(&values)?,
                n_years: values.len(),
            })
        })
        .collect()
}

/// The `n` highest values of a series, warmest first. Equal values keep
/// chronological order.
pub fn warmest_years(series: &AnnualSeries, n: usize) -> Vec<(Year, FloatValue)> {
    let mut pairs: Vec<(Year, FloatValue)> = series.iter().collect();
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    pairs.truncate(n);
    pairs
}

/// Year by month table of monthly means.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonalMatrix {
    pub years: Vec<Year>,
    /// Shape `(years.len(), 12)`; months without data hold NaN
    pub values: Array2<FloatValue>,
}

impl SeasonalMatrix {
    pub fn get(&self, year: Year, month: u32) -> Option<FloatValue> {
        let row = self.years.binary_search(&year).ok()?;
        let col = (month as usize).checked_sub(1).filter(|c| *c < 12)?;
        let value = self.values[[row, col]];
        (!value.is_nan()).then_some(value)
    }
}

/// Pivot monthly observations into a [`SeasonalMatrix`].
pub fn seasonal_matrix<'a>(
    monthly: impl IntoIterator<Item = &'a MonthlyObservation>,
) -> SeasonalMatrix {
    let mut cells: BTreeMap<Year, [(FloatValue, usize); 12]> = BTreeMap::new();
    for m in monthly {
        if !(1..=12).contains(&m.month) {
            continue;
        }
        let row = cells.entry(m.year).or_insert([(0.0, 0); 12]);
        let cell = &mut row[(m.month - 1) as usize];
        cell.0 += m.value;
        cell.1 += 1;
    }

    let years: Vec<Year> = cells.keys().copied().collect();
    let mut values = Array2::from_elem((years.len(), 12), FloatValue::NAN);
    for (i, row) in cells.values().enumerate() {
        for (j, (sum, count)) in row.iter().enumerate() {
            if *count > 0 {
                values[[i, j]] = sum / *count as FloatValue;
            }
        }
    }
    SeasonalMatrix { years, values }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramOptions {
    /// Default: 50
    pub bins: usize,
    /// Lower edge of the first bin. Default: -5.0
    pub min: FloatValue,
    /// Upper edge of the last bin. Default: 25.0
    pub max: FloatValue,
    /// Earliest decade to include. Default: 1950
    pub from_decade: Year,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            bins: 50,
            min: -5.0,
            max: 25.0,
            from_decade: 1950,
        }
    }
}

/// Distribution of monthly values within one decade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecadeHistogram {
    pub decade: Year,
    /// `bins + 1` edges
    pub edges: Vec<FloatValue>,
    pub counts: Vec<usize>,
}

/// Histograms of monthly values per decade, showing how the distribution
/// shifts towards warmer months. Values outside `[min, max]` are ignored; the
/// last bin includes its upper edge.
pub fn decadal_histograms<'a>(
    monthly: impl IntoIterator<Item = &'a MonthlyObservation>,
    options: &HistogramOptions,
) -> CRIResult<Vec<DecadeHistogram>> {
    if options.bins == 0 || !(options.max > options.min) {
        return Err(CRIError::InvalidParameter(format!(
            "Histogram needs at least one bin and max > min (bins={}, range={}..{})",
            options.bins, options.min, options.max
        )));
    }
    let width = (options.max - options.min) / options.bins as FloatValue;
    let edges: Vec<FloatValue> = (0..=options.bins)
        .map(|i| options.min + width * i as FloatValue)
        .collect();

    let mut by_decade: BTreeMap<Year, Vec<usize>> = BTreeMap::new();
    for m in monthly {
        let decade = decade_of(m.year);
        if decade < options.from_decade || m.value < options.min || m.value > options.max {
            continue;
        }
        let bin = (((m.value - options.min) / width) as usize).min(options.bins - 1);
        by_decade
            .entry(decade)
            .or_insert_with(|| vec![0; options.bins])[bin] += 1;
    }

    Ok(by_decade
        .into_iter()
        .map(|(decade, counts)| DecadeHistogram {
            decade,
            edges: edges.clone(),
            counts,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::PRE_INDUSTRIAL;

    fn monthly(year: Year, month: u32, value: FloatValue) -> MonthlyObservation {
        MonthlyObservation {
            region: "Global".to_string(),
            year,
            month,
            value,
        }
    }

    #[test]
    fn before_and_now() {
        let series = AnnualSeries::from_pairs(
            "Global",
            (1850..2021).map(|y| (y, if y <= 1900 { 14.0 } else { 15.0 })),
        )
        .unwrap();
        let baseline = Baseline::compute(&series, PRE_INDUSTRIAL).unwrap();
        let summary = before_vs_now(&series, &baseline, 10).unwrap();
        assert_eq!(summary.pre_industrial, 14.0);
        assert_eq!(summary.recent_mean, 15.0);
        assert_eq!(summary.recent_years, 10);
        assert_eq!(summary.delta, 1.0);
    }

    #[test]
    fn decades_and_warmest() {
        let series = AnnualSeries::from_pairs(
            "Global",
            vec![(1989, 0.1), (1990, 0.2), (1995, 0.4), (2001, 0.9), (2005, 0.9)],
        )
        .unwrap();
        let decades = decadal_means(&series);
        assert_eq!(decades.len(), 3);
        assert_eq!(decades[1].decade, 1990);
        assert!((decades[1].mean - 0.3).abs() < 1e-12);
        assert_eq!(decades[1].n_years, 2);

        let warmest = warmest_years(&series, 3);
        assert_eq!(warmest, vec![(2001, 0.9), (2005, 0.9), (1995, 0.4)]);
    }

    #[test]
    fn seasonal_pivot() {
        let rows = vec![
            monthly(2000, 1, 1.0),
            monthly(2000, 1, 3.0),
            monthly(2001, 12, 5.0),
            monthly(2001, 13, 9.0),
        ];
        let matrix = seasonal_matrix(&rows);
        assert_eq!(matrix.years, vec![2000, 2001]);
        assert_eq!(matrix.values.dim(), (2, 12));
        assert_eq!(matrix.get(2000, 1), Some(2.0));
        assert_eq!(matrix.get(2001, 12), Some(5.0));
        assert_eq!(matrix.get(2000, 2), None);
        assert_eq!(matrix.get(1999, 1), None);
    }

    #[test]
    fn histograms_per_decade() {
        let rows = vec![
            monthly(1949, 1, 10.0),
            monthly(1950, 1, -5.0),
            monthly(1955, 1, 25.0),
            monthly(1961, 1, 30.0),
            monthly(1962, 1, 12.3),
        ];
        let options = HistogramOptions::default();
        let histograms = decadal_histograms(&rows, &options).unwrap();
        assert_eq!(histograms.len(), 2);

        let fifties = &histograms[0];
        assert_eq!(fifties.decade, 1950);
        assert_eq!(fifties.edges.len(), 51);
        assert_eq!(fifties.counts[0], 1);
        assert_eq!(fifties.counts[49], 1);

        let sixties = &histograms[1];
        assert_eq!(sixties.counts.iter().sum::<usize>(), 1);
        // 12.3 lies in [12.2, 12.8)
        assert_eq!(sixties.counts[28], 1);
    }

    #[test]
    fn histogram_rejects_empty_range() {
        let options = HistogramOptions {
            min: 1.0,
            max: 1.0,
            ..HistogramOptions::default()
        };
        assert!(decadal_histograms(&[], &options).is_err());
    }
}
