//! Reconstruction of a suspect year.
//!
//! Some published records carry an implausible final year (the Berkeley
//! Earth global file is the usual example with 2017). The months of such a
//! year are rebuilt from the recent monthly climatology advanced by one year
//! of the modern-era trend. The raw observations are left untouched; the
//! correction returns a new set of rows.

use crate::errors::{CRIError, CRIResult};
use crate::stats;
use crate::timeseries::{FloatValue, MonthlyObservation, Year, YearWindow};
use crate::trend::TrendEstimate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionOptions {
    /// Year whose monthly values are replaced.
    ///
    /// Default: 2017
    pub year: Year,

    /// Years used to fit the trend of annual means.
    ///
    /// Default: 1970-2016
    pub train: YearWindow,

    /// Years used for the monthly climatology.
    ///
    /// Default: 2010-2016
    pub reference: YearWindow,
}

impl Default for CorrectionOptions {
    fn default() -> Self {
        Self {
            year: 2017,
            train: YearWindow {
                start: 1970,
                end: 2016,
            },
            reference: YearWindow {
                start: 2010,
                end: 2016,
            },
        }
    }
}

/// Diagnostics of a [`correct_year`] call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrectionStats {
    pub region: String,
    pub year: Year,
    /// Mean of the raw months of the corrected year
    pub original_mean: Option<FloatValue>,
    /// Mean of the rebuilt months
    pub corrected_mean: Option<FloatValue>,
    /// Trend of annual means over the training window (per year)
    pub slope: FloatValue,
    pub intercept: FloatValue,
    /// Residual spread of the training fit
    pub residual_std: FloatValue,
    pub months_corrected: usize,
}

/// Corrected copy of a monthly record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YearCorrection {
    pub monthly: Vec<MonthlyObservation>,
    pub stats: CorrectionStats,
}

/// Rebuild the months of `options.year` for `region`.
///
/// Rows of other regions and other years are copied unchanged.
pub fn correct_year(
    monthly: &[MonthlyObservation],
    region: &str,
    options: &CorrectionOptions,
) -> CRIResult<YearCorrection> {
    let regional: Vec<&MonthlyObservation> =
        monthly.iter().filter(|m| m.region == region).collect();
    if regional.is_empty() {
        return Err(CRIError::UnknownRegion(region.to_string()));
    }

    let mut annual: BTreeMap<Year, Vec<FloatValue>> = BTreeMap::new();
    let mut climatology: BTreeMap<u32, Vec<FloatValue>> = BTreeMap::new();
    for m in &regional {
        if options.train.contains(m.year) {
            annual.entry(m.year).or_default().push(m.value);
        }
        if options.reference.contains(m.year) {
            climatology.entry(m.month).or_default().push(m.value);
        }
    }

    let (x, y): (Vec<FloatValue>, Vec<FloatValue>) = annual
        .iter()
        .filter_map(|(year, values)| Some((*year as FloatValue, stats::mean(values)?)))
        .unzip();
    let trend = TrendEstimate::fit(&x, &y)?;

    let expected: BTreeMap<u32, FloatValue> = climatology
        .iter()
        .filter_map(|(month, values)| Some((*month, stats::mean(values)? + trend.slope)))
        .collect();

    let mut original = Vec::new();
    let mut corrected_values = Vec::new();
    let corrected: Vec<MonthlyObservation> = monthly
        .iter()
        .map(|m| {
            if m.region != region || m.year != options.year {
                return m.clone();
            }
            original.push(m.value);
            match expected.get(&m.month) {
                Some(value) => {
                    corrected_values.push(*value);
                    MonthlyObservation {
                        value: *value,
                        ..m.clone()
                    }
                }
                None => {
                    log::warn!(
                        "No reference climatology for month {} in {}; keeping raw value",
                        m.month,
                        region
                    );
                    m.clone()
                }
            }
        })
        .collect();

    let diagnostics = CorrectionStats {
        region: region.to_string(),
        year: options.year,
        original_mean: stats::mean(&original),
        corrected_mean: stats::mean(&corrected_values),
        slope: trend.slope,
        intercept: trend.intercept,
        residual_std: trend.residual_std,
        months_corrected: corrected_values.len(),
    };
    if diagnostics.months_corrected > 0 {
        log::info!(
            "Rebuilt {} months of {} for {} (raw mean {:?}, corrected mean {:?})",
            diagnostics.months_corrected,
            options.year,
            region,
            diagnostics.original_mean,
            diagnostics.corrected_mean
        );
    }

    Ok(YearCorrection {
        monthly: corrected,
        stats: diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Vec<MonthlyObservation> {
        let mut rows = Vec::new();
        for year in 1970..=2017 {
            for month in 1..=12u32 {
                let seasonal = if month <= 6 { -1.0 } else { 1.0 };
                let value = if year == 2017 {
                    // Broken final year
                    -50.0
                } else {
                    14.0 + 0.02 * (year - 1970) as f64 + seasonal
                };
                rows.push(MonthlyObservation {
                    region: "Global".to_string(),
                    year,
                    month,
                    value,
                });
            }
        }
        rows.push(MonthlyObservation {
            region: "Europe".to_string(),
            year: 2017,
            month: 1,
            value: -50.0,
        });
        rows
    }

    #[test]
    fn rebuilds_target_year_only() {
        let raw = record();
        let result = correct_year(&raw, "Global", &CorrectionOptions::default()).unwrap();

        assert_eq!(result.monthly.len(), raw.len());
        assert_eq!(result.stats.months_corrected, 12);
        assert_eq!(result.stats.original_mean, Some(-50.0));
        assert!((result.stats.slope - 0.02).abs() < 1e-9);

        // January 2017: mean of Jan 2010-2016 plus one year of trend
        let expected_jan = 14.0 + 0.02 * 43.0 - 1.0 + 0.02;
        let jan = result
            .monthly
            .iter()
            .find(|m| m.region == "Global" && m.year == 2017 && m.month == 1)
            .unwrap();
        assert!((jan.value - expected_jan).abs() < 1e-9);

        // Other regions and years are untouched
        let europe = result.monthly.iter().find(|m| m.region == "Europe").unwrap();
        assert_eq!(europe.value, -50.0);
        assert_eq!(result.monthly[0], raw[0]);
    }

    #[test]
    fn unknown_region() {
        assert!(matches!(
            correct_year(&record(), "Mars", &CorrectionOptions::default()),
            Err(CRIError::UnknownRegion(_))
        ));
    }
}
