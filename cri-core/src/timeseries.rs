//! Annual and monthly temperature series.
//!
//! An [`AnnualSeries`] is the unit every statistic in this crate operates on:
//! one value per calendar year for a single region, with strictly increasing
//! years. The strict ordering doubles as the deduplication guarantee for
//! `(region, year)` pairs.

use crate::errors::{CRIError, CRIResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

pub type FloatValue = f64;
pub type Year = i32;

/// Region name used when a dataset has no region column.
pub const GLOBAL_REGION: &str = "Global";

/// Inclusive span of calendar years.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    pub start: Year,
    pub end: Year,
}

impl YearWindow {
    pub fn new(start: Year, end: Year) -> CRIResult<Self> {
        if end < start {
            return Err(CRIError::InvalidParameter(format!(
                "Year window end ({}) precedes start ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Window that is open towards the end of the record.
    pub fn from_year(start: Year) -> Self {
        Self {
            start,
            end: Year::MAX,
        }
    }

    pub fn contains(&self, year: Year) -> bool {
        year >= self.start && year <= self.end
    }
}

impl std::fmt::Display for YearWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.end == Year::MAX {
            write!(f, "{}-present", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A single row of the raw dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyObservation {
    pub region: String,
    pub year: Year,
    /// Calendar month, 1-12
    pub month: u32,
    pub value: FloatValue,
}

/// A single `(region, year, value)` record of an annual series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub region: String,
    pub year: Year,
    pub value: FloatValue,
}

/// Annual values for one region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnualSeries {
    region: String,
    years: Array1<Year>,
    values: Array1<FloatValue>,
}

impl AnnualSeries {
    /// Create a series, validating that years are strictly increasing.
    pub fn new(
        region: impl Into<String>,
        years: Array1<Year>,
        values: Array1<FloatValue>,
    ) -> CRIResult<Self> {
        let region = region.into();
        if years.len() != values.len() {
            return Err(CRIError::LengthMismatch {
                region,
                years: years.len(),
                values: values.len(),
            });
        }
        for pair in years.windows(2) {
            if pair[1] <= pair[0] {
                return Err(CRIError::UnorderedYears {
                    region,
                    previous: pair[0],
                    year: pair[1],
                });
            }
        }
        Ok(Self {
            region,
            years,
            values,
        })
    }

    /// Build a series from `(year, value)` pairs.
    pub fn from_pairs(
        region: impl Into<String>,
        pairs: impl IntoIterator<Item = (Year, FloatValue)>,
    ) -> CRIResult<Self> {
        let (years, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self::new(region, Array1::from(years), Array1::from(values))
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn years(&self) -> &Array1<Year> {
        &self.years
    }

    pub fn values(&self) -> &Array1<FloatValue> {
        &self.values
    }

    /// Years as floats, the x axis for regressions.
    pub fn x(&self) -> Array1<FloatValue> {
        self.years.mapv(|y| y as FloatValue)
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn first_year(&self) -> Option<Year> {
        self.years.first().copied()
    }

    pub fn last_year(&self) -> Option<Year> {
        self.years.last().copied()
    }

    pub fn last_value(&self) -> Option<FloatValue> {
        self.values.last().copied()
    }

    pub fn value_at(&self, year: Year) -> Option<FloatValue> {
        self.years
            .as_slice()
            .and_then(|years| years.binary_search(&year).ok())
            .map(|i| self.values[i])
    }

    /// Subset of the series whose years fall inside `window`.
    pub fn window(&self, window: YearWindow) -> AnnualSeries {
        let (years, values): (Vec<_>, Vec<_>) = self
            .iter()
            .filter(|(year, _)| window.contains(*year))
            .unzip();
        AnnualSeries {
            region: self.region.clone(),
            years: Array1::from(years),
            values: Array1::from(values),
        }
    }

    /// The last `n` years of the series (or all of it when shorter).
    pub fn tail(&self, n: usize) -> AnnualSeries {
        let skip = self.len().saturating_sub(n);
        AnnualSeries {
            region: self.region.clone(),
            years: self.years.iter().skip(skip).copied().collect(),
            values: self.values.iter().skip(skip).copied().collect(),
        }
    }

    /// Apply a transformation to every value, keeping years and region.
    pub fn map_values(&self, f: impl Fn(FloatValue) -> FloatValue) -> AnnualSeries {
        AnnualSeries {
            region: self.region.clone(),
            years: self.years.clone(),
            values: self.values.mapv(f),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Year, FloatValue)> + '_ {
        self.years.iter().copied().zip(self.values.iter().copied())
    }

    pub fn observations(&self) -> impl Iterator<Item = Observation> + '_ {
        self.iter().map(move |(year, value)| Observation {
            region: self.region.clone(),
            year,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn construction_requires_increasing_years() {
        let ok = AnnualSeries::new("Global", array![1900, 1901, 1903], array![1.0, 2.0, 3.0]);
        assert!(ok.is_ok());

        let duplicated = AnnualSeries::new("Global", array![1900, 1900], array![1.0, 2.0]);
        assert!(matches!(
            duplicated,
            Err(CRIError::UnorderedYears { year: 1900, .. })
        ));

        let reversed = AnnualSeries::new("Global", array![1901, 1900], array![1.0, 2.0]);
        assert!(reversed.is_err());

        let mismatch = AnnualSeries::new("Global", array![1900, 1901], array![1.0]);
        assert!(matches!(mismatch, Err(CRIError::LengthMismatch { .. })));
    }

    #[test]
    fn windowing_and_tail() {
        let series =
            AnnualSeries::from_pairs("Global", (1850..1860).map(|y| (y, y as f64))).unwrap();

        let window = series.window(YearWindow::new(1852, 1854).unwrap());
        assert_eq!(window.years(), &array![1852, 1853, 1854]);
        assert_eq!(window.region(), "Global");

        let open = series.window(YearWindow::from_year(1858));
        assert_eq!(open.len(), 2);

        let tail = series.tail(3);
        assert_eq!(tail.years(), &array![1857, 1858, 1859]);
        assert_eq!(series.tail(100).len(), 10);
    }

    #[test]
    fn value_lookup() {
        let series = AnnualSeries::from_pairs("Europe", vec![(2000, 0.5), (2002, 0.7)]).unwrap();
        assert_eq!(series.value_at(2002), Some(0.7));
        assert_eq!(series.value_at(2001), None);
        assert_eq!(series.last_value(), Some(0.7));
    }

    #[test]
    fn invalid_window() {
        assert!(YearWindow::new(1900, 1850).is_err());
        assert_eq!(YearWindow::new(1850, 1900).unwrap().to_string(), "1850-1900");
        assert_eq!(YearWindow::from_year(1980).to_string(), "1980-present");
    }
}
