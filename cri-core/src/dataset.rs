//! Loading of tabular temperature datasets.
//!
//! The loader accepts the layout of the widely used Berkeley Earth
//! `GlobalTemperatures.csv` (a `dt` date column with monthly rows) as well as
//! plain annual tables with a `year` column. An optional region column splits
//! the rows into independent regional series.
//!
//! Rows that cannot be used (unparseable date, missing value) are dropped and
//! counted in the [`LoadReport`]; they never abort the load.

use crate::baseline::{AnomalySeries, Baseline, BaselineTable, PRE_INDUSTRIAL};
use crate::errors::{CRIError, CRIResult};
use crate::timeseries::{
    AnnualSeries, FloatValue, MonthlyObservation, Year, YearWindow, GLOBAL_REGION,
};
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column names and cleaning rules for [`ClimateDataset`] loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Column holding dates (`YYYY-MM-DD` or `YYYY-MM`).
    ///
    /// Default: `dt`
    pub date_column: String,

    /// Column holding integer years, used when the date column is absent.
    ///
    /// Default: `year`
    pub year_column: String,

    /// Column holding the temperature values.
    ///
    /// Default: `LandAndOceanAverageTemperature`
    pub value_column: String,

    /// Optional column naming the region of each row.
    ///
    /// Default: `region`
    pub region_column: String,

    /// Assign consecutive month starts to trailing rows whose date failed to parse.
    ///
    /// Default: false
    pub fill_trailing_dates: bool,

    /// Reference window for baselines.
    ///
    /// Default: 1850-1900
    pub baseline: YearWindow,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            date_column: "dt".to_string(),
            year_column: "year".to_string(),
            value_column: "LandAndOceanAverageTemperature".to_string(),
            region_column: "region".to_string(),
            fill_trailing_dates: false,
            baseline: PRE_INDUSTRIAL,
        }
    }
}

/// Bookkeeping of what happened while reading a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_dropped_date: usize,
    pub rows_dropped_value: usize,
    pub dates_filled: usize,
}

impl LoadReport {
    pub fn rows_used(&self) -> usize {
        self.rows_read - self.rows_dropped_date - self.rows_dropped_value
    }
}

/// Temporal key of a row: either a month or a whole year.
#[derive(Copy, Clone, Debug, PartialEq)]
enum Period {
    Month(Year, u32),
    Year(Year),
}

impl Period {
    fn year(&self) -> Year {
        match self {
            Period::Month(year, _) | Period::Year(year) => *year,
        }
    }
}

struct RawRow {
    region: String,
    period: Option<Period>,
    value: Option<FloatValue>,
}

/// A loaded dataset: raw monthly rows, annual series per region and the
/// baselines computed at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimateDataset {
    monthly: Vec<MonthlyObservation>,
    annual: IndexMap<String, AnnualSeries>,
    baselines: BaselineTable,
    report: LoadReport,
}

impl ClimateDataset {
    /// Read a CSV file from disk.
    pub fn from_path<P: AsRef<Path>>(path: P, options: &LoaderOptions) -> CRIResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CRIError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Loading dataset from {}", path.display());
        Self::from_reader(file, options)
    }

    /// Read CSV data from any reader.
    pub fn from_reader<R: Read>(reader: R, options: &LoaderOptions) -> CRIResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h == name);

        let value_idx = column(&options.value_column)
            .ok_or_else(|| CRIError::MissingColumn(options.value_column.clone()))?;
        let region_idx = column(&options.region_column);
        let date_idx = column(&options.date_column);
        let year_idx = column(&options.year_column);
        if date_idx.is_none() && year_idx.is_none() {
            return Err(CRIError::MissingColumn(format!(
                "{} or {}",
                options.date_column, options.year_column
            )));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let region = region_idx
                .and_then(|i| record.get(i))
                .filter(|r| !r.is_empty())
                .unwrap_or(GLOBAL_REGION)
                .to_string();
            let period = match date_idx {
                Some(i) => record.get(i).and_then(parse_month),
                None => year_idx
                    .and_then(|i| record.get(i))
                    .and_then(parse_year)
                    .map(Period::Year),
            };
            let value = record.get(value_idx).and_then(parse_value);
            rows.push(RawRow {
                region,
                period,
                value,
            });
        }

        let mut report = LoadReport {
            rows_read: rows.len(),
            ..LoadReport::default()
        };
        if options.fill_trailing_dates {
            report.dates_filled = fill_trailing_dates(&mut rows);
        }

        let mut monthly = Vec::new();
        let mut annual_rows = Vec::new();
        for row in rows {
            let Some(period) = row.period else {
                report.rows_dropped_date += 1;
                continue;
            };
            let Some(value) = row.value else {
                report.rows_dropped_value += 1;
                continue;
            };
            if let Period::Month(year, month) = period {
                monthly.push(MonthlyObservation {
                    region: row.region.clone(),
                    year,
                    month,
                    value,
                });
            }
            annual_rows.push((row.region, period.year(), value));
        }

        if report.rows_dropped_date + report.rows_dropped_value > 0 {
            log::warn!(
                "Dropped {} rows with unparseable dates and {} rows without values",
                report.rows_dropped_date,
                report.rows_dropped_value
            );
        }

        let annual = aggregate_annual(annual_rows)?;
        Self::assemble(monthly, annual, options.baseline, report)
    }

    /// Build a dataset from monthly observations, for example a corrected copy
    /// of a loaded dataset.
    pub fn from_monthly(monthly: Vec<MonthlyObservation>, baseline: YearWindow) -> CRIResult<Self> {
        let rows = monthly
            .iter()
            .map(|m| (m.region.clone(), m.year, m.value))
            .collect();
        let annual = aggregate_annual(rows)?;
        let report = LoadReport {
            rows_read: monthly.len(),
            ..LoadReport::default()
        };
        Self::assemble(monthly, annual, baseline, report)
    }

    /// Build a dataset from annual series directly.
    pub fn from_annual(
        series: impl IntoIterator<Item = AnnualSeries>,
        baseline: YearWindow,
    ) -> CRIResult<Self> {
        let mut annual = IndexMap::new();
        for s in series {
            if annual.contains_key(s.region()) {
                return Err(CRIError::InvalidParameter(format!(
                    "Region {} supplied more than once",
                    s.region()
                )));
            }
            annual.insert(s.region().to_string(), s);
        }
        let report = LoadReport {
            rows_read: annual.values().map(|s| s.len()).sum(),
            ..LoadReport::default()
        };
        Self::assemble(Vec::new(), annual, baseline, report)
    }

    fn assemble(
        monthly: Vec<MonthlyObservation>,
        annual: IndexMap<String, AnnualSeries>,
        baseline: YearWindow,
        report: LoadReport,
    ) -> CRIResult<Self> {
        if annual.values().all(|s| s.is_empty()) {
            return Err(CRIError::EmptyDataset);
        }
        let baselines = BaselineTable::build(annual.values(), baseline);
        log::info!(
            "Loaded {} regions ({} rows used, {} baselines)",
            annual.len(),
            report.rows_used(),
            baselines.len()
        );
        Ok(Self {
            monthly,
            annual,
            baselines,
            report,
        })
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.annual.keys().map(|k| k.as_str())
    }

    /// Annual series of a region.
    pub fn series(&self, region: &str) -> CRIResult<&AnnualSeries> {
        self.annual
            .get(region)
            .ok_or_else(|| CRIError::UnknownRegion(region.to_string()))
    }

    pub fn baselines(&self) -> &BaselineTable {
        &self.baselines
    }

    /// Baseline of a region, computed when the dataset was loaded.
    pub fn baseline(&self, region: &str) -> CRIResult<&Baseline> {
        let series = self.series(region)?;
        self.baselines.get(region).ok_or_else(|| {
            let window = self.baselines.window().unwrap_or(PRE_INDUSTRIAL);
            CRIError::MissingBaselineYears {
                region: series.region().to_string(),
                start: window.start,
                end: window.end,
            }
        })
    }

    /// Anomalies of a region relative to its baseline.
    pub fn anomalies(&self, region: &str) -> CRIResult<AnomalySeries> {
        let series = self.series(region)?;
        let baseline = self.baseline(region)?;
        AnomalySeries::from_series(series, baseline)
    }

    /// All monthly rows, in file order.
    pub fn monthly(&self) -> &[MonthlyObservation] {
        &self.monthly
    }

    /// Monthly rows of a single region.
    pub fn monthly_for<'a>(
        &'a self,
        region: &'a str,
    ) -> impl Iterator<Item = &'a MonthlyObservation> + 'a {
        self.monthly.iter().filter(move |m| m.region == region)
    }
}

fn aggregate_annual(
    rows: Vec<(String, Year, FloatValue)>,
) -> CRIResult<IndexMap<String, AnnualSeries>> {
    let mut grouped: IndexMap<String, BTreeMap<Year, (FloatValue, usize)>> = IndexMap::new();
    for (region, year, value) in rows {
        let entry = grouped
            .entry(region)
            .or_default()
            .entry(year)
            .or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    grouped
        .into_iter()
        .map(|(region, years)| {
            let series = AnnualSeries::from_pairs(
                region.clone(),
                years
                    .into_iter()
                    .map(|(year, (sum, count))| (year, sum / count as FloatValue)),
            )?;
            Ok((region, series))
        })
        .collect()
}

/// Give trailing rows without a parseable date the month following the last
/// valid date. Returns the number of rows that received a date.
fn fill_trailing_dates(rows: &mut [RawRow]) -> usize {
    let Some(last_valid) = rows.iter().rposition(|r| r.period.is_some()) else {
        return 0;
    };
    let Some(Period::Month(mut year, mut month)) = rows[last_valid].period else {
        return 0;
    };
    let mut filled = 0;
    for row in rows[last_valid + 1..].iter_mut() {
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
        row.period = Some(Period::Month(year, month));
        filled += 1;
    }
    filled
}

fn parse_month(raw: &str) -> Option<Period> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d"))
        .or_else(|_| {
            // Accept timestamps by looking at the date part only
            let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        })
        .ok()?;
    Some(Period::Month(date.year(), date.month()))
}

fn parse_year(raw: &str) -> Option<Year> {
    raw.parse::<Year>().ok().or_else(|| {
        raw.parse::<FloatValue>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as Year)
    })
}

fn parse_value(raw: &str) -> Option<FloatValue> {
    if raw.is_empty() {
        return None;
    }
    raw.parse::<FloatValue>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONTHLY: &str = "\
dt,LandAverageTemperature,LandAndOceanAverageTemperature
1850-01-01,0.7,12.8
1850-02-01,3.0,13.6
1851-01-01,1.0,13.0
1851-02-01,,
not-a-date,1.0,14.0
1852-01,2.0,14.2
";

    #[test]
    fn monthly_rows_are_averaged_per_year() {
        let dataset =
            ClimateDataset::from_reader(MONTHLY.as_bytes(), &LoaderOptions::default()).unwrap();

        let report = dataset.report();
        assert_eq!(report.rows_read, 6);
        assert_eq!(report.rows_dropped_date, 1);
        assert_eq!(report.rows_dropped_value, 1);
        assert_eq!(report.rows_used(), 4);

        let series = dataset.series(GLOBAL_REGION).unwrap();
        assert_eq!(series.years().to_vec(), vec![1850, 1851, 1852]);
        assert!((series.value_at(1850).unwrap() - 13.2).abs() < 1e-12);
        assert_eq!(series.value_at(1851), Some(13.0));
        assert_eq!(series.value_at(1852), Some(14.2));
        assert_eq!(dataset.monthly().len(), 4);
    }

    #[test]
    fn trailing_dates_can_be_filled() {
        let csv = "dt,LandAndOceanAverageTemperature\n1900-11-01,1.0\n1900-12-01,2.0\n,3.0\nbad,4.0\n";
        let options = LoaderOptions {
            fill_trailing_dates: true,
            ..LoaderOptions::default()
        };
        let dataset = ClimateDataset::from_reader(csv.as_bytes(), &options).unwrap();
        assert_eq!(dataset.report().dates_filled, 2);
        let months: Vec<(Year, u32)> = dataset.monthly().iter().map(|m| (m.year, m.month)).collect();
        assert_eq!(months, vec![(1900, 11), (1900, 12), (1901, 1), (1901, 2)]);
    }

    #[test]
    fn regional_annual_table() {
        let csv = "\
region,year,temp
Europe,1851,9.0
Arctic,1850,-10.0
Europe,1850,8.0
Europe,1850,10.0
";
        let options = LoaderOptions {
            value_column: "temp".to_string(),
            ..LoaderOptions::default()
        };
        let dataset = ClimateDataset::from_reader(csv.as_bytes(), &options).unwrap();
        let regions: Vec<&str> = dataset.regions().collect();
        assert_eq!(regions, vec!["Europe", "Arctic"]);

        let europe = dataset.series("Europe").unwrap();
        assert_eq!(europe.years().to_vec(), vec![1850, 1851]);
        assert_eq!(europe.value_at(1850), Some(9.0));
        assert!(dataset.monthly().is_empty());

        assert_eq!(dataset.baseline("Europe").unwrap().value(), 9.0);
        assert!(matches!(
            dataset.series("Atlantis"),
            Err(CRIError::UnknownRegion(_))
        ));
    }

    #[test]
    fn missing_columns_are_reported() {
        let csv = "dt,other\n1850-01-01,1.0\n";
        let result = ClimateDataset::from_reader(csv.as_bytes(), &LoaderOptions::default());
        assert!(matches!(result, Err(CRIError::MissingColumn(c)) if c == "LandAndOceanAverageTemperature"));

        let csv = "when,LandAndOceanAverageTemperature\n1850-01-01,1.0\n";
        let result = ClimateDataset::from_reader(csv.as_bytes(), &LoaderOptions::default());
        assert!(matches!(result, Err(CRIError::MissingColumn(_))));
    }

    #[test]
    fn empty_dataset() {
        let csv = "dt,LandAndOceanAverageTemperature\nbad,1.0\n";
        let result = ClimateDataset::from_reader(csv.as_bytes(), &LoaderOptions::default());
        assert!(matches!(result, Err(CRIError::EmptyDataset)));
    }

    #[test]
    fn missing_baseline_surfaces_on_anomaly_request() {
        let csv = "year,LandAndOceanAverageTemperature\n1950,1.0\n1951,1.2\n";
        let dataset = ClimateDataset::from_reader(csv.as_bytes(), &LoaderOptions::default()).unwrap();
        assert!(matches!(
            dataset.anomalies(GLOBAL_REGION),
            Err(CRIError::MissingBaselineYears { .. })
        ));
    }
}
