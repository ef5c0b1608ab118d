//! Statistics pipeline behind the Climate Risk Interpreter.
//!
//! Loads long-term temperature records, expresses them as anomalies against a
//! pre-industrial baseline and estimates trends, change-points and
//! uncertainty bands.

pub mod baseline;
pub mod bootstrap;
pub mod changepoint;
pub mod correction;
pub mod dataset;
pub mod scenario;
pub mod stats;
pub mod summary;
pub mod timeseries;
pub mod trend;

pub mod errors;

pub use baseline::{AnomalySeries, Baseline, PRE_INDUSTRIAL};
pub use dataset::{ClimateDataset, LoaderOptions};
pub use errors::{CRIError, CRIResult};
pub use timeseries::{AnnualSeries, FloatValue, Year, YearWindow, GLOBAL_REGION};
