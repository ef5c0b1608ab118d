use thiserror::Error;

/// Error type for the interpretation pipeline.
///
/// Most variants describe data-quality problems. Callers that present results
/// to a user are expected to surface these as warnings rather than abort.
#[derive(Error, Debug)]
pub enum CRIError {
    #[error("{0}")]
    Error(String),
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("Required column '{0}' is missing from the dataset header")]
    MissingColumn(String),
    #[error("Dataset contains no usable observations")]
    EmptyDataset,
    #[error("Years must be strictly increasing within a series. Region={region}, year {year} follows {previous}")]
    UnorderedYears {
        region: String,
        previous: i32,
        year: i32,
    },
    #[error("Series for region {region} has {years} years but {values} values")]
    LengthMismatch {
        region: String,
        years: usize,
        values: usize,
    },
    #[error("No observations for region {region} fall inside the baseline window {start}-{end}")]
    MissingBaselineYears { region: String, start: i32, end: i32 },
    #[error("Insufficient samples for {operation}: need at least {required}, got {actual}")]
    InsufficientSamples {
        operation: String,
        required: usize,
        actual: usize,
    },
    #[error("Cannot fit a trend when all x values are identical ({0})")]
    DegenerateFit(f64),
    #[error("Unknown region '{0}'")]
    UnknownRegion(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Convenience type for `Result<T, CRIError>`.
pub type CRIResult<T> = Result<T, CRIError>;

impl CRIError {
    pub(crate) fn insufficient(operation: &str, required: usize, actual: usize) -> Self {
        CRIError::InsufficientSamples {
            operation: operation.to_string(),
            required,
            actual,
        }
    }

    /// Whether the error describes a data-quality problem in the input
    /// rather than a malformed request or an unreadable file.
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            CRIError::MissingBaselineYears { .. }
                | CRIError::InsufficientSamples { .. }
                | CRIError::DegenerateFit(_)
                | CRIError::UnknownRegion(_)
                | CRIError::EmptyDataset
        )
    }
}
