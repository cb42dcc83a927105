use std::path::PathBuf;

pub type AnalysisResult<T> = Result<T, AnalysisError>;
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("No results.csv or results.json found at {0}")]
    MissingInput(PathBuf),
    #[error("Unsupported input file {0}, expected a .csv or .json file")]
    UnsupportedInput(PathBuf),
    #[error("No usable test results in {0}")]
    EmptyDataset(String),
    #[error("Malformed field {field} = {value:?} in test {test_id}")]
    MalformedField {
        test_id: u64,
        field: &'static str,
        value: String,
    },
    #[error("Chart error: {0}")]
    ChartError(String),
}
