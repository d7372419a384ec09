use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Region '{region}' is missing from the initial snapshot")]
    MissingRegion { region: String },

    #[error("Region '{region}' is not in the population registry")]
    UnknownRegion { region: String },

    #[error("Day index {index} out of range: series has {len} days")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Region set mismatch: expected {expected} regions, got {actual}")]
    RegionMismatch { expected: usize, actual: usize },

    #[error("Region '{region}' appears more than once")]
    DuplicateRegion { region: String },

    #[error("Invalid population '{value}' for region '{region}'")]
    InvalidPopulation { region: String, value: String },

    #[error("Run '{run_id}' not found")]
    RunNotFound { run_id: String },

    #[error("Stored run '{run_id}' is inconsistent: {reason}")]
    CorruptRun { run_id: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ProjectionResult<T> = Result<T, ProjectionError>;
