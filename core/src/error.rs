use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No data for region: {region}")]
    RegionNotFound { region: String },

    #[error("Duplicate record for {district} ({state}) in {month}")]
    DuplicateRecord {
        state:    String,
        district: String,
        month:    NaiveDate,
    },

    #[error("Snapshot is empty")]
    EmptySnapshot,

    #[error("Unknown metric '{name}'")]
    UnknownMetric { name: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
