use crate::types::location::Year;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the remote dataset service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse JSON response from {url}")]
    JsonParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected response for {resource}: {message}")]
    UnexpectedResponse { resource: String, message: String },
}

impl TransportError {
    /// The HTTP status the server answered with, if the request got that far.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            TransportError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(reqwest::StatusCode::NOT_FOUND)
    }
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to open dataset '{path}' for year {year}")]
    Open {
        year: Year,
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("Dataset '{path}' for year {year} does not exist")]
    NotFound { year: Year, path: String },

    #[error("Failed to read '{name}' from the {year} dataset")]
    Read {
        year: Year,
        name: String,
        #[source]
        source: TransportError,
    },

    #[error("Variable '{variable}' does not exist in the {year} dataset")]
    MissingVariable { year: Year, variable: String },

    #[error("Variable '{variable}' in the {year} dataset has no scale factor attribute")]
    MissingScaleFactor { year: Year, variable: String },

    #[error("Variable '{variable}' in the {year} dataset has an unusable scale factor {value}")]
    InvalidScaleFactor {
        year: Year,
        variable: String,
        value: f64,
    },

    #[error("Grid position {position} is out of bounds for '{variable}' in the {year} dataset ({sites} sites)")]
    PositionOutOfBounds {
        year: Year,
        variable: String,
        position: usize,
        sites: usize,
    },

    #[error("Meta table of the {year} dataset has no '{field}' field")]
    MissingMetaField { year: Year, field: String },

    #[error("Failed to build the meta table of the {year} dataset")]
    Meta {
        year: Year,
        #[source]
        source: PolarsError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Malformed line {line} in config file '{path}'")]
    Parse { path: PathBuf, line: usize },
}
