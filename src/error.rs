use crate::dataset::error::{ConfigError, DatasetError};
use crate::grid::error::GridError;
use crate::types::location::Year;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NsrdbError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to decode time index entry {position} ('{value}') of the {year} dataset")]
    Decode {
        year: Year,
        position: usize,
        value: String,
    },

    #[error("Variable '{variable}' of the {year} dataset has {found} values but the time index has {expected}")]
    ShapeMismatch {
        year: Year,
        variable: String,
        expected: usize,
        found: usize,
    },

    #[error("Grid of the {year} dataset differs from the grid of the {reference} dataset")]
    GridMismatch { year: Year, reference: Year },

    #[error("Failed processing DataFrame: {0}")]
    Frame(#[from] PolarsError),
}
