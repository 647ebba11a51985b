use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("Cannot build a spatial index over an empty grid")]
    EmptyIndex,

    #[error("Grid point {position} has a non-finite coordinate ({latitude}, {longitude})")]
    InvalidCoordinate {
        position: usize,
        latitude: f64,
        longitude: f64,
    },

    #[error("Grid point {position} is missing its {field}")]
    MissingCoordinate { position: usize, field: String },

    #[error("Query coordinate ({latitude}, {longitude}) is not finite")]
    InvalidQuery { latitude: f64, longitude: f64 },

    #[error("Grid metadata has no usable '{column}' column")]
    MetaColumn {
        column: String,
        #[source]
        source: PolarsError,
    },

    #[error("Failed to build grid metadata frame: {0}")]
    Frame(#[from] PolarsError),
}
