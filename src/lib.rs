//! Fetch solar irradiance and meteorological time series from the National Solar Radiation
//! Database (NSRDB) for the grid cell nearest to any coordinate.

mod dataset;
mod error;
mod grid;
mod nsrdb;
mod timeseries;
mod types;
mod utils;

pub use error::NsrdbError;
pub use nsrdb::*;

pub use dataset::config::{
    HsdsConfig, DEFAULT_ENDPOINT, DEFAULT_META_PAGE_ROWS, DEFAULT_PATH_TEMPLATE,
};
pub use dataset::error::{ConfigError, DatasetError, TransportError};
pub use dataset::hsds::{HsdsHandle, HsdsSource};
pub use dataset::memory::{MemoryDataset, MemoryHandle, MemorySource, MemoryVariable};
pub use dataset::source::{DatasetHandle, DatasetSource, META_DATASET, TIME_INDEX_DATASET};

pub use grid::error::GridError;
pub use grid::grid_point::{haversine_angle, Grid, GridPoint, RadianPoint};
pub use grid::spatial_index::{GridMatch, SpatialIndex};

pub use timeseries::builder::{
    build_timeseries, Timeseries, TimeseriesRequest, DEFAULT_VARIABLES, DEFAULT_YEAR,
};
pub use timeseries::column_reader::{read_column, SCALE_FACTOR_ATTRIBUTE};
pub use timeseries::time_index::{decode_time_index, parse_timestamp};
pub use timeseries::yearly::{assemble_year, YearTable, TIME_INDEX_COLUMN};

pub use types::location::{LatLon, Year};
