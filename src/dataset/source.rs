//! The read interface the timeseries assembly needs from a year-keyed dataset store.
//!
//! A [`DatasetSource`] opens one dataset per year; the resulting [`DatasetHandle`] exposes the
//! three kinds of named fields an NSRDB file carries: the `meta` table of grid sites, the
//! `time_index` of encoded timestamps, and the two-dimensional `[time_step, grid_position]`
//! variable arrays with their attributes.

use crate::dataset::error::DatasetError;
use crate::types::location::Year;
use polars::prelude::DataFrame;

/// Name of the per-site metadata table.
pub const META_DATASET: &str = "meta";
/// Name of the array of encoded timestamps.
pub const TIME_INDEX_DATASET: &str = "time_index";

/// Opens year-keyed datasets.
pub trait DatasetSource {
    type Handle: DatasetHandle;

    /// Opens the dataset holding `year`. The handle is released when dropped.
    fn open(&self, year: Year) -> Result<Self::Handle, DatasetError>;
}

/// An open dataset for a single year.
pub trait DatasetHandle {
    /// The year this dataset holds.
    fn year(&self) -> Year;

    /// The per-site metadata table, one row per grid position, in position order.
    /// It contains at least `latitude` and `longitude` columns.
    fn meta(&self) -> Result<DataFrame, DatasetError>;

    /// One encoded timestamp per time step.
    fn time_index(&self) -> Result<Vec<String>, DatasetError>;

    /// Raw stored values of `variable` at grid `position`, one per time step.
    ///
    /// Fails with [`DatasetError::MissingVariable`] when the variable does not exist.
    fn values(&self, variable: &str, position: usize) -> Result<Vec<f64>, DatasetError>;

    /// A scalar numeric attribute of `variable`, or `None` when the variable has no
    /// attribute called `name`.
    ///
    /// Fails with [`DatasetError::MissingVariable`] when the variable does not exist.
    fn attribute(&self, variable: &str, name: &str) -> Result<Option<f64>, DatasetError>;
}
