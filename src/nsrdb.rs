//! This module provides the main entry point: a client that fetches NSRDB time series for a
//! geographical coordinate from one or more yearly datasets.

use crate::dataset::config::HsdsConfig;
use crate::dataset::hsds::HsdsSource;
use crate::dataset::source::DatasetSource;
use crate::error::NsrdbError;
use crate::grid::grid_point::Grid;
use crate::timeseries::builder::{build_timeseries, Timeseries, TimeseriesRequest};
use crate::types::location::{LatLon, Year};
use bon::bon;

/// The main client struct for reading NSRDB data.
///
/// By default it talks to the NREL HSDS service; [`Nsrdb::with_source`] accepts any other
/// [`DatasetSource`], such as a [`crate::MemorySource`].
///
/// All reads are blocking and happen one after another: one dataset open per year and one
/// request per variable.
///
/// # Examples
///
/// ```no_run
/// # use nsrdb::{Nsrdb, NsrdbError};
/// # fn run() -> Result<(), NsrdbError> {
/// // Picks up ~/.hscfg and the HS_* environment variables.
/// let client = Nsrdb::new()?;
/// # Ok(())
/// # }
/// ```
pub struct Nsrdb<S = HsdsSource> {
    source: S,
}

impl Nsrdb<HsdsSource> {
    /// Creates a client for the HSDS service configured by [`HsdsConfig::load`].
    ///
    /// # Errors
    ///
    /// Returns [`NsrdbError::Config`] if `~/.hscfg` exists but cannot be read or parsed.
    pub fn new() -> Result<Self, NsrdbError> {
        Ok(Self::with_config(HsdsConfig::load()?))
    }

    /// Creates a client for an explicitly configured HSDS service.
    pub fn with_config(config: HsdsConfig) -> Self {
        Self::with_source(HsdsSource::new(config))
    }
}

#[bon]
impl<S: DatasetSource> Nsrdb<S> {
    /// Creates a client reading from any [`DatasetSource`].
    pub fn with_source(source: S) -> Self {
        Self { source }
    }

    /// The dataset source this client reads from.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches the time series of the grid cell nearest to a location.
    ///
    /// The location is matched against the grid of the first requested year using
    /// great-circle distance. That grid position is then read from every requested year,
    /// and the yearly tables are stacked in the order the years were given.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `location` (LatLon): **Required.** The coordinate, in degrees, passed to `timeseries()`.
    /// * `.years(&[Year])`: Optional. Years to read, in output order. Defaults to
    ///   [`crate::DEFAULT_YEAR`].
    /// * `.variables(&[&str])`: Optional. Variables to read. Defaults to
    ///   [`crate::DEFAULT_VARIABLES`].
    /// * `.verify_grid(bool)`: Optional. Check that later years share the first year's grid.
    ///   Defaults to `false`, in which case the first year's grid is trusted for all years.
    ///
    /// # Returns
    ///
    /// The first year's [`Grid`] and the assembled [`Timeseries`].
    ///
    /// # Errors
    ///
    /// Any failure for any year aborts the whole request; there are no partial results.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use nsrdb::{LatLon, Nsrdb, NsrdbError, Year};
    /// # fn run() -> Result<(), NsrdbError> {
    /// let client = Nsrdb::new()?;
    /// let (grid, series) = client
    ///     .timeseries(LatLon(39.74, -105.17))
    ///     .years(&[Year(2018), Year(2019)])
    ///     .variables(&["ghi", "dni", "air_temperature"])
    ///     .call()?;
    /// println!("{} sites, nearest is {:?}", grid.len(), series.site);
    /// println!("{}", series.frame);
    /// # Ok(())
    /// # }
    /// ```
    #[builder(start_fn = timeseries)]
    #[doc(hidden)]
    pub fn fetch_timeseries(
        &self,
        #[builder(start_fn)] location: LatLon,
        years: Option<&[Year]>,
        variables: Option<&[&str]>,
        verify_grid: Option<bool>,
    ) -> Result<(Grid, Timeseries), NsrdbError> {
        let request = TimeseriesRequest {
            location,
            years: years.map(<[Year]>::to_vec).unwrap_or_default(),
            variables: variables
                .unwrap_or_default()
                .iter()
                .map(|v| v.to_string())
                .collect(),
            verify_grid: verify_grid.unwrap_or(false),
        };
        build_timeseries(&self.source, &request)
    }
}
