//! Assembles a multi-year timeseries for the grid cell nearest to a coordinate.

use crate::dataset::source::{DatasetHandle, DatasetSource};
use crate::error::NsrdbError;
use crate::grid::grid_point::Grid;
use crate::grid::spatial_index::{GridMatch, SpatialIndex};
use crate::timeseries::yearly::{assemble_year, TIME_INDEX_COLUMN};
use crate::types::location::{LatLon, Year};
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use polars::prelude::{col, lit, DataFrame, IntoLazy, LazyFrame};

/// Variables read when a request names none.
pub const DEFAULT_VARIABLES: [&str; 2] = ["ghi", "air_temperature"];
/// Year read when a request names none.
pub const DEFAULT_YEAR: Year = Year(2020);

/// What to fetch.
///
/// Empty `years` or `variables` fall back to [`DEFAULT_YEAR`] and [`DEFAULT_VARIABLES`].
/// Years are read, and their rows appended, in the order given here.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesRequest {
    pub location: LatLon,
    pub years: Vec<Year>,
    pub variables: Vec<String>,
    /// Compare every later year's grid against the first year's and fail on a difference.
    /// When off, the first year's grid is trusted for all years and later metadata is
    /// never read.
    pub verify_grid: bool,
}

impl TimeseriesRequest {
    /// A request for `location` with default years and variables.
    pub fn new(location: LatLon) -> Self {
        Self {
            location,
            years: Vec::new(),
            variables: Vec::new(),
            verify_grid: false,
        }
    }

    /// The years to read, defaults applied.
    pub fn resolved_years(&self) -> Vec<Year> {
        if self.years.is_empty() {
            vec![DEFAULT_YEAR]
        } else {
            self.years.clone()
        }
    }

    /// The variables to read, defaults applied and repeated names collapsed to their first
    /// occurrence.
    pub fn resolved_variables(&self) -> Vec<String> {
        if self.variables.is_empty() {
            return DEFAULT_VARIABLES.iter().map(|v| v.to_string()).collect();
        }
        let mut resolved: Vec<String> = Vec::with_capacity(self.variables.len());
        for variable in &self.variables {
            if resolved.contains(variable) {
                warn!("Variable '{}' requested more than once, reading it once", variable);
            } else {
                resolved.push(variable.clone());
            }
        }
        resolved
    }
}

/// The assembled rows for one grid site across all requested years.
#[derive(Debug, Clone)]
pub struct Timeseries {
    /// The grid site the request resolved to.
    pub site: GridMatch,
    /// Years in the order their rows appear in `frame`.
    pub years: Vec<Year>,
    /// `time_index` followed by one column per variable. Rows are in year request order,
    /// not sorted by time.
    pub frame: DataFrame,
}

impl Timeseries {
    /// Number of rows across all years.
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// A lazy view over a copy of the frame.
    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    /// Rows whose timestamp lies within `start..=end`.
    pub fn between(&self, start: NaiveDateTime, end: NaiveDateTime) -> LazyFrame {
        self.lazy().filter(
            col(TIME_INDEX_COLUMN)
                .gt_eq(lit(start))
                .and(col(TIME_INDEX_COLUMN).lt_eq(lit(end))),
        )
    }
}

/// Resolves the request's coordinate to a grid position using the first year's grid, then
/// reads every year at that position and stacks the yearly tables in request order.
///
/// Returns the first year's grid alongside the timeseries. Any failure aborts the whole
/// build.
pub fn build_timeseries<S>(
    source: &S,
    request: &TimeseriesRequest,
) -> Result<(Grid, Timeseries), NsrdbError>
where
    S: DatasetSource + ?Sized,
{
    let years = request.resolved_years();
    let variables = request.resolved_variables();
    let (first_year, later_years) = match years.split_first() {
        Some((first, rest)) => (*first, rest),
        None => (DEFAULT_YEAR, &[][..]),
    };
    let LatLon(latitude, longitude) = request.location;

    let (grid, site, mut frame) = {
        let handle = source.open(first_year)?;
        let grid = Grid::from_meta(handle.meta()?)?;
        let site = SpatialIndex::from_grid(&grid)?.nearest_match(latitude, longitude)?;
        info!(
            "Resolved ({}, {}) to grid position {} at ({:.4}, {:.4}), {:.2} km away",
            latitude, longitude, site.position, site.latitude, site.longitude, site.distance_km
        );

        let table = assemble_year(&handle, &variables, site.position)?;
        debug!("Read {} rows for {}", table.len(), first_year);
        (grid, site, table.into_frame())
    };

    for &year in later_years {
        let handle = source.open(year)?;
        if request.verify_grid {
            let year_grid = Grid::from_meta(handle.meta()?)?;
            if !grid.same_coordinates(&year_grid) {
                return Err(NsrdbError::GridMismatch {
                    year,
                    reference: first_year,
                });
            }
        }

        let table = assemble_year(&handle, &variables, site.position)?;
        frame.vstack_mut(table.frame())?;
        debug!(
            "Read {} rows for {} ({} total)",
            table.len(),
            year,
            frame.height()
        );
    }
    frame.align_chunks_par();

    Ok((
        grid,
        Timeseries {
            site,
            years,
            frame,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::error::DatasetError;
    use crate::dataset::memory::{MemoryDataset, MemoryHandle, MemorySource, MemoryVariable};
    use crate::grid::error::GridError;
    use crate::timeseries::column_reader::SCALE_FACTOR_ATTRIBUTE;
    use crate::timeseries::yearly::{assemble_year, YearTable};
    use chrono::NaiveDate;
    use polars::prelude::Column;
    use std::cell::RefCell;
    use std::rc::Rc;

    const SITES: usize = 10;

    fn meta(latitudes: Vec<f64>) -> DataFrame {
        let longitudes = vec![-150.0; latitudes.len()];
        DataFrame::new(vec![
            Column::new("latitude".into(), latitudes),
            Column::new("longitude".into(), longitudes),
        ])
        .unwrap()
    }

    fn spaced_latitudes() -> Vec<f64> {
        (0..SITES).map(|i| 35.0 + 10.0 * i as f64 / 9.0).collect()
    }

    // Raw values encode year, time step and site so every cell is distinguishable.
    fn rows(year: i32, steps: usize, offset: f64) -> Vec<Vec<f64>> {
        (0..steps)
            .map(|t| {
                (0..SITES)
                    .map(|site| (year % 100) as f64 * 10_000.0 + t as f64 * 100.0 + site as f64 + offset)
                    .collect()
            })
            .collect()
    }

    fn dataset_with_grid(year: i32, steps: usize, latitudes: Vec<f64>) -> MemoryDataset {
        let time_index = (0..steps)
            .map(|h| format!("{}-01-01 {:02}:00:00+00:00", year, h))
            .collect();
        MemoryDataset::new(year, meta(latitudes), time_index)
            .with_variable(
                "ghi",
                MemoryVariable::new(rows(year, steps, 0.0)).with_attribute(SCALE_FACTOR_ATTRIBUTE, 1.0),
            )
            .with_variable(
                "air_temperature",
                MemoryVariable::new(rows(year, steps, 0.5)).with_attribute(SCALE_FACTOR_ATTRIBUTE, 10.0),
            )
    }

    fn dataset(year: i32, steps: usize) -> MemoryDataset {
        dataset_with_grid(year, steps, spaced_latitudes())
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_dataset(dataset(2018, 3))
            .with_dataset(dataset(2019, 4))
            .with_dataset(dataset(2020, 2))
    }

    fn request(years: &[i32], variables: &[&str]) -> TimeseriesRequest {
        TimeseriesRequest {
            location: LatLon(40.5, -150.0),
            years: years.iter().copied().map(Year).collect(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            verify_grid: false,
        }
    }

    fn standalone(source: &MemorySource, year: i32, variables: &[&str], position: usize) -> YearTable {
        let handle = source.open(Year(year)).unwrap();
        let variables: Vec<String> = variables.iter().map(|v| v.to_string()).collect();
        assemble_year(&handle, &variables, position).unwrap()
    }

    #[test]
    fn test_single_year_equals_standalone_table() {
        let source = source();
        let (grid, series) = build_timeseries(&source, &request(&[2018], &["ghi"])).unwrap();

        assert_eq!(grid.len(), SITES);
        assert_eq!(series.site.position, 5);
        assert_eq!(series.years, vec![Year(2018)]);
        let expected = standalone(&source, 2018, &["ghi"], 5);
        assert!(series.frame.equals(expected.frame()));
    }

    #[test]
    fn test_two_years_are_stacked() {
        let source = source();
        let (_, series) =
            build_timeseries(&source, &request(&[2018, 2019], &["ghi", "air_temperature"])).unwrap();

        let first = standalone(&source, 2018, &["ghi", "air_temperature"], 5);
        let second = standalone(&source, 2019, &["ghi", "air_temperature"], 5);
        assert_eq!(series.len(), first.len() + second.len());
        assert!(series.frame.head(Some(first.len())).equals(first.frame()));
        assert!(series
            .frame
            .slice(first.len() as i64, second.len())
            .equals(second.frame()));
        for column in series.frame.get_columns() {
            assert_eq!(
                column.as_materialized_series().n_chunks(),
                1,
                "column {}",
                column.name()
            );
        }
    }

    #[test]
    fn test_rows_follow_request_order() {
        let (_, series) = build_timeseries(&source(), &request(&[2019, 2018], &["ghi"])).unwrap();
        let ghi: Vec<Option<f64>> = series
            .frame
            .column("ghi")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        // 2019 rows (4 steps) come before the 2018 rows (3 steps).
        assert_eq!(
            ghi,
            [190_005.0, 190_105.0, 190_205.0, 190_305.0, 180_005.0, 180_105.0, 180_205.0]
                .map(Some)
                .to_vec()
        );
    }

    #[test]
    fn test_values_are_scaled() {
        let (_, series) =
            build_timeseries(&source(), &request(&[2020], &["air_temperature"])).unwrap();
        let temperature: Vec<Option<f64>> = series
            .frame
            .column("air_temperature")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(temperature, vec![Some(20_000.55), Some(20_010.55)]);
    }

    #[test]
    fn test_defaults() {
        let (_, series) = build_timeseries(&source(), &request(&[], &[])).unwrap();
        assert_eq!(series.years, vec![DEFAULT_YEAR]);
        assert_eq!(
            series.frame.get_column_names(),
            ["time_index", "ghi", "air_temperature"]
        );
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_repeated_variables_read_once() {
        let (_, series) =
            build_timeseries(&source(), &request(&[2018], &["ghi", "ghi", "air_temperature"]))
                .unwrap();
        assert_eq!(
            series.frame.get_column_names(),
            ["time_index", "ghi", "air_temperature"]
        );
    }

    #[test]
    fn test_missing_year_aborts() {
        let err = build_timeseries(&source(), &request(&[2018, 2017], &["ghi"])).unwrap_err();
        assert!(matches!(
            err,
            NsrdbError::Dataset(DatasetError::NotFound { year: Year(2017), .. })
        ));
    }

    #[test]
    fn test_missing_variable_in_later_year_aborts() {
        let time_index = vec!["2021-01-01 00:00:00+00:00".to_string()];
        let source = source().with_dataset(MemoryDataset::new(2021, meta(spaced_latitudes()), time_index));
        let err = build_timeseries(&source, &request(&[2018, 2021], &["ghi"])).unwrap_err();
        assert!(matches!(
            err,
            NsrdbError::Dataset(DatasetError::MissingVariable { year: Year(2021), .. })
        ));
    }

    #[test]
    fn test_empty_grid() {
        let source = MemorySource::new().with_dataset(MemoryDataset::new(2020, meta(vec![]), vec![]));
        let err = build_timeseries(&source, &request(&[2020], &["ghi"])).unwrap_err();
        assert!(matches!(err, NsrdbError::Grid(GridError::EmptyIndex)));
    }

    #[test]
    fn test_later_grid_is_trusted_by_default() {
        let shifted: Vec<f64> = spaced_latitudes().into_iter().map(|lat| lat + 1.0).collect();
        let source = source().with_dataset(dataset_with_grid(2021, 2, shifted));

        let (grid, series) = build_timeseries(&source, &request(&[2018, 2021], &["ghi"])).unwrap();
        assert_eq!(series.site.position, 5);
        assert_eq!(series.len(), 5);
        assert_eq!(grid.points()[0].latitude, 35.0);

        let mut verified = request(&[2018, 2021], &["ghi"]);
        verified.verify_grid = true;
        let err = build_timeseries(&source, &verified).unwrap_err();
        assert!(matches!(
            err,
            NsrdbError::GridMismatch {
                year: Year(2021),
                reference: Year(2018)
            }
        ));
    }

    #[test]
    fn test_between_filters_rows() {
        let (_, series) = build_timeseries(&source(), &request(&[2019], &["ghi"])).unwrap();
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap().and_hms_opt(1, 0, 0).unwrap();
        let end = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap().and_hms_opt(2, 0, 0).unwrap();
        let filtered = series.between(start, end).collect().unwrap();
        assert_eq!(filtered.height(), 2);
    }

    type AccessLog = Rc<RefCell<Vec<(Year, &'static str)>>>;

    struct RecordingSource {
        inner: MemorySource,
        log: AccessLog,
    }

    struct RecordingHandle {
        inner: MemoryHandle,
        log: AccessLog,
    }

    impl DatasetSource for RecordingSource {
        type Handle = RecordingHandle;

        fn open(&self, year: Year) -> Result<RecordingHandle, DatasetError> {
            self.log.borrow_mut().push((year, "open"));
            Ok(RecordingHandle {
                inner: self.inner.open(year)?,
                log: Rc::clone(&self.log),
            })
        }
    }

    impl DatasetHandle for RecordingHandle {
        fn year(&self) -> Year {
            self.inner.year()
        }

        fn meta(&self) -> Result<DataFrame, DatasetError> {
            self.log.borrow_mut().push((self.year(), "meta"));
            self.inner.meta()
        }

        fn time_index(&self) -> Result<Vec<String>, DatasetError> {
            self.inner.time_index()
        }

        fn values(&self, variable: &str, position: usize) -> Result<Vec<f64>, DatasetError> {
            self.inner.values(variable, position)
        }

        fn attribute(&self, variable: &str, name: &str) -> Result<Option<f64>, DatasetError> {
            self.inner.attribute(variable, name)
        }
    }

    #[test]
    fn test_meta_read_once_for_first_year() {
        let log = AccessLog::default();
        let source = RecordingSource {
            inner: source(),
            log: Rc::clone(&log),
        };
        build_timeseries(&source, &request(&[2020, 2018, 2019], &["ghi"])).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                (Year(2020), "open"),
                (Year(2020), "meta"),
                (Year(2018), "open"),
                (Year(2019), "open"),
            ]
        );
    }
}
