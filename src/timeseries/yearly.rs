use crate::dataset::source::DatasetHandle;
use crate::error::NsrdbError;
use crate::timeseries::column_reader::read_column;
use crate::timeseries::time_index::decode_time_index;
use crate::types::location::Year;
use chrono::NaiveDateTime;
use polars::prelude::{Column, DataFrame, DatetimeChunked, IntoSeries, TimeUnit};

/// Name of the timestamp column leading every table.
pub const TIME_INDEX_COLUMN: &str = "time_index";

/// One year of values for a single grid position.
///
/// The frame holds a `time_index` datetime column followed by one `f64` column per requested
/// variable, in request order. All columns have exactly one entry per time step.
#[derive(Debug, Clone)]
pub struct YearTable {
    year: Year,
    frame: DataFrame,
}

impl YearTable {
    /// The dataset year the rows come from.
    pub fn year(&self) -> Year {
        self.year
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

/// Builds the [`YearTable`] for the handle's year at `position`.
///
/// Fails on the first variable that cannot be read; no partial table is returned.
pub fn assemble_year<H>(
    handle: &H,
    variables: &[String],
    position: usize,
) -> Result<YearTable, NsrdbError>
where
    H: DatasetHandle + ?Sized,
{
    let year = handle.year();
    let time_index = decode_time_index(year, &handle.time_index()?)?;

    let mut columns = Vec::with_capacity(variables.len() + 1);
    columns.push(time_column(&time_index));

    for variable in variables {
        let values = read_column(handle, variable, position)?;
        if values.len() != time_index.len() {
            return Err(NsrdbError::ShapeMismatch {
                year,
                variable: variable.clone(),
                expected: time_index.len(),
                found: values.len(),
            });
        }
        columns.push(Column::new(variable.as_str().into(), values));
    }

    Ok(YearTable {
        year,
        frame: DataFrame::new(columns)?,
    })
}

fn time_column(time_index: &[NaiveDateTime]) -> Column {
    DatetimeChunked::from_naive_datetime(
        TIME_INDEX_COLUMN.into(),
        time_index.iter().copied(),
        TimeUnit::Milliseconds,
    )
    .into_series()
    .into()
}
