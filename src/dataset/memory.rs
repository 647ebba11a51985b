//! A dataset source kept entirely in memory.
//!
//! Useful when the data has already been fetched by other means, and for exercising the
//! timeseries assembly without network access.

use crate::dataset::error::DatasetError;
use crate::dataset::source::{DatasetHandle, DatasetSource};
use crate::types::location::Year;
use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::sync::Arc;

/// A stored variable: raw values laid out as `rows[time_step][grid_position]`, plus its
/// numeric attributes.
#[derive(Debug, Clone, Default)]
pub struct MemoryVariable {
    rows: Vec<Vec<f64>>,
    attributes: HashMap<String, f64>,
}

impl MemoryVariable {
    /// A variable with raw values laid out as `rows[time_step][grid_position]`.
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self {
            rows,
            attributes: HashMap::new(),
        }
    }

    /// Adds or replaces a numeric attribute, such as the scale factor.
    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    fn sites(&self) -> usize {
        self.rows.iter().map(Vec::len).min().unwrap_or(0)
    }
}

/// One year of data.
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    year: Year,
    meta: DataFrame,
    time_index: Vec<String>,
    variables: HashMap<String, MemoryVariable>,
}

impl MemoryDataset {
    /// A dataset with no variables yet.
    pub fn new(year: impl Into<Year>, meta: DataFrame, time_index: Vec<String>) -> Self {
        Self {
            year: year.into(),
            meta,
            time_index,
            variables: HashMap::new(),
        }
    }

    /// Adds or replaces a variable.
    pub fn with_variable(mut self, name: impl Into<String>, variable: MemoryVariable) -> Self {
        self.variables.insert(name.into(), variable);
        self
    }

    fn variable(&self, name: &str) -> Result<&MemoryVariable, DatasetError> {
        self.variables
            .get(name)
            .ok_or_else(|| DatasetError::MissingVariable {
                year: self.year,
                variable: name.to_string(),
            })
    }
}

/// Handle to a [`MemoryDataset`] held by a [`MemorySource`].
#[derive(Debug, Clone)]
pub struct MemoryHandle(Arc<MemoryDataset>);

impl DatasetHandle for MemoryHandle {
    fn year(&self) -> Year {
        self.0.year
    }

    fn meta(&self) -> Result<DataFrame, DatasetError> {
        Ok(self.0.meta.clone())
    }

    fn time_index(&self) -> Result<Vec<String>, DatasetError> {
        Ok(self.0.time_index.clone())
    }

    fn values(&self, variable: &str, position: usize) -> Result<Vec<f64>, DatasetError> {
        let stored = self.0.variable(variable)?;
        let sites = stored.sites();
        if position >= sites {
            return Err(DatasetError::PositionOutOfBounds {
                year: self.0.year,
                variable: variable.to_string(),
                position,
                sites,
            });
        }
        Ok(stored.rows.iter().map(|row| row[position]).collect())
    }

    fn attribute(&self, variable: &str, name: &str) -> Result<Option<f64>, DatasetError> {
        Ok(self.0.variable(variable)?.attributes.get(name).copied())
    }
}

/// A set of [`MemoryDataset`]s keyed by year.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    datasets: HashMap<Year, Arc<MemoryDataset>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dataset, replacing any previous one for the same year.
    pub fn with_dataset(mut self, dataset: MemoryDataset) -> Self {
        self.insert(dataset);
        self
    }

    /// Adds a dataset in place, replacing any previous one for the same year.
    pub fn insert(&mut self, dataset: MemoryDataset) {
        self.datasets.insert(dataset.year, Arc::new(dataset));
    }
}

impl DatasetSource for MemorySource {
    type Handle = MemoryHandle;

    fn open(&self, year: Year) -> Result<MemoryHandle, DatasetError> {
        self.datasets
            .get(&year)
            .map(|dataset| MemoryHandle(Arc::clone(dataset)))
            .ok_or_else(|| DatasetError::NotFound {
                year,
                path: format!("memory://{}", year),
            })
    }
}
