//! Reads NSRDB files through the HSDS REST API (the service behind `h5pyd`).
//!
//! Each year is a separate HSDS domain. Opening a domain resolves its root group; named fields
//! are then root-level links to datasets. Variable reads fetch only the hyperslab of the
//! requested grid position, so a full year for one site is a single small request.

use crate::dataset::config::HsdsConfig;
use crate::dataset::error::{DatasetError, TransportError};
use crate::dataset::source::{DatasetHandle, DatasetSource, META_DATASET, TIME_INDEX_DATASET};
use crate::grid::grid_point::{LATITUDE_COLUMN, LONGITUDE_COLUMN};
use crate::types::location::Year;
use log::{debug, info};
use polars::prelude::{Column, DataFrame};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct DomainResponse {
    root: String,
}

#[derive(Debug, Deserialize)]
struct LinkResponse {
    link: Link,
}

#[derive(Debug, Deserialize)]
struct Link {
    // Soft and external links carry no id.
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatasetResponse {
    shape: Shape,
    #[serde(rename = "type")]
    dtype: TypeInfo,
}

#[derive(Debug, Clone, Deserialize)]
struct Shape {
    #[serde(default)]
    dims: Vec<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct TypeInfo {
    class: String,
    #[serde(default)]
    fields: Vec<FieldInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldInfo {
    name: String,
    #[serde(rename = "type")]
    dtype: FieldType,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldType {
    class: String,
}

#[derive(Debug, Deserialize)]
struct ValueResponse {
    value: Value,
}

#[derive(Debug, Clone)]
struct DatasetInfo {
    id: String,
    dims: Vec<usize>,
    dtype: TypeInfo,
}

#[derive(Debug, Clone)]
struct HsdsClient {
    http: Client,
    config: HsdsConfig,
}

impl HsdsClient {
    fn get<T: DeserializeOwned>(
        &self,
        route: &str,
        domain: &str,
        params: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let url = format!("{}{}", self.config.endpoint.trim_end_matches('/'), route);

        let mut request = self
            .http
            .get(&url)
            .query(&[("domain", domain)])
            .query(params);
        if let Some(api_key) = &self.config.api_key {
            request = request.query(&[("api_key", api_key)]);
        }
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        let response = request
            .send()
            .map_err(|e| TransportError::NetworkRequest(url.clone(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    TransportError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    TransportError::NetworkRequest(url, e)
                });
            }
        };

        let body = response
            .bytes()
            .map_err(|e| TransportError::NetworkRequest(url.clone(), e))?;
        serde_json::from_slice(&body).map_err(|e| TransportError::JsonParse { url, source: e })
    }
}

/// Opens NSRDB years on an HSDS endpoint.
///
/// All requests are blocking. Do not call from inside an async runtime thread.
#[derive(Debug, Clone)]
pub struct HsdsSource {
    client: HsdsClient,
}

impl HsdsSource {
    /// Creates a source for the service described by `config`.
    pub fn new(config: HsdsConfig) -> Self {
        Self {
            client: HsdsClient {
                http: Client::new(),
                config,
            },
        }
    }

    /// The configuration this source was created with.
    pub fn config(&self) -> &HsdsConfig {
        &self.client.config
    }
}

impl DatasetSource for HsdsSource {
    type Handle = HsdsHandle;

    fn open(&self, year: Year) -> Result<HsdsHandle, DatasetError> {
        let domain = self.client.config.domain_path(year);
        info!("Opening {} for year {}", domain, year);

        let root = self
            .client
            .get::<DomainResponse>("/", &domain, &[])
            .map_err(|e| {
                if e.is_not_found() {
                    DatasetError::NotFound {
                        year,
                        path: domain.clone(),
                    }
                } else {
                    DatasetError::Open {
                        year,
                        path: domain.clone(),
                        source: e,
                    }
                }
            })?;

        Ok(HsdsHandle {
            client: self.client.clone(),
            year,
            domain,
            root: root.root,
            datasets: RefCell::new(HashMap::new()),
        })
    }
}

/// One open HSDS domain. Dataset ids and shapes are remembered for the life of the handle.
#[derive(Debug)]
pub struct HsdsHandle {
    client: HsdsClient,
    year: Year,
    domain: String,
    root: String,
    datasets: RefCell<HashMap<String, DatasetInfo>>,
}

impl HsdsHandle {
    /// The HSDS domain (dataset path) this handle reads from.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    fn read_error(&self, name: &str, source: TransportError) -> DatasetError {
        DatasetError::Read {
            year: self.year,
            name: name.to_string(),
            source,
        }
    }

    fn unexpected(&self, name: &str, message: impl Into<String>) -> DatasetError {
        self.read_error(
            name,
            TransportError::UnexpectedResponse {
                resource: format!("{}:{}", self.domain, name),
                message: message.into(),
            },
        )
    }

    /// Resolves a root-level link. `None` when the domain has no field called `name`.
    fn dataset(&self, name: &str) -> Result<Option<DatasetInfo>, DatasetError> {
        if let Some(info) = self.datasets.borrow().get(name) {
            return Ok(Some(info.clone()));
        }

        let route = format!("/groups/{}/links/{}", self.root, name);
        let link = match self.client.get::<LinkResponse>(&route, &self.domain, &[]) {
            Ok(response) => response.link,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(self.read_error(name, e)),
        };
        let id = link
            .id
            .ok_or_else(|| self.unexpected(name, "link does not point to a dataset"))?;

        let details: DatasetResponse = self
            .client
            .get(&format!("/datasets/{}", id), &self.domain, &[])
            .map_err(|e| self.read_error(name, e))?;
        let info = DatasetInfo {
            id,
            dims: details.shape.dims,
            dtype: details.dtype,
        };
        debug!(
            "Resolved '{}' in {} to {} with shape {:?}",
            name, self.domain, info.id, info.dims
        );
        self.datasets
            .borrow_mut()
            .insert(name.to_string(), info.clone());
        Ok(Some(info))
    }

    fn required(&self, name: &str) -> Result<DatasetInfo, DatasetError> {
        self.dataset(name)?
            .ok_or_else(|| DatasetError::MissingVariable {
                year: self.year,
                variable: name.to_string(),
            })
    }

    fn fetch_value(&self, info: &DatasetInfo, select: Option<String>) -> Result<Value, TransportError> {
        let params: Vec<(&str, String)> = select.map(|s| ("select", s)).into_iter().collect();
        self.client
            .get::<ValueResponse>(&format!("/datasets/{}/value", info.id), &self.domain, &params)
            .map(|response| response.value)
    }

    fn value(
        &self,
        name: &str,
        info: &DatasetInfo,
        select: Option<String>,
    ) -> Result<Value, DatasetError> {
        self.fetch_value(info, select).map_err(|e| self.read_error(name, e))
    }

    /// Reads all rows of the compound `meta` dataset in pages of rows.
    ///
    /// A page the server rejects as too large (413) is retried at half its size, and the
    /// smaller size is kept for the remaining pages. A single rejected row is an error.
    fn meta_rows(&self, info: &DatasetInfo) -> Result<Vec<Value>, DatasetError> {
        let &[sites] = info.dims.as_slice() else {
            return Err(self.unexpected(
                META_DATASET,
                format!("expected one dimension, found {:?}", info.dims),
            ));
        };

        let mut rows = Vec::with_capacity(sites);
        let mut page = self.client.config.meta_page_rows.max(1);
        let mut start = 0;
        while start < sites {
            let end = (start + page).min(sites);
            match self.fetch_value(info, Some(format!("[{}:{}]", start, end))) {
                Ok(Value::Array(page_rows)) if page_rows.len() == end - start => {
                    rows.extend(page_rows);
                    start = end;
                }
                Ok(_) => {
                    return Err(self.unexpected(
                        META_DATASET,
                        format!("rows {}..{} did not come back as {} records", start, end, end - start),
                    ));
                }
                Err(e) if e.status() == Some(StatusCode::PAYLOAD_TOO_LARGE) && end - start > 1 => {
                    page = (end - start) / 2;
                    debug!("Meta page of {} rows too large, retrying with {}", end - start, page);
                }
                Err(e) => return Err(self.read_error(META_DATASET, e)),
            }
        }
        Ok(rows)
    }
}

impl DatasetHandle for HsdsHandle {
    fn year(&self) -> Year {
        self.year
    }

    fn meta(&self) -> Result<DataFrame, DatasetError> {
        let info = self.required(META_DATASET)?;
        if info.dtype.class != "H5T_COMPOUND" {
            return Err(self.unexpected(
                META_DATASET,
                format!("expected a compound dataset, found {}", info.dtype.class),
            ));
        }
        let rows = self.meta_rows(&info)?;
        meta_frame(self.year, &info.dtype.fields, &rows)
    }

    fn time_index(&self) -> Result<Vec<String>, DatasetError> {
        let info = self.required(TIME_INDEX_DATASET)?;
        let value = self.value(TIME_INDEX_DATASET, &info, None)?;
        flatten(&value)
            .into_iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.unexpected(TIME_INDEX_DATASET, format!("non-string entry {}", v)))
            })
            .collect()
    }

    fn values(&self, variable: &str, position: usize) -> Result<Vec<f64>, DatasetError> {
        let info = self.required(variable)?;
        let &[steps, sites] = info.dims.as_slice() else {
            return Err(self.unexpected(
                variable,
                format!("expected two dimensions, found {:?}", info.dims),
            ));
        };
        if position >= sites {
            return Err(DatasetError::PositionOutOfBounds {
                year: self.year,
                variable: variable.to_string(),
                position,
                sites,
            });
        }

        let select = format!("[0:{},{}:{}]", steps, position, position + 1);
        let value = self.value(variable, &info, Some(select))?;
        flatten(&value)
            .into_iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| self.unexpected(variable, format!("non-numeric value {}", v)))
            })
            .collect()
    }

    fn attribute(&self, variable: &str, name: &str) -> Result<Option<f64>, DatasetError> {
        let info = self.required(variable)?;
        let route = format!("/datasets/{}/attributes/{}", info.id, name);
        let value = match self.client.get::<ValueResponse>(&route, &self.domain, &[]) {
            Ok(response) => response.value,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(self.read_error(variable, e)),
        };
        flatten(&value)
            .first()
            .and_then(|v| v.as_f64())
            .map(Some)
            .ok_or_else(|| {
                self.unexpected(variable, format!("attribute '{}' is not numeric", name))
            })
    }
}

/// Leaves of a nested JSON array, in row-major order. A scalar is its own single leaf.
fn flatten(value: &Value) -> Vec<&Value> {
    fn walk<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
        match value {
            Value::Array(items) => items.iter().for_each(|item| walk(item, out)),
            leaf => out.push(leaf),
        }
    }
    let mut out = Vec::new();
    walk(value, &mut out);
    out
}

/// Builds the meta table from the rows of a compound dataset. Numeric fields become `f64`
/// columns, string fields become string columns, anything else is skipped.
fn meta_frame(year: Year, fields: &[FieldInfo], rows: &[Value]) -> Result<DataFrame, DatasetError> {
    let mut columns = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        let cells = rows.iter().map(|row| row.get(i));
        match field.dtype.class.as_str() {
            "H5T_FLOAT" | "H5T_INTEGER" => {
                let values: Vec<Option<f64>> = cells.map(|c| c.and_then(Value::as_f64)).collect();
                columns.push(Column::new(field.name.as_str().into(), values));
            }
            "H5T_STRING" => {
                let values: Vec<Option<String>> = cells
                    .map(|c| c.and_then(Value::as_str).map(str::to_string))
                    .collect();
                columns.push(Column::new(field.name.as_str().into(), values));
            }
            other => debug!("Skipping meta field '{}' of class {}", field.name, other),
        }
    }

    for required in [LATITUDE_COLUMN, LONGITUDE_COLUMN] {
        if !columns.iter().any(|c| c.name().as_str() == required) {
            return Err(DatasetError::MissingMetaField {
                year,
                field: required.to_string(),
            });
        }
    }

    DataFrame::new(columns).map_err(|e| DatasetError::Meta { year, source: e })
}
