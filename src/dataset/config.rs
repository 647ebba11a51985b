//! Connection settings for the HSDS service that serves the NSRDB files.

use crate::dataset::error::ConfigError;
use crate::types::location::Year;
use crate::utils::get_config_file;
use bon::Builder;
use log::debug;
use std::path::Path;

pub const DEFAULT_ENDPOINT: &str = "https://developer.nrel.gov/api/hsds";
/// `{year}` is replaced by the four digit dataset year.
pub const DEFAULT_PATH_TEMPLATE: &str = "/nrel/nsrdb/v3/nsrdb_{year}.h5";
/// Rows of the `meta` table requested at once.
pub const DEFAULT_META_PAGE_ROWS: usize = 50_000;

/// Where and how to reach the HSDS service.
///
/// Build one explicitly, or use [`HsdsConfig::load`] to pick up the same `~/.hscfg` file and
/// `HS_*` environment variables other HSDS clients read.
///
/// ```
/// use nsrdb::{HsdsConfig, Year};
///
/// let config = HsdsConfig::builder().api_key("my-key").build();
/// assert_eq!(config.endpoint, "https://developer.nrel.gov/api/hsds");
/// assert_eq!(config.domain_path(Year(2019)), "/nrel/nsrdb/v3/nsrdb_2019.h5");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct HsdsConfig {
    #[builder(default = DEFAULT_ENDPOINT.to_string(), into)]
    pub endpoint: String,
    #[builder(into)]
    pub username: Option<String>,
    #[builder(into)]
    pub password: Option<String>,
    #[builder(into)]
    pub api_key: Option<String>,
    #[builder(default = DEFAULT_PATH_TEMPLATE.to_string(), into)]
    pub path_template: String,
    /// Upper bound on the rows fetched per `meta` request. The reader halves it when the
    /// server rejects a page as too large.
    #[builder(default = DEFAULT_META_PAGE_ROWS)]
    pub meta_page_rows: usize,
}

impl Default for HsdsConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl HsdsConfig {
    /// Defaults, overridden by `~/.hscfg` when it exists, overridden by `HS_ENDPOINT`,
    /// `HS_USERNAME`, `HS_PASSWORD` and `HS_API_KEY`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = get_config_file().filter(|p| p.is_file()) {
            config.apply_file(&path)?;
        }
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults overridden by the given config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_file(path)?;
        Ok(config)
    }

    /// The dataset path (HSDS domain) holding `year`.
    pub fn domain_path(&self, year: Year) -> String {
        self.path_template.replace("{year}", &year.to_string())
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;

        for (number, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::Parse {
                path: path.to_path_buf(),
                line: number + 1,
            })?;
            if !self.set(key.trim(), value.trim()) {
                debug!("Ignoring unknown key '{}' in {}", key.trim(), path.display());
            }
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in ["HS_ENDPOINT", "HS_USERNAME", "HS_PASSWORD", "HS_API_KEY"] {
            if let Some(value) = lookup(key) {
                self.set(key, value.trim());
            }
        }
    }

    /// Applies a single `hs_*` setting; keys are case-insensitive. Empty values and `None`
    /// clear optional settings.
    fn set(&mut self, key: &str, value: &str) -> bool {
        let optional = match value {
            "" | "None" => None,
            v => Some(v.to_string()),
        };
        match key.to_ascii_lowercase().as_str() {
            "hs_endpoint" => {
                if let Some(endpoint) = optional {
                    self.endpoint = endpoint;
                }
            }
            "hs_username" => self.username = optional,
            "hs_password" => self.password = optional,
            "hs_api_key" => self.api_key = optional,
            _ => return false,
        }
        true
    }
}
