use crate::core::mapping::MappingTable;
use crate::core::types::{Currency, Params};
use json_comments::StripComments;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid yaml config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Quote currency whose free/total balance backs cash/value.
    pub currency: Currency,
    pub mapping: MappingTable,
    /// Extra params sent with every reconciliation fetch, e.g.
    /// `{"type": "future"}` for derivatives accounts.
    pub fetch_params: Params,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            mapping: MappingTable::default(),
            fetch_params: Params::new(),
        }
    }
}

impl BrokerConfig {
    pub fn new(currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            ..Default::default()
        }
    }

    pub fn with_mapping(mut self, mapping: MappingTable) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        let stripped = StripComments::new(data.as_bytes());
        Ok(serde_json::from_reader(stripped)?)
    }

    pub fn from_yaml_str(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path)?;
        Ok(serde_json::from_reader(StripComments::new(file))?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Picks the loader from the file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&data),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&data),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}
