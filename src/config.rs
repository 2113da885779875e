use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

pub const DEFAULT_CONFIG_FILE: &str = "genome-harvest.json";
pub const DEFAULT_EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_CHECKM_PATH_TEMPLATE: &str =
    "results/checkm/{lineage}_{id}/storage/bin_stats_ext.tsv";
pub const DEFAULT_LINEAGE: &str = "Bacteria";
pub const DEFAULT_MAX_RECORDS: usize = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub eutils_base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub max_records: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub checkm_path_template: Option<String>,
    #[serde(default)]
    pub lineage: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub eutils_base_url: String,
    pub api_key: Option<String>,
    pub max_records: usize,
    pub timeout: Duration,
    pub checkm_path_template: String,
    pub lineage: String,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            eutils_base_url: DEFAULT_EUTILS_BASE_URL.to_string(),
            api_key: None,
            max_records: DEFAULT_MAX_RECORDS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            checkm_path_template: DEFAULT_CHECKM_PATH_TEMPLATE.to_string(),
            lineage: DEFAULT_LINEAGE.to_string(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `genome-harvest.json` in the working directory when present.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, HarvestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if !config_path.exists() {
            if path.is_some() {
                return Err(HarvestError::MissingConfig(config_path));
            }
            return Self::resolve_config(Config::default(), env_api_key());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| HarvestError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| HarvestError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config, env_api_key())
    }

    pub fn resolve_config(
        config: Config,
        env_api_key: Option<String>,
    ) -> Result<ResolvedConfig, HarvestError> {
        let defaults = ResolvedConfig::default();

        let max_records = config.max_records.unwrap_or(defaults.max_records);
        if max_records == 0 {
            return Err(HarvestError::InvalidConfig(
                "max_records must be greater than zero".to_string(),
            ));
        }

        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(HarvestError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        let checkm_path_template = config
            .checkm_path_template
            .unwrap_or(defaults.checkm_path_template);
        if !checkm_path_template.contains("{id}") {
            return Err(HarvestError::InvalidConfig(format!(
                "checkm_path_template must contain {{id}}: {checkm_path_template}"
            )));
        }

        let api_key = config
            .api_key
            .or(env_api_key)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            eutils_base_url: config
                .eutils_base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.eutils_base_url),
            api_key,
            max_records,
            timeout: Duration::from_secs(timeout_secs),
            checkm_path_template,
            lineage: config.lineage.unwrap_or(defaults.lineage),
        })
    }
}

fn env_api_key() -> Option<String> {
    std::env::var("NCBI_API_KEY").ok()
}
