use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ResolvedConfig;
use crate::error::HarvestError;

static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^'\\]*)'").expect("static pattern"));

pub const REQUIRED_KEYS: [&str; 5] = [
    "Completeness",
    "Contamination",
    "GC",
    "Genome size",
    "Coding density",
];

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct QualityStats {
    #[serde(rename = "Completeness")]
    pub completeness: f64,
    #[serde(rename = "Contamination")]
    pub contamination: f64,
    #[serde(rename = "GC")]
    pub gc: f64,
    #[serde(rename = "Genome size")]
    pub genome_size: u64,
    #[serde(rename = "Coding density")]
    pub coding_density: f64,
}

#[derive(Debug, Clone)]
pub struct QualityLayout {
    template: String,
    lineage: String,
}

impl QualityLayout {
    /// `template` must contain `{id}`; `{lineage}` is optional.
    pub fn new(template: impl Into<String>, lineage: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            lineage: lineage.into(),
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(config.checkm_path_template.clone(), config.lineage.clone())
    }

    pub fn lineage(&self) -> &str {
        &self.lineage
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        PathBuf::from(
            self.template
                .replace("{lineage}", &self.lineage)
                .replace("{id}", id),
        )
    }
}

// CheckM writes `<bin id>\t{'Completeness': 97.4, ...}`, a Python dict literal.
pub fn parse_quality_block(text: &str) -> Result<QualityStats, String> {
    let start = text
        .find('{')
        .ok_or_else(|| "no '{' found in quality output".to_string())?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| "unterminated '{' block in quality output".to_string())?;
    let block = SINGLE_QUOTED.replace_all(&text[start..=end], "\"$1\"");

    let map: Map<String, Value> =
        serde_json::from_str(&block).map_err(|err| format!("invalid key/value block: {err}"))?;

    let missing = REQUIRED_KEYS
        .iter()
        .filter(|key| !map.contains_key(**key))
        .copied()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(format!("missing keys: {}", missing.join(", ")));
    }

    serde_json::from_value(Value::Object(map)).map_err(|err| err.to_string())
}

pub fn read_quality_stats(id: &str, path: &Path) -> Result<QualityStats, HarvestError> {
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => HarvestError::QualityFileMissing {
            id: id.to_string(),
            path: path.to_path_buf(),
        },
        _ => HarvestError::QualityParse {
            id: id.to_string(),
            path: path.to_path_buf(),
            message: err.to_string(),
        },
    })?;
    parse_quality_block(&text).map_err(|message| HarvestError::QualityParse {
        id: id.to_string(),
        path: path.to_path_buf(),
        message,
    })
}
