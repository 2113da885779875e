use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ResolvedConfig;
use crate::domain::AssemblyRecord;
use crate::error::HarvestError;

const TOOL_NAME: &str = "genome-harvest";
const SUMMARY_BATCH: usize = 200;

pub trait NcbiClient: Send + Sync {
    /// Assembly records matching a free-text taxon term, in search order.
    fn search_assemblies(&self, term: &str) -> Result<Vec<AssemblyRecord>, HarvestError>;
    /// Raw body of a single GET; no retries.
    fn fetch_archive(&self, url: &str) -> Result<Vec<u8>, HarvestError>;
}

#[derive(Debug, Clone)]
pub struct NcbiHttpClient {
    client: Client,
    base_url: String,
    email: String,
    api_key: Option<String>,
    max_records: usize,
}

impl NcbiHttpClient {
    pub fn new(config: &ResolvedConfig, email: &str) -> Result<Self, HarvestError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(HarvestError::InvalidConfig(
                "a contact email is required by NCBI E-utilities".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("{TOOL_NAME}/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HarvestError::InvalidConfig(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| HarvestError::NcbiHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.eutils_base_url.clone(),
            email: email.to_string(),
            api_key: config.api_key.clone(),
            max_records: config.max_records,
        })
    }

    fn eutils_get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, HarvestError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("retmode", "json".to_string()));
        query.push(("tool", TOOL_NAME.to_string()));
        query.push(("email", self.email.clone()));
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }

        let response = self.send_with_retries(|| self.client.get(&url).query(&query))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "NCBI request failed".to_string());
            return Err(HarvestError::NcbiStatus { status, message });
        }
        response
            .json::<Value>()
            .map_err(|err| HarvestError::NcbiResponse(format!("{endpoint}: {err}")))
    }

    fn search_ids(&self, term: &str) -> Result<Vec<String>, HarvestError> {
        let json = self.eutils_get(
            "esearch.fcgi",
            &[
                ("db", "assembly".to_string()),
                ("term", term.to_string()),
                ("retmax", self.max_records.to_string()),
            ],
        )?;
        let parsed: ESearchResponse = serde_json::from_value(json)
            .map_err(|err| HarvestError::NcbiResponse(format!("esearch: {err}")))?;
        Ok(parsed.esearchresult.idlist)
    }

    fn summaries(&self, ids: &[String]) -> Result<Vec<AssemblyRecord>, HarvestError> {
        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(SUMMARY_BATCH) {
            debug!(count = chunk.len(), "requesting assembly summaries");
            let json = self.eutils_get(
                "esummary.fcgi",
                &[("db", "assembly".to_string()), ("id", chunk.join(","))],
            )?;
            records.extend(parse_summary_response(json)?);
        }
        Ok(records)
    }

    // Only metadata requests are retried; archive downloads get a single attempt.
    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, HarvestError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 400;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        warn!(status, delay_ms = delay, "NCBI busy, retrying");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(HarvestError::NcbiHttp(err.to_string()));
                }
            }
        }
    }
}

impl NcbiClient for NcbiHttpClient {
    fn search_assemblies(&self, term: &str) -> Result<Vec<AssemblyRecord>, HarvestError> {
        info!(term, email = %self.email, "searching NCBI assembly database");
        let ids = self.search_ids(term)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        info!(count = ids.len(), "fetching assembly summaries");
        self.summaries(&ids)
    }

    fn fetch_archive(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HarvestError::NcbiHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "NCBI request failed".to_string());
            return Err(HarvestError::NcbiStatus { status, message });
        }
        let bytes = response
            .bytes()
            .map_err(|err| HarvestError::NcbiHttp(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AssemblyDocSummary {
    #[serde(default)]
    assemblyaccession: String,
    #[serde(default)]
    assemblyname: String,
    #[serde(default)]
    speciesname: String,
    #[serde(default)]
    biosource: Biosource,
    #[serde(default)]
    asmreleasedate_genbank: String,
    #[serde(default)]
    submitterorganization: String,
    #[serde(default)]
    scaffoldn50: Value,
    #[serde(default)]
    ftppath_genbank: String,
}

#[derive(Debug, Default, Deserialize)]
struct Biosource {
    #[serde(default)]
    isolate: String,
}

/// Parses an esummary `db=assembly` JSON payload, keeping the order of `result.uids`.
pub fn parse_summary_response(json: Value) -> Result<Vec<AssemblyRecord>, HarvestError> {
    let Value::Object(mut result) = json
        .get("result")
        .cloned()
        .ok_or_else(|| HarvestError::NcbiResponse("esummary: missing result".to_string()))?
    else {
        return Err(HarvestError::NcbiResponse(
            "esummary: result is not an object".to_string(),
        ));
    };

    let uids: Vec<String> = result
        .remove("uids")
        .and_then(|value| serde_json::from_value(value).ok())
        .ok_or_else(|| HarvestError::NcbiResponse("esummary: missing uids".to_string()))?;

    let mut by_uid: HashMap<String, Value> = result.into_iter().collect();
    let mut records = Vec::with_capacity(uids.len());
    for uid in uids {
        let doc = by_uid.remove(&uid).ok_or_else(|| {
            HarvestError::NcbiResponse(format!("esummary: no document for uid {uid}"))
        })?;
        let doc: AssemblyDocSummary = serde_json::from_value(doc)
            .map_err(|err| HarvestError::NcbiResponse(format!("esummary uid {uid}: {err}")))?;
        records.push(AssemblyRecord {
            accession: doc.assemblyaccession.parse()?,
            name: doc.assemblyname,
            species: doc.speciesname,
            isolate: doc.biosource.isolate,
            release_date: doc.asmreleasedate_genbank,
            submitter: doc.submitterorganization,
            scaffold_n50: lenient_u64(&doc.scaffoldn50).ok_or_else(|| {
                HarvestError::NcbiResponse(format!(
                    "esummary uid {uid}: invalid scaffoldn50 {}",
                    doc.scaffoldn50
                ))
            })?,
            base_path: doc.ftppath_genbank,
        });
    }
    Ok(records)
}

fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Null => Some(0),
        Value::Number(number) => number.as_u64(),
        Value::String(text) if text.trim().is_empty() => Some(0),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
