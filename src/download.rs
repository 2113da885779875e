use std::io::Read;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::MultiGzDecoder;
use serde::Serialize;
use tracing::{info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{ResolvedAssembly, ResolvedName};
use crate::error::HarvestError;
use crate::ncbi::NcbiClient;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum DownloadStatus {
    Present,
    Downloaded,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub name: ResolvedName,
    pub url: String,
    pub path: Utf8PathBuf,
    pub status: DownloadStatus,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self.status, DownloadStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadReport {
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadReport {
    pub fn push(&mut self, outcome: DownloadOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn failed_urls(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.is_success())
            .map(|outcome| outcome.url.as_str())
            .collect()
    }

    pub fn count(&self, status: &DownloadStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| match (status, &outcome.status) {
                (DownloadStatus::Failed(_), DownloadStatus::Failed(_)) => true,
                (expected, actual) => expected == actual,
            })
            .count()
    }
}

pub struct AssemblyDownloader<'a, N: NcbiClient> {
    client: &'a N,
    store: &'a Store,
}

impl<'a, N: NcbiClient> AssemblyDownloader<'a, N> {
    pub fn new(client: &'a N, store: &'a Store) -> Self {
        Self { client, store }
    }

    /// Downloads every assembly in order; failures are recorded, never raised.
    pub fn download_all(
        &self,
        assemblies: &[ResolvedAssembly],
        sink: &dyn ProgressSink,
    ) -> DownloadReport {
        let mut report = DownloadReport::default();
        for assembly in assemblies {
            let outcome = match assembly.record.archive_url() {
                Ok(url) => self.download_one(&assembly.name, &url, sink),
                Err(err) => self.without_source(assembly, &err, sink),
            };
            report.push(outcome);
        }
        report
    }

    fn without_source(
        &self,
        assembly: &ResolvedAssembly,
        err: &HarvestError,
        sink: &dyn ProgressSink,
    ) -> DownloadOutcome {
        let name = &assembly.name;
        let path = self.store.assembly_path(name);
        let status = if Store::is_satisfied(&path) {
            DownloadStatus::Present
        } else {
            warn!(%name, accession = %assembly.record.accession, "no GenBank path to download from");
            sink.event(ProgressEvent {
                message: format!("phase=Download; {name} failed: {err}"),
                elapsed: None,
            });
            DownloadStatus::Failed(err.to_string())
        };
        DownloadOutcome {
            name: name.clone(),
            url: format!("<no GenBank path: {}>", assembly.record.accession),
            path,
            status,
        }
    }

    pub fn download_one(
        &self,
        name: &ResolvedName,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> DownloadOutcome {
        let path = self.store.assembly_path(name);

        let status = if Store::is_satisfied(&path) {
            info!(%name, %path, "assembly file already exists");
            sink.event(ProgressEvent {
                message: format!("phase=Store; {path} already exists"),
                elapsed: None,
            });
            DownloadStatus::Present
        } else {
            info!(%name, %path, url, "downloading assembly");
            let start = Instant::now();
            match self.fetch_to(url, &path) {
                Ok(()) => {
                    sink.event(ProgressEvent {
                        message: format!("phase=Download; {name} written to {path}"),
                        elapsed: Some(start.elapsed()),
                    });
                    DownloadStatus::Downloaded
                }
                Err(err) => {
                    warn!(%name, url, error = %err, "assembly download failed");
                    if let Err(cleanup) = Store::remove_if_exists(&path) {
                        warn!(%path, error = %cleanup, "failed to remove partial file");
                    }
                    sink.event(ProgressEvent {
                        message: format!("phase=Download; {name} failed: {err}"),
                        elapsed: Some(start.elapsed()),
                    });
                    DownloadStatus::Failed(err.to_string())
                }
            }
        };

        DownloadOutcome {
            name: name.clone(),
            url: url.to_string(),
            path,
            status,
        }
    }

    fn fetch_to(&self, url: &str, path: &Utf8Path) -> Result<(), HarvestError> {
        let compressed = self.client.fetch_archive(url)?;
        let text = decompress_text(&compressed)?;
        Store::write_bytes_atomic(path, text.as_bytes())
    }
}

/// Decodes every member of a gzip stream holding UTF-8 text.
pub fn decompress_text(compressed: &[u8]) -> Result<String, HarvestError> {
    let mut decoder = MultiGzDecoder::new(compressed);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|err| HarvestError::Decompress(err.to_string()))?;
    if raw.is_empty() {
        return Err(HarvestError::Decompress(
            "archive decompressed to zero bytes".to_string(),
        ));
    }
    String::from_utf8(raw).map_err(|err| HarvestError::Decode(err.to_string()))
}
