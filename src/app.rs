use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::checkm::QualityLayout;
use crate::domain::ResolvedAssembly;
use crate::download::{AssemblyDownloader, DownloadReport, DownloadStatus};
use crate::error::HarvestError;
use crate::naming::resolve_assemblies;
use crate::ncbi::NcbiClient;
use crate::report::{SkippedAssembly, Table, quality_join, structural_summary};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub taxon: String,
    pub assemblies: usize,
    pub downloaded: usize,
    pub present: usize,
    pub failed: usize,
    pub failed_urls: Vec<String>,
    pub skipped: Vec<SkippedAssembly>,
    pub summary_path: String,
    pub summary_rows: usize,
    pub finished_at: String,
    pub downloads: DownloadReport,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<N: NcbiClient> {
    store: Store,
    ncbi: N,
}

impl<N: NcbiClient> App<N> {
    pub fn new(store: Store, ncbi: N) -> Self {
        Self { store, ncbi }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Individual download failures are part of the result, not an error.
    pub fn fetch(&self, taxon: &str, sink: &dyn ProgressSink) -> Result<FetchResult, HarvestError> {
        self.store.ensure_root()?;

        sink.event(ProgressEvent {
            message: format!("phase=Resolve; searching assemblies for {taxon}"),
            elapsed: None,
        });
        let start = Instant::now();
        let records = self.ncbi.search_assemblies(taxon)?;
        sink.event(ProgressEvent {
            message: format!("ncbi.response records={}", records.len()),
            elapsed: Some(start.elapsed()),
        });

        let assemblies = resolve_assemblies(records)?;
        let downloads = self.download(&assemblies, sink);

        sink.event(ProgressEvent {
            message: "phase=Verify; deriving assembly statistics".to_string(),
            elapsed: None,
        });
        let summary = structural_summary(&assemblies, &self.store);
        let skipped = summary.skipped.clone();
        let table = summary.into_table();

        let summary_path = self.store.summary_path();
        let mut content = Vec::new();
        table.write_tsv(&mut content)?;
        Store::write_bytes_atomic(&summary_path, &content)?;
        info!(path = %summary_path, rows = table.rows.len(), "wrote assembly summary");

        Ok(FetchResult {
            taxon: taxon.to_string(),
            assemblies: assemblies.len(),
            downloaded: downloads.count(&DownloadStatus::Downloaded),
            present: downloads.count(&DownloadStatus::Present),
            failed: downloads.count(&DownloadStatus::Failed(String::new())),
            failed_urls: downloads
                .failed_urls()
                .into_iter()
                .map(str::to_string)
                .collect(),
            skipped,
            summary_path: summary_path.to_string(),
            summary_rows: table.rows.len(),
            finished_at: iso_timestamp(),
            downloads,
        })
    }

    fn download(&self, assemblies: &[ResolvedAssembly], sink: &dyn ProgressSink) -> DownloadReport {
        sink.event(ProgressEvent {
            message: format!("phase=Download; {} assemblies", assemblies.len()),
            elapsed: None,
        });
        AssemblyDownloader::new(&self.ncbi, &self.store).download_all(assemblies, sink)
    }
}

/// Joins CheckM stats onto the metadata table at `metadata_path`.
pub fn reconcile(
    metadata_path: &Path,
    id_column: &str,
    layout: &QualityLayout,
    sink: &dyn ProgressSink,
) -> Result<Table, HarvestError> {
    sink.event(ProgressEvent {
        message: format!("phase=Resolve; reading {}", metadata_path.display()),
        elapsed: None,
    });
    let table = Table::read_tsv(metadata_path)?;
    sink.event(ProgressEvent {
        message: format!("phase=Verify; joining quality stats for {} rows", table.rows.len()),
        elapsed: None,
    });
    quality_join(table, id_column, layout)
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
