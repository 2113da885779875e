use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::app::{FetchResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_fetch<W: Write>(result: &FetchResult, mut out: W) -> io::Result<()> {
        writeln!(out, "Assemblies found: {}", result.assemblies)?;
        writeln!(out, "Downloaded: {}", result.downloaded)?;
        writeln!(out, "Already present: {}", result.present)?;
        if !result.failed_urls.is_empty() {
            writeln!(out, "Number of failed downloads: {}", result.failed_urls.len())?;
            for url in &result.failed_urls {
                writeln!(out, "{url}")?;
            }
        }
        if !result.skipped.is_empty() {
            writeln!(
                out,
                "Assemblies missing from summary: {}",
                result.skipped.len()
            )?;
            for skipped in &result.skipped {
                writeln!(out, "{}\t{}", skipped.accession, skipped.path)?;
            }
        }
        writeln!(
            out,
            "Summary ({} rows): {}",
            result.summary_rows, result.summary_path
        )?;
        Ok(())
    }
}
