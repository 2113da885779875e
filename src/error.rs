use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("invalid assembly accession: {0}")]
    InvalidAccession(String),

    #[error("assembly name {0:?} is not a usable file name")]
    InvalidName(String),

    #[error("assembly name {name} occurs {count} times; at most 26 duplicates can be suffixed")]
    TooManyDuplicates { name: String, count: usize },

    #[error("resolved assembly name {0} is not unique")]
    NameCollision(String),

    #[error("missing config file at {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("NCBI request failed: {0}")]
    NcbiHttp(String),

    #[error("NCBI returned status {status}: {message}")]
    NcbiStatus { status: u16, message: String },

    #[error("unexpected NCBI response: {0}")]
    NcbiResponse(String),

    #[error("assembly {0} has no GenBank retrieval path")]
    MissingArchivePath(String),

    #[error("failed to decompress archive: {0}")]
    Decompress(String),

    #[error("archive is not valid UTF-8 text: {0}")]
    Decode(String),

    #[error("sequence file not found: {0}")]
    SequenceFileMissing(PathBuf),

    #[error("failed to read sequence file {path}: {message}")]
    SequenceFileRead { path: PathBuf, message: String },

    #[error("quality stats for {id} not found at {path}")]
    QualityFileMissing { id: String, path: PathBuf },

    #[error("malformed quality stats for {id} in {path}: {message}")]
    QualityParse {
        id: String,
        path: PathBuf,
        message: String,
    },

    #[error("metadata table has no column named {0}")]
    MissingColumn(String),

    #[error("failed to read table {path}: {message}")]
    TableRead { path: PathBuf, message: String },

    #[error("failed to write table: {0}")]
    TableWrite(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
