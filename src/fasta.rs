use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use bio::io::fasta;
use serde::Serialize;

use crate::error::HarvestError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StructuralStats {
    pub total_length: u64,
    pub contigs: u64,
}

pub fn stats_from_reader<R: BufRead>(mut reader: R) -> io::Result<StructuralStats> {
    skip_to_first_title(&mut reader)?;

    let mut stats = StructuralStats::default();
    for record in fasta::Reader::new(reader).records() {
        let record = record?;
        stats.contigs += 1;
        stats.total_length += record.seq().len() as u64;
    }
    Ok(stats)
}

// Anything before the first title line is not part of a record.
fn skip_to_first_title<R: BufRead>(reader: &mut R) -> io::Result<()> {
    let mut discarded = Vec::new();
    loop {
        let buf = reader.fill_buf()?;
        if buf.first().is_none_or(|&byte| byte == b'>') {
            return Ok(());
        }
        discarded.clear();
        reader.read_until(b'\n', &mut discarded)?;
    }
}

/// Total residue count and contig count of the FASTA file at `path`.
pub fn assembly_stats(path: &Path) -> Result<StructuralStats, HarvestError> {
    let file = File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => HarvestError::SequenceFileMissing(path.to_path_buf()),
        _ => HarvestError::SequenceFileRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        },
    })?;
    stats_from_reader(BufReader::new(file)).map_err(|err| HarvestError::SequenceFileRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
