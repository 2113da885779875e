use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::warn;

use crate::checkm::{QualityLayout, QualityStats, read_quality_stats};
use crate::domain::ResolvedAssembly;
use crate::error::HarvestError;
use crate::fasta::{StructuralStats, assembly_stats};
use crate::store::Store;

pub const SUMMARY_HEADERS: [&str; 9] = [
    "assembly accession",
    "assembly name",
    "species name",
    "isolate ID",
    "assembly release date",
    "submitter",
    "scaffold N50",
    "assembly_size",
    "number_of_contigs",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read_tsv(path: &Path) -> Result<Self, HarvestError> {
        let file = File::open(path).map_err(|err| HarvestError::TableRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_reader(file).map_err(|message| HarvestError::TableRead {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, String> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|err| err.to_string())?
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .map(|record| {
                record
                    .map(|record| record.iter().map(str::to_string).collect())
                    .map_err(|err| err.to_string())
            })
            .collect::<Result<Vec<Vec<String>>, String>>()?;
        Ok(Self { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Result<usize, HarvestError> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| HarvestError::MissingColumn(name.to_string()))
    }

    /// Writes the header row even when there are no data rows.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<(), HarvestError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        writer
            .write_record(&self.headers)
            .map_err(|err| HarvestError::TableWrite(err.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|err| HarvestError::TableWrite(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| HarvestError::TableWrite(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblySummaryRow {
    pub accession: String,
    pub name: String,
    pub species: String,
    pub isolate: String,
    pub release_date: String,
    pub submitter: String,
    pub scaffold_n50: u64,
    pub stats: StructuralStats,
}

impl AssemblySummaryRow {
    fn into_record(self) -> Vec<String> {
        vec![
            self.accession,
            self.name,
            self.species,
            self.isolate,
            self.release_date,
            self.submitter,
            self.scaffold_n50.to_string(),
            self.stats.total_length.to_string(),
            self.stats.contigs.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedAssembly {
    pub accession: String,
    pub path: Utf8PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct StructuralSummary {
    pub rows: Vec<AssemblySummaryRow>,
    pub skipped: Vec<SkippedAssembly>,
}

impl StructuralSummary {
    pub fn into_table(self) -> Table {
        Table {
            headers: SUMMARY_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: self
                .rows
                .into_iter()
                .map(AssemblySummaryRow::into_record)
                .collect(),
        }
    }
}

/// Assemblies whose file is missing or unreadable are listed in `skipped`, not `rows`.
pub fn structural_summary(assemblies: &[ResolvedAssembly], store: &Store) -> StructuralSummary {
    let mut summary = StructuralSummary::default();
    for assembly in assemblies {
        let path = store.assembly_path(&assembly.name);
        match assembly_stats(path.as_std_path()) {
            Ok(stats) => {
                let record = &assembly.record;
                summary.rows.push(AssemblySummaryRow {
                    accession: record.accession.to_string(),
                    name: assembly.name.to_string(),
                    species: record.species.clone(),
                    isolate: record.isolate.clone(),
                    release_date: record.release_date.clone(),
                    submitter: record.submitter.clone(),
                    scaffold_n50: record.scaffold_n50,
                    stats,
                });
            }
            Err(err) => {
                warn!(accession = %assembly.record.accession, %path, error = %err, "excluding assembly from summary");
                summary.skipped.push(SkippedAssembly {
                    accession: assembly.record.accession.to_string(),
                    path,
                    reason: err.to_string(),
                });
            }
        }
    }
    summary
}

/// Every identifier must have a readable quality file; all failures are logged first.
pub fn quality_join(
    table: Table,
    id_column: &str,
    layout: &QualityLayout,
) -> Result<Table, HarvestError> {
    let id_index = table.column_index(id_column)?;

    let mut stats_by_id: HashMap<String, QualityStats> = HashMap::new();
    let mut first_error = None;
    for row in &table.rows {
        let id = row.get(id_index).map(String::as_str).unwrap_or_default();
        if stats_by_id.contains_key(id) {
            continue;
        }
        match read_quality_stats(id, &layout.path_for(id)) {
            Ok(stats) => {
                stats_by_id.insert(id.to_string(), stats);
            }
            Err(err) => {
                warn!(id, error = %err, "quality stats unavailable");
                first_error.get_or_insert(err);
            }
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }

    let mut joined = Vec::with_capacity(table.rows.len());
    for mut row in table.rows {
        let id = row.get(id_index).cloned().unwrap_or_default();
        let stats = *stats_by_id
            .get(&id)
            .ok_or_else(|| HarvestError::QualityFileMissing {
                path: layout.path_for(&id),
                id: id.clone(),
            })?;
        row.extend([
            decimal(stats.gc),
            stats.genome_size.to_string(),
            decimal(stats.coding_density),
            decimal(stats.completeness),
            decimal(stats.contamination),
        ]);
        joined.push((stats, row));
    }

    joined.sort_by(|(a, _), (b, _)| {
        b.completeness
            .total_cmp(&a.completeness)
            .then_with(|| a.contamination.total_cmp(&b.contamination))
    });

    let mut headers = table.headers;
    headers.extend([
        "GC".to_string(),
        "Genome_Size".to_string(),
        "Coding_Density".to_string(),
        format!("{}_Completeness", layout.lineage()),
        format!("{}_Contamination", layout.lineage()),
    ]);

    Ok(Table {
        headers,
        rows: joined.into_iter().map(|(_, row)| row).collect(),
    })
}

fn decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn table_round_trips_through_tsv() {
        let input = "id\tname\nGCA_1\tAlpha beta\nGCA_2\t\n";
        let table = Table::from_reader(Cursor::new(input)).unwrap();
        assert_eq!(table.headers, vec!["id", "name"]);
        assert_eq!(table.rows[1], vec!["GCA_2", ""]);

        let mut out = Vec::new();
        table.write_tsv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), input);
    }

    #[test]
    fn empty_table_still_has_header() {
        let table = StructuralSummary::default().into_table();
        let mut out = Vec::new();
        table.write_tsv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", SUMMARY_HEADERS.join("\t")));
    }

    #[test]
    fn whole_numbers_keep_a_decimal_place() {
        assert_eq!(decimal(4.0), "4.0");
        assert_eq!(decimal(100.0), "100.0");
        assert_eq!(decimal(97.41), "97.41");
    }

    #[test]
    fn missing_id_column_reported() {
        let table = Table::from_reader(Cursor::new("accession\nGCA_1\n")).unwrap();
        let layout = QualityLayout::new("{id}.tsv", "Bacteria");
        let err = quality_join(table, "id", &layout).unwrap_err();
        assert!(matches!(err, HarvestError::MissingColumn(column) if column == "id"));
    }
}
