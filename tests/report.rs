use std::io::Cursor;
use std::path::Path;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use genome_harvest::checkm::QualityLayout;
use genome_harvest::domain::AssemblyRecord;
use genome_harvest::error::HarvestError;
use genome_harvest::naming::resolve_assemblies;
use genome_harvest::report::{Table, quality_join, structural_summary};
use genome_harvest::store::Store;

fn write_quality(root: &Path, id: &str, completeness: f64, contamination: f64) {
    let dir = root.join(format!("Bacteria_{id}")).join("storage");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("bin_stats_ext.tsv"),
        format!(
            "{id}\t{{'marker lineage': 'k__Bacteria', 'Completeness': {completeness}, \
             'Contamination': {contamination}, 'GC': 0.61, 'Genome size': 2500000, \
             '# contigs': 40, 'Coding density': 0.88}}\n"
        ),
    )
    .unwrap();
}

fn layout(root: &Path) -> QualityLayout {
    QualityLayout::new(
        format!("{}/{{lineage}}_{{id}}/storage/bin_stats_ext.tsv", root.display()),
        "Bacteria",
    )
}

fn record(accession: &str, name: &str) -> AssemblyRecord {
    AssemblyRecord {
        accession: accession.parse().unwrap(),
        name: name.to_string(),
        species: "Escherichia coli".to_string(),
        isolate: String::new(),
        release_date: "2020/01/01 00:00".to_string(),
        submitter: "Example Lab".to_string(),
        scaffold_n50: 4_600_000,
        base_path: String::new(),
    }
}

#[test]
fn quality_join_orders_by_completeness_then_contamination() {
    let temp = tempfile::tempdir().unwrap();
    write_quality(temp.path(), "A", 95.0, 2.0);
    write_quality(temp.path(), "B", 95.0, 1.0);
    write_quality(temp.path(), "C", 99.5, 4.0);
    write_quality(temp.path(), "D", 95.0, 1.0);
    let table = Table::from_reader(Cursor::new("id\thabitat\nA\tsoil\nB\tlake\nC\tgut\nD\tsea\n"))
        .unwrap();

    let joined = quality_join(table, "id", &layout(temp.path())).unwrap();

    let ids = joined.rows.iter().map(|row| row[0].as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["C", "B", "D", "A"]);
    assert_eq!(
        joined.headers,
        vec![
            "id",
            "habitat",
            "GC",
            "Genome_Size",
            "Coding_Density",
            "Bacteria_Completeness",
            "Bacteria_Contamination",
        ]
    );
    assert_eq!(joined.rows[0], vec!["C", "gut", "0.61", "2500000", "0.88", "99.5", "4.0"]);
}

#[test]
fn quality_join_fails_on_missing_file() {
    let temp = tempfile::tempdir().unwrap();
    write_quality(temp.path(), "A", 90.0, 1.0);
    let table = Table::from_reader(Cursor::new("id\nA\nGHOST\n")).unwrap();

    let err = quality_join(table, "id", &layout(temp.path())).unwrap_err();

    let expected = temp
        .path()
        .join("Bacteria_GHOST")
        .join("storage")
        .join("bin_stats_ext.tsv");
    assert_matches!(
        err,
        HarvestError::QualityFileMissing { id, path } if id == "GHOST" && path == expected
    );
}

#[test]
fn quality_join_reports_malformed_block() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("Bacteria_A").join("storage");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("bin_stats_ext.tsv"), "A\t{'Completeness': 90.0}\n").unwrap();
    let table = Table::from_reader(Cursor::new("id\nA\n")).unwrap();

    let err = quality_join(table, "id", &layout(temp.path())).unwrap_err();

    assert_matches!(err, HarvestError::QualityParse { id, message, .. }
        if id == "A" && message.contains("Contamination"));
}

#[test]
fn structural_summary_skips_missing_files() {
    let temp = tempfile::tempdir().unwrap();
    let store = Store::new(Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap());
    let assemblies = resolve_assemblies(vec![
        record("GCF_000005845.2", "ASM584v2"),
        record("GCA_000008865.2", "ASM886v2"),
    ])
    .unwrap();
    std::fs::write(
        store.assembly_path(&assemblies[0].name).as_std_path(),
        ">NC_000913.3\nACGTNACGTN\nAC\n",
    )
    .unwrap();

    let summary = structural_summary(&assemblies, &store);

    assert_eq!(summary.rows.len(), 1);
    assert_eq!(summary.rows[0].stats.total_length, 12);
    assert_eq!(summary.rows[0].stats.contigs, 1);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].accession, "GCA_000008865.2");
    assert_eq!(summary.skipped[0].path, store.root().join("ASM886v2.fasta"));

    let table = summary.into_table();
    assert_eq!(table.rows[0][1], "ASM584v2");
    assert_eq!(table.rows[0][6], "4600000");
}

#[test]
fn read_tsv_reports_missing_table() {
    let temp = tempfile::tempdir().unwrap();
    let err = Table::read_tsv(&temp.path().join("metadata.tsv")).unwrap_err();
    assert_matches!(err, HarvestError::TableRead { .. });
}
