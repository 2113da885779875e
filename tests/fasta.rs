use std::io::Cursor;

use assert_matches::assert_matches;

use genome_harvest::error::HarvestError;
use genome_harvest::fasta::{StructuralStats, assembly_stats, stats_from_reader};

#[test]
fn wrapped_multi_record_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("Foo_Xa.fasta");
    let ten = "ACGTACGTAC";
    std::fs::write(
        &path,
        format!(">r1 plasmid\n{ten}\n>r2\n{ten}\n{ten}\n>r3 chromosome\n{ten}{ten}\n{ten}\n"),
    )
    .unwrap();

    let stats = assembly_stats(&path).unwrap();
    assert_eq!(
        stats,
        StructuralStats {
            total_length: 60,
            contigs: 3
        }
    );
}

#[test]
fn missing_file_reported_by_path() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.fasta");
    let err = assembly_stats(&path).unwrap_err();
    assert_matches!(err, HarvestError::SequenceFileMissing(missing) if missing == path);
}

#[test]
fn empty_input_has_no_records() {
    let stats = stats_from_reader(Cursor::new("")).unwrap();
    assert_eq!(stats, StructuralStats::default());
}

#[test]
fn windows_line_endings_do_not_count_as_residues() {
    let input = ">NZ_CP1.1 Escherichia coli chromosome\r\nACGT\r\nAC\r\n>NZ_CP2.1 plasmid\r\nGG\r\n";
    let stats = stats_from_reader(Cursor::new(input)).unwrap();
    assert_eq!(
        stats,
        StructuralStats {
            total_length: 8,
            contigs: 2
        }
    );
}

#[test]
fn unreadable_file_is_a_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let err = assembly_stats(temp.path()).unwrap_err();
    assert_matches!(err, HarvestError::SequenceFileRead { .. });
}
