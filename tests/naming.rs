use assert_matches::assert_matches;

use genome_harvest::error::HarvestError;
use genome_harvest::naming::resolve_names;

#[test]
fn duplicated_names_all_receive_suffixes() {
    let resolved = resolve_names(&["Foo X", "Foo X", "Bar"]).unwrap();
    assert_eq!(resolved, vec!["Foo_Xa", "Foo_Xb", "Bar"]);
}

#[test]
fn resolution_is_deterministic() {
    let input = ["ASM1", "Foo X", "ASM1", "Foo  X", "Foo X"];
    let first = resolve_names(&input).unwrap();
    let second = resolve_names(&input).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, vec!["ASM1a", "Foo_Xa", "ASM1b", "Foo_Xb", "Foo_Xc"]);
}

#[test]
fn suffix_clash_with_literal_name_is_rejected() {
    let err = resolve_names(&["Foo", "Foo", "Fooa"]).unwrap_err();
    assert_matches!(err, HarvestError::NameCollision(name) if name == "Fooa");
}
