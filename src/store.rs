use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::ResolvedName;
use crate::error::HarvestError;

pub const SUMMARY_FILE: &str = "assembly_summary.tsv";

#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn assembly_path(&self, name: &ResolvedName) -> Utf8PathBuf {
        self.root.join(format!("{}.fasta", name.as_str()))
    }

    pub fn summary_path(&self) -> Utf8PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    pub fn ensure_root(&self) -> Result<(), HarvestError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| HarvestError::Filesystem(format!("create {}: {err}", self.root)))
    }

    /// True when `path` is a file with non-zero size.
    pub fn is_satisfied(path: &Utf8Path) -> bool {
        fs::metadata(path.as_std_path())
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    /// Writes through a temporary sibling so `path` only ever holds complete content.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), HarvestError> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or(Utf8Path::new("."));
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let mut tmp = Builder::new()
            .prefix(".genome-harvest")
            .suffix(".tmp")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        tmp.write_all(content)
            .and_then(|_| tmp.flush())
            .map_err(|err| HarvestError::Filesystem(format!("write {path}: {err}")))?;
        tmp.persist(path.as_std_path())
            .map_err(|err| HarvestError::Filesystem(format!("persist {path}: {}", err.error)))?;
        Ok(())
    }

    pub fn remove_if_exists(path: &Utf8Path) -> Result<(), HarvestError> {
        match fs::remove_file(path.as_std_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(HarvestError::Filesystem(format!("remove {path}: {err}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::resolve_names;

    #[test]
    fn layout_paths() {
        let store = Store::new(Utf8PathBuf::from("out"));
        let names = resolve_names(&["ASM584v2"]).unwrap();
        assert_eq!(store.assembly_path(&names[0]), Utf8PathBuf::from("out/ASM584v2.fasta"));
        assert_eq!(store.summary_path(), Utf8PathBuf::from("out/assembly_summary.tsv"));
    }

    #[test]
    fn atomic_write_replaces_content_and_leaves_no_temp() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = root.join("a.fasta");

        assert!(!Store::is_satisfied(&path));
        Store::write_bytes_atomic(&path, b">a\nAC\n").unwrap();
        Store::write_bytes_atomic(&path, b">b\nGT\n").unwrap();
        assert!(Store::is_satisfied(&path));
        assert_eq!(std::fs::read(path.as_std_path()).unwrap(), b">b\nGT\n");

        let entries = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn empty_file_is_not_satisfied() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = root.join("empty.fasta");
        std::fs::write(path.as_std_path(), b"").unwrap();
        assert!(!Store::is_satisfied(&path));
        Store::remove_if_exists(&path).unwrap();
        Store::remove_if_exists(&path).unwrap();
        assert!(!path.as_std_path().exists());
    }
}
