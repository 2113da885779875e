use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssemblyAccession(String);

impl AssemblyAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssemblyAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssemblyAccession {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = normalized.starts_with("GCF_") || normalized.starts_with("GCA_");
        let parts = normalized.split('.').collect::<Vec<_>>();
        let has_numeric = parts
            .first()
            .map(|prefix| prefix.trim_start_matches("GCF_").trim_start_matches("GCA_"))
            .map(|rest| rest.chars().all(|ch| ch.is_ascii_digit()) && !rest.is_empty())
            .unwrap_or(false);
        if !is_valid || !has_numeric {
            return Err(HarvestError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyRecord {
    pub accession: AssemblyAccession,
    pub name: String,
    pub species: String,
    pub isolate: String,
    pub release_date: String,
    pub submitter: String,
    pub scaffold_n50: u64,
    /// GenBank directory holding the assembly files; may be empty.
    pub base_path: String,
}

impl AssemblyRecord {
    /// `<base>/<basename(base)>_genomic.fna.gz`, with NCBI ftp paths served over https.
    pub fn archive_url(&self) -> Result<String, HarvestError> {
        let base = self.base_path.trim().trim_end_matches('/');
        let label = base.rsplit('/').next().unwrap_or_default();
        if base.is_empty() || label.is_empty() {
            return Err(HarvestError::MissingArchivePath(
                self.accession.to_string(),
            ));
        }
        Ok(normalize_url(&format!("{base}/{label}_genomic.fna.gz")))
    }
}

pub fn normalize_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("ftp://ftp.ncbi.nlm.nih.gov/") {
        return format!("https://ftp.ncbi.nlm.nih.gov/{rest}");
    }
    url.to_string()
}

/// Disambiguated assembly name, safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResolvedName(String);

impl ResolvedName {
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<&str> for ResolvedName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedAssembly {
    pub record: AssemblyRecord,
    pub name: ResolvedName,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn record(base_path: &str) -> AssemblyRecord {
        AssemblyRecord {
            accession: "GCA_000005845.2".parse().unwrap(),
            name: "ASM584v2".to_string(),
            species: "Escherichia coli".to_string(),
            isolate: String::new(),
            release_date: "2013/11/06 00:00".to_string(),
            submitter: "Univ. Wisconsin".to_string(),
            scaffold_n50: 4641652,
            base_path: base_path.to_string(),
        }
    }

    #[test]
    fn parse_accession_valid() {
        let acc: AssemblyAccession = " GCF_000005845.2 ".parse().unwrap();
        assert_eq!(acc.as_str(), "GCF_000005845.2");
    }

    #[test]
    fn parse_accession_invalid() {
        let err = "ABC_123".parse::<AssemblyAccession>().unwrap_err();
        assert_matches!(err, HarvestError::InvalidAccession(_));
    }

    #[test]
    fn archive_url_uses_directory_basename() {
        let rec = record("ftp://ftp.ncbi.nlm.nih.gov/genomes/all/GCA/000/005/845/GCA_000005845.2_ASM584v2");
        assert_eq!(
            rec.archive_url().unwrap(),
            "https://ftp.ncbi.nlm.nih.gov/genomes/all/GCA/000/005/845/GCA_000005845.2_ASM584v2/GCA_000005845.2_ASM584v2_genomic.fna.gz"
        );
    }

    #[test]
    fn archive_url_tolerates_trailing_slash() {
        let rec = record("https://example.org/all/GCA_1_x/");
        assert_eq!(
            rec.archive_url().unwrap(),
            "https://example.org/all/GCA_1_x/GCA_1_x_genomic.fna.gz"
        );
    }

    #[test]
    fn archive_url_requires_base_path() {
        let err = record("").archive_url().unwrap_err();
        assert_matches!(err, HarvestError::MissingArchivePath(acc) if acc == "GCA_000005845.2");
    }
}
