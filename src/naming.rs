use std::collections::{HashMap, HashSet};

use crate::domain::{AssemblyRecord, ResolvedAssembly, ResolvedName};
use crate::error::HarvestError;

const SUFFIXES: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Leading and trailing whitespace runs become `_` too: `" Foo X"` is `_Foo_X`.
pub fn normalize_name(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut in_whitespace = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                normalized.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        normalized.push(match ch {
            '/' | '\\' | '\0' => '_',
            other => other,
        });
    }
    normalized
}

/// Every member of a duplicate group is suffixed, the first occurrence included.
pub fn resolve_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<ResolvedName>, HarvestError> {
    let normalized = names
        .iter()
        .map(|raw| {
            let name = normalize_name(raw.as_ref());
            if name.is_empty() || name == "." || name == ".." {
                return Err(HarvestError::InvalidName(raw.as_ref().to_string()));
            }
            Ok(name)
        })
        .collect::<Result<Vec<_>, HarvestError>>()?;

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (position, name) in normalized.iter().enumerate() {
        let members = groups.entry(name.as_str()).or_insert_with(|| {
            order.push(name.as_str());
            Vec::new()
        });
        members.push(position);
    }

    let mut resolved = normalized.clone();
    for name in order {
        let positions = &groups[name];
        if positions.len() == 1 {
            continue;
        }
        if positions.len() > SUFFIXES.len() {
            return Err(HarvestError::TooManyDuplicates {
                name: name.to_string(),
                count: positions.len(),
            });
        }
        for (idx, &position) in positions.iter().enumerate() {
            resolved[position].push(char::from(SUFFIXES[idx]));
        }
    }

    let mut seen = HashSet::with_capacity(resolved.len());
    for name in &resolved {
        if !seen.insert(name.as_str()) {
            return Err(HarvestError::NameCollision(name.clone()));
        }
    }

    Ok(resolved.into_iter().map(ResolvedName::new_unchecked).collect())
}

pub fn resolve_assemblies(
    records: Vec<AssemblyRecord>,
) -> Result<Vec<ResolvedAssembly>, HarvestError> {
    let names = resolve_names(
        &records
            .iter()
            .map(|record| record.name.as_str())
            .collect::<Vec<_>>(),
    )?;
    Ok(records
        .into_iter()
        .zip(names)
        .map(|(record, name)| ResolvedAssembly { record, name })
        .collect())
}
