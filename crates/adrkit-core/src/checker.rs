use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::filename::{
    is_numbered, is_reserved, is_unassigned, validate_filename, RECORD_EXTENSION,
};
use crate::record::{
    parse_from_source, read_record, read_text, RecordParseError, VALID_CONTENT_FORMAT,
};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Failed to list records in {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// All `*.md` files of the records directory except the template and the TOC, sorted.
pub fn list_records(dir: &Path) -> Result<Vec<PathBuf>, CheckError> {
    let read_dir = fs::read_dir(dir).map_err(|source| CheckError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut records: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION))
        .filter(|path| !is_reserved(path))
        .collect();
    records.sort();
    debug!(dir = %dir.display(), count = records.len(), "listed records");
    Ok(records)
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|name| name.to_str()).unwrap_or("")
}

/// Groups of numbered records sharing the same id, each group sorted.
pub fn find_duplicate_ids(records: &[PathBuf]) -> Vec<Vec<PathBuf>> {
    let mut by_id: BTreeMap<&str, Vec<PathBuf>> = BTreeMap::new();
    for path in records {
        let name = file_name(path);
        if is_numbered(name) {
            by_id.entry(&name[..4]).or_default().push(path.clone());
        }
    }
    by_id
        .into_values()
        .filter(|paths| paths.len() > 1)
        .map(|mut paths| {
            paths.sort();
            paths
        })
        .collect()
}

/// Every `XXXX-*` record when more than one exists; at most one may wait for review.
pub fn find_too_many_proposed(records: &[PathBuf]) -> Vec<PathBuf> {
    let mut unassigned: Vec<PathBuf> = records
        .iter()
        .filter(|path| is_unassigned(file_name(path)))
        .cloned()
        .collect();
    if unassigned.len() < 2 {
        return Vec::new();
    }
    unassigned.sort();
    unassigned
}

pub fn find_malformed_content(records: &[PathBuf]) -> Vec<(PathBuf, RecordParseError)> {
    records
        .iter()
        .filter_map(|path| {
            let outcome = read_text(path)
                .and_then(|text| parse_from_source(&text, &path.display().to_string()));
            outcome.err().map(|err| (path.clone(), err))
        })
        .collect()
}

/// Filename problems of every record not in `excluding`.
pub fn find_filename_violations(records: &[PathBuf], excluding: &[PathBuf]) -> Vec<String> {
    let mut messages = Vec::new();
    for path in records.iter().filter(|path| !excluding.contains(path)) {
        let Ok(record) = read_record(path) else {
            continue;
        };
        for issue in validate_filename(path, &record.status, &record.title) {
            messages.push(issue.message());
        }
    }
    messages
}

pub fn find_proposed(records: &[PathBuf]) -> Vec<PathBuf> {
    records
        .iter()
        .filter(|path| {
            read_record(path)
                .map(|record| record.is_proposed())
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct MalformedRecord {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub records_dir: PathBuf,
    pub records: usize,
    pub duplicate_ids: Vec<Vec<PathBuf>>,
    pub too_many_proposed: Vec<PathBuf>,
    pub malformed: Vec<MalformedRecord>,
    pub filename_violations: Vec<String>,
    pub proposed: Vec<PathBuf>,
    pub require_no_proposed: bool,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.duplicate_ids.is_empty()
            && self.too_many_proposed.is_empty()
            && self.malformed.is_empty()
            && self.filename_violations.is_empty()
            && (!self.require_no_proposed || self.proposed.is_empty())
    }

    pub fn violation_count(&self) -> usize {
        self.messages().len()
    }

    pub fn messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        for group in &self.duplicate_ids {
            let paths: Vec<String> = group.iter().map(|p| p.display().to_string()).collect();
            let id = group.first().map(|p| &file_name(p)[..4]).unwrap_or("");
            messages.push(format!(
                "Multiple records with id '{}': {}",
                id,
                paths.join(", ")
            ));
        }
        if !self.too_many_proposed.is_empty() {
            let paths: Vec<String> = self
                .too_many_proposed
                .iter()
                .map(|p| format!("'{}'", p.display()))
                .collect();
            messages.push(format!(
                "There are too many proposed records: {}",
                paths.join(", ")
            ));
        }
        for malformed in &self.malformed {
            messages.push(format!(
                "{}. Expected content format:\n{}",
                malformed.error, VALID_CONTENT_FORMAT
            ));
        }
        messages.extend(self.filename_violations.iter().cloned());
        if self.require_no_proposed {
            for path in &self.proposed {
                messages.push(format!(
                    "'{}': record is still proposed, accept or reject it first",
                    path.display()
                ));
            }
        }
        messages
    }
}

/// Runs every check and collects every violation; nothing short-circuits.
pub fn check_repo(dir: &Path, require_no_proposed: bool) -> Result<CheckReport, CheckError> {
    let records = list_records(dir)?;

    let duplicate_ids = find_duplicate_ids(&records);
    for group in &duplicate_ids {
        error!(paths = ?group, "duplicate record id");
    }

    let too_many_proposed = find_too_many_proposed(&records);
    if !too_many_proposed.is_empty() {
        error!(paths = ?too_many_proposed, "more than one proposed record");
    }

    let malformed_pairs = find_malformed_content(&records);
    for (path, err) in &malformed_pairs {
        error!(path = %path.display(), error = %err, "malformed record content");
    }
    let excluded: Vec<PathBuf> = malformed_pairs.iter().map(|(path, _)| path.clone()).collect();

    let filename_violations = find_filename_violations(&records, &excluded);
    for message in &filename_violations {
        error!("{}", message);
    }

    let proposed = find_proposed(&records);
    if require_no_proposed {
        for path in &proposed {
            warn!(path = %path.display(), "proposed record present");
        }
    }

    Ok(CheckReport {
        records_dir: dir.to_path_buf(),
        records: records.len(),
        duplicate_ids,
        too_many_proposed,
        malformed: malformed_pairs
            .into_iter()
            .map(|(path, err)| MalformedRecord {
                path,
                error: err.to_string(),
            })
            .collect(),
        filename_violations,
        proposed,
        require_no_proposed,
    })
}
