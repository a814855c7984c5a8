use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::filename::is_numbered;

pub const MAX_ID: u32 = 9999;

#[derive(Debug, Error)]
pub enum IdError {
    #[error(
        "There should be at least one initial reviewed record in '{}' (usually '0000-record-architecture-decisions.md')",
        .0.display()
    )]
    NoNumberedRecord(PathBuf),
    #[error("No id left after {0}")]
    IdSpaceExhausted(String),
    #[error("Failed to scan {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Numbered records (`NNNN-*`) in the directory, sorted by name.
pub fn numbered_records(dir: &Path) -> Result<Vec<PathBuf>, IdError> {
    let read_dir = fs::read_dir(dir).map_err(|source| IdError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut entries: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(is_numbered)
                .unwrap_or(false)
        })
        .collect();
    entries.sort();
    Ok(entries)
}

pub fn format_id(value: u32) -> String {
    format!("{:04}", value)
}

pub fn next_id(dir: &Path) -> Result<String, IdError> {
    let records = numbered_records(dir)?;
    // Fixed width makes lexicographic order numeric.
    let last = records
        .last()
        .ok_or_else(|| IdError::NoNumberedRecord(dir.to_path_buf()))?;
    let name = last
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("");
    let current: u32 = name[..4].parse().unwrap_or(0);
    if current >= MAX_ID {
        return Err(IdError::IdSpaceExhausted(format_id(current)));
    }
    let next = format_id(current + 1);
    debug!(dir = %dir.display(), last = %name, next = %next, "allocated record id");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn next_id_increments_the_highest() {
        let temp = TempDir::new().expect("tempdir");
        for name in ["0001-a-reviewed-adr.md", "0002-a-reviewed-adr.md", "XXXX-a-proposed-adr.md"] {
            fs::write(temp.path().join(name), "").expect("write");
        }
        assert_eq!(next_id(temp.path()).expect("next"), "0003");
    }

    #[test]
    fn next_id_ignores_gaps_and_creation_order() {
        let temp = TempDir::new().expect("tempdir");
        for name in ["0010-late.md", "0000-seed.md", "0003-early.md"] {
            fs::write(temp.path().join(name), "").expect("write");
        }
        assert_eq!(next_id(temp.path()).expect("next"), "0011");
    }

    #[test]
    fn next_id_without_numbered_records_fails() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("XXXX-a-proposed-adr.md"), "").expect("write");
        assert!(matches!(
            next_id(temp.path()),
            Err(IdError::NoNumberedRecord(_))
        ));
    }

    #[test]
    fn next_id_stops_at_9999() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("9999-last.md"), "").expect("write");
        assert!(matches!(
            next_id(temp.path()),
            Err(IdError::IdSpaceExhausted(_))
        ));
    }
}
