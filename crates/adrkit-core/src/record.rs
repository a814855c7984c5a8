use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use regex::Regex;
use thiserror::Error;

use crate::filename::{slugify, split_filename};

pub const TITLE_MARKER: &str = "# ";
pub const STATUS_MARKER: &str = "* Status:";
pub const DATE_MARKER: &str = "* Date:";

pub const STATUS_PROPOSED: &str = "proposed";
pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_REJECTED: &str = "rejected";
pub const STATUS_DEPRECATED: &str = "deprecated";
pub const STATUS_SUPERSEDING: &str = "superseding";

pub const STANDARD_STATUSES: [&str; 5] = [
    STATUS_PROPOSED,
    STATUS_ACCEPTED,
    STATUS_REJECTED,
    STATUS_DEPRECATED,
    STATUS_SUPERSEDING,
];

/// Shape every record is expected to follow, shown when a file cannot be parsed.
pub const VALID_CONTENT_FORMAT: &str = ">>>>>\n# Title\n\n* Status: a_status\n[..]\n* Date: YYYY-MM-DD\n[..]\n<<<<<";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordParseError {
    #[error("No title line ('# ...') found in {0}")]
    TitleNotFound(String),
    #[error("No status line ('* Status: ...') found in {0}")]
    StatusNotFound(String),
    #[error("No date line ('* Date: ...') found in {0}")]
    DateNotFound(String),
    #[error("A title or a status has to be given")]
    InvalidArguments,
    #[error("Failed to access {path}: {message}")]
    Io { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub title: String,
    pub status: String,
    pub status_phrase: Option<String>,
    pub date: String,
}

/// A record read from disk, with the parts derived from its filename.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub status: String,
    pub status_phrase: Option<String>,
    pub date: String,
    pub slug: String,
    pub path: PathBuf,
}

impl Record {
    pub fn is_proposed(&self) -> bool {
        self.status == STATUS_PROPOSED
    }
}

pub fn is_standard_status(status: &str) -> bool {
    STANDARD_STATUSES.contains(&status)
}

pub fn parse(text: &str) -> Result<ParsedRecord, RecordParseError> {
    parse_from_source(text, "<content>")
}

/// Markers are searched in order: title, then status, then date. Each search starts
/// on the line after the previous match, so a status line above the title is never
/// seen as a status.
pub fn parse_from_source(text: &str, source: &str) -> Result<ParsedRecord, RecordParseError> {
    let lines: Vec<&str> = text.lines().collect();

    let (title_idx, title) = find_marker(&lines, 0, TITLE_MARKER)
        .ok_or_else(|| RecordParseError::TitleNotFound(source.to_string()))?;
    let (status_idx, full_status) = find_marker(&lines, title_idx + 1, STATUS_MARKER)
        .ok_or_else(|| RecordParseError::StatusNotFound(source.to_string()))?;
    let (_, date) = find_marker(&lines, status_idx + 1, DATE_MARKER)
        .ok_or_else(|| RecordParseError::DateNotFound(source.to_string()))?;

    let (status, status_phrase) = split_status(&full_status);
    Ok(ParsedRecord {
        title,
        status,
        status_phrase,
        date,
    })
}

fn find_marker(lines: &[&str], start: usize, marker: &str) -> Option<(usize, String)> {
    lines
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, line)| line.starts_with(marker))
        .map(|(idx, line)| (idx, line[marker.len()..].trim().to_string()))
}

fn split_status(full_status: &str) -> (String, Option<String>) {
    match full_status.split_once(char::is_whitespace) {
        Some((status, phrase)) => (status.to_string(), Some(phrase.trim().to_string())),
        None => (full_status.to_string(), None),
    }
}

pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Rewrites the title and/or status line and always refreshes the date line.
pub fn render(
    text: &str,
    title: Option<&str>,
    status: Option<&str>,
) -> Result<String, RecordParseError> {
    render_on(text, title, status, &today())
}

pub fn render_on(
    text: &str,
    title: Option<&str>,
    status: Option<&str>,
    date: &str,
) -> Result<String, RecordParseError> {
    let title = title.filter(|value| !value.is_empty());
    let status = status.filter(|value| !value.is_empty());
    if title.is_none() && status.is_none() {
        return Err(RecordParseError::InvalidArguments);
    }

    let mut rendered = text.to_string();
    if let Some(title) = title {
        rendered = replace_first_line(&rendered, r"(?m)^# .*$", &format!("# {}", title));
    }
    if let Some(status) = status {
        rendered = replace_first_line(
            &rendered,
            r"(?m)^\* Status: .*$",
            &format!("{} {}", STATUS_MARKER, status),
        );
    }
    rendered = replace_first_line(
        &rendered,
        r"(?m)^\* Date: .*$",
        &format!("{} {}", DATE_MARKER, date),
    );
    Ok(rendered)
}

fn replace_first_line(text: &str, pattern: &str, replacement: &str) -> String {
    let re = Regex::new(pattern).expect("regex");
    re.replacen(text, 1, regex::NoExpand(replacement)).into_owned()
}

pub fn read_record(path: &Path) -> Result<Record, RecordParseError> {
    let text = read_text(path)?;
    let parsed = parse_from_source(&text, &path.display().to_string())?;
    let id = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(split_filename)
        .map(|(id, _)| id.to_string())
        .unwrap_or_default();
    Ok(Record {
        id,
        slug: slugify(&parsed.title),
        title: parsed.title,
        status: parsed.status,
        status_phrase: parsed.status_phrase,
        date: parsed.date,
        path: path.to_path_buf(),
    })
}

pub fn read_text(path: &Path) -> Result<String, RecordParseError> {
    fs::read_to_string(path).map_err(|err| RecordParseError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Returns the rendered content without writing it; callers decide how to persist.
pub fn render_file(
    path: &Path,
    title: Option<&str>,
    status: Option<&str>,
) -> Result<String, RecordParseError> {
    let text = read_text(path)?;
    render(&text, title, status)
}
