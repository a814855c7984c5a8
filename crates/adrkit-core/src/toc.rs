use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::file_ops::{FileOps, FileOpsError, PlainFileOps};
use crate::filename::{RECORD_EXTENSION, TOC_FILENAME};
use crate::ids::{numbered_records, IdError};
use crate::record::{is_standard_status, parse_from_source, read_text, ParsedRecord};

pub const TOC_DISCLAIMER: &str =
    "<!-- This file has been generated by `adr`. Manual changes will be erased at next generation. -->";
pub const TOC_TITLE: &str = "# Architecture Decision Records";

const STANDARD_SECTIONS: [(&str, &str); 4] = [
    ("accepted", "Accepted Records"),
    ("rejected", "Rejected Records"),
    ("superseded", "Superseded Records"),
    ("deprecated", "Deprecated Records"),
];
const NON_STANDARD_SECTION: &str = "Records with non-standard statuses";

#[derive(Debug, Error)]
pub enum TocError {
    #[error(transparent)]
    Scan(#[from] IdError),
    #[error(transparent)]
    Write(#[from] FileOpsError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub status: String,
    pub status_phrase: Option<String>,
    pub link: String,
}

impl TocEntry {
    fn from_parsed(parsed: ParsedRecord, link: String) -> Self {
        Self {
            title: parsed.title,
            status: parsed.status,
            status_phrase: parsed.status_phrase,
            link,
        }
    }

    fn line(&self) -> String {
        match &self.status_phrase {
            Some(phrase) => format!(
                "* [{}]({}): {} {}\n",
                self.title, self.link, self.status, phrase
            ),
            None => format!("* [{}]({})\n", self.title, self.link),
        }
    }
}

/// Entries bucketed by status. Non-standard statuses keep first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Toc {
    standard: [Vec<TocEntry>; 4],
    non_standard: Vec<(String, Vec<TocEntry>)>,
}

impl Toc {
    pub fn push(&mut self, entry: TocEntry) {
        if let Some(idx) = STANDARD_SECTIONS
            .iter()
            .position(|(status, _)| *status == entry.status)
        {
            self.standard[idx].push(entry);
            return;
        }
        match self
            .non_standard
            .iter_mut()
            .find(|(status, _)| *status == entry.status)
        {
            Some((_, entries)) => entries.push(entry),
            None => self.non_standard.push((entry.status.clone(), vec![entry])),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(TOC_DISCLAIMER);
        out.push('\n');
        out.push_str(TOC_TITLE);
        out.push('\n');
        for ((_, heading), entries) in STANDARD_SECTIONS.iter().zip(self.standard.iter()) {
            out.push_str(&format!("\n## {}\n\n", heading));
            if entries.is_empty() {
                out.push_str("* None\n");
            }
            for entry in entries {
                out.push_str(&entry.line());
            }
        }
        out.push_str(&format!("\n## {}\n", NON_STANDARD_SECTION));
        if self.non_standard.is_empty() {
            out.push_str("\n* None\n");
        }
        for (status, entries) in &self.non_standard {
            out.push_str(&format!("\n### Status `{}`\n\n", status));
            for entry in entries {
                out.push_str(&entry.line());
            }
        }
        out
    }
}

/// Builds the TOC from the numbered records; unparseable files are skipped.
pub fn collect(records_dir: &Path) -> Result<Toc, TocError> {
    let mut toc = Toc::default();
    let records = numbered_records(records_dir)?;
    for path in records
        .iter()
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION))
    {
        let parsed = read_text(path)
            .and_then(|text| parse_from_source(&text, &path.display().to_string()));
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping record in table of content");
                continue;
            }
        };
        if !is_standard_status(&parsed.status) {
            debug!(path = %path.display(), status = %parsed.status, "non-standard status");
        }
        let link = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        toc.push(TocEntry::from_parsed(parsed, link));
    }
    Ok(toc)
}

pub fn toc_path(records_dir: &Path) -> PathBuf {
    records_dir.join(TOC_FILENAME)
}

pub fn generate(records_dir: &Path) -> Result<PathBuf, TocError> {
    generate_with(records_dir, &PlainFileOps)
}

/// Overwrites `index.md` through `ops`.
pub fn generate_with(records_dir: &Path, ops: &dyn FileOps) -> Result<PathBuf, TocError> {
    let content = collect(records_dir)?.render();
    let path = toc_path(records_dir);
    ops.write(&path, &content)?;
    ops.after_generate(&path)?;
    info!(path = %path.display(), "table of content generated");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(title: &str, status: &str, phrase: Option<&str>) -> TocEntry {
        TocEntry {
            title: title.to_string(),
            status: status.to_string(),
            status_phrase: phrase.map(str::to_string),
            link: format!("{}.md", title),
        }
    }

    #[test]
    fn empty_toc_lists_none_everywhere() {
        let expected = "\
<!-- This file has been generated by `adr`. Manual changes will be erased at next generation. -->
# Architecture Decision Records

## Accepted Records

* None

## Rejected Records

* None

## Superseded Records

* None

## Deprecated Records

* None

## Records with non-standard statuses

* None
";
        assert_eq!(Toc::default().render(), expected);
    }

    #[test]
    fn non_standard_statuses_are_grouped_in_first_seen_order() {
        let mut toc = Toc::default();
        toc.push(entry("b", "foo", Some("bar baz")));
        toc.push(entry("a", "accepted", None));
        toc.push(entry("c", "superseding", None));
        toc.push(entry("d", "foo", None));
        let rendered = toc.render();
        let tail = rendered
            .split("## Records with non-standard statuses\n")
            .nth(1)
            .expect("section");
        assert_eq!(
            tail,
            "\n### Status `foo`\n\n* [b](b.md): foo bar baz\n* [d](d.md)\n\n### Status `superseding`\n\n* [c](c.md)\n"
        );
        assert!(rendered.contains("## Accepted Records\n\n* [a](a.md)\n"));
    }
}
