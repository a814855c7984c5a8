use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::checker::{self, CheckError, CheckReport};
use crate::config::AdrConfig;
use crate::file_ops::{FileOps, FileOpsError, PlainFileOps};
use crate::filename::{
    check_id_format, filename_for, is_numbered, is_unassigned, slugify, FilenameClass,
    FilenameIssue, TEMPLATE_FILENAME, UNASSIGNED_ID,
};
use crate::ids::{next_id, IdError};
use crate::record::{
    read_record, read_text, render, RecordParseError, STATUS_ACCEPTED, STATUS_PROPOSED,
    STATUS_REJECTED,
};
use crate::templates::{seed_records, MADR_TEMPLATE};
use crate::toc::{self, TocError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Directory '{}' already exists. Use the force option to erase it.", .0.display())]
    DirectoryAlreadyExists(PathBuf),
    #[error("Directory '{}' does not exist. Initialise your ADR repo first.", .0.display())]
    DirectoryDoesNotExist(PathBuf),
    #[error("Record '{}' already exists", .0.display())]
    RecordAlreadyExists(PathBuf),
    #[error("A record title cannot be empty")]
    EmptyTitle,
    #[error("Title '{0}' has no letter or digit to build a filename from")]
    TitleWithoutSlug(String),
    #[error("There is no proposed record (XXXX-*.md) in '{}'", .0.display())]
    NoProposedRecord(PathBuf),
    #[error("There are too many proposed records: {}", join_paths(.0))]
    TooManyProposedRecords(Vec<PathBuf>),
    #[error("A proposed record can only be accepted or rejected, not '{0}'")]
    InvalidReviewStatus(String),
    #[error("Status 'proposed' requires an unassigned id, '{}' already has one", .0.display())]
    StatusRequiresUnassignedId(PathBuf),
    #[error("'{}' has no id yet; accept or reject it first", .0.display())]
    RecordNotReviewed(PathBuf),
    #[error("{}", .0.message())]
    InvalidFilename(FilenameIssue),
    #[error("Record file '{}' does not exist", .0.display())]
    RecordNotFound(PathBuf),
    #[error("Repository check failed with {} violation(s):\n{}", .0.len(), .0.join("\n"))]
    RepoCheckFailed(Vec<String>),
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] RecordParseError),
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Files(#[from] FileOpsError),
    #[error(transparent)]
    Toc(#[from] TocError),
    #[error(transparent)]
    Check(#[from] CheckError),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("'{}'", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposedLookup {
    Found(PathBuf),
    NoneFound,
    TooMany(Vec<PathBuf>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Renamed { from: PathBuf, to: PathBuf },
    AlreadyUpToDate(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reviewed {
    pub path: PathBuf,
    pub id: String,
    pub status: String,
    pub toc: Option<PathBuf>,
}

/// Drives every record mutation; persistence goes through the injected [`FileOps`].
pub struct AdrEngine {
    records_dir: PathBuf,
    ops: Box<dyn FileOps>,
}

impl AdrEngine {
    pub fn new(config: &AdrConfig, ops: Box<dyn FileOps>) -> Self {
        Self::for_dir(config.records_dir(), ops)
    }

    pub fn plain(config: &AdrConfig) -> Self {
        Self::new(config, Box::new(PlainFileOps))
    }

    pub fn for_dir(records_dir: impl Into<PathBuf>, ops: Box<dyn FileOps>) -> Self {
        let records_dir = records_dir.into();
        debug!(dir = %records_dir.display(), file_ops = ops.name(), "engine ready");
        Self { records_dir, ops }
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    fn verify_records_dir(&self) -> Result<(), LifecycleError> {
        if !self.records_dir.is_dir() {
            return Err(LifecycleError::DirectoryDoesNotExist(
                self.records_dir.clone(),
            ));
        }
        Ok(())
    }

    /// Creates the records directory with its template and seed records.
    pub fn init_repo(&self, force: bool) -> Result<Vec<PathBuf>, LifecycleError> {
        let dir = &self.records_dir;
        if dir.exists() {
            if !force {
                return Err(LifecycleError::DirectoryAlreadyExists(dir.clone()));
            }
            info!(dir = %dir.display(), "erasing existing records directory");
            fs::remove_dir_all(dir).map_err(|source| LifecycleError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        fs::create_dir_all(dir).map_err(|source| LifecycleError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut created = Vec::new();
        let template = dir.join(TEMPLATE_FILENAME);
        self.ops.write(&template, MADR_TEMPLATE)?;
        created.push(template);

        for seed in seed_records() {
            let path = dir.join(seed.filename);
            let content = render(seed.content, None, Some(STATUS_ACCEPTED))?;
            self.ops.write(&path, &content)?;
            created.push(path);
        }
        info!(dir = %dir.display(), files = created.len(), "records directory initialised");
        Ok(created)
    }

    fn template(&self) -> Result<String, LifecycleError> {
        let on_disk = self.records_dir.join(TEMPLATE_FILENAME);
        if on_disk.is_file() {
            return Ok(read_text(&on_disk)?);
        }
        debug!("no template in records directory, using the embedded one");
        Ok(MADR_TEMPLATE.to_string())
    }

    /// Path the new record for `title` would get, once every precondition of
    /// [`AdrEngine::new_adr`] holds. Nothing is written.
    pub fn verify_new_adr(&self, title: &str) -> Result<PathBuf, LifecycleError> {
        self.verify_records_dir()?;
        let title = title.trim();
        if title.is_empty() {
            return Err(LifecycleError::EmptyTitle);
        }
        if slugify(title).is_empty() {
            return Err(LifecycleError::TitleWithoutSlug(title.to_string()));
        }
        let path = self.records_dir.join(filename_for(UNASSIGNED_ID, title));
        if path.exists() {
            return Err(LifecycleError::RecordAlreadyExists(path));
        }
        Ok(path)
    }

    /// Writes `XXXX-<slug>.md` from the template with status `proposed`.
    pub fn new_adr(&self, title: &str) -> Result<PathBuf, LifecycleError> {
        let path = self.verify_new_adr(title)?;
        let title = title.trim();
        let content = render(&self.template()?, Some(title), Some(STATUS_PROPOSED))?;
        self.ops.write(&path, &content)?;
        info!(path = %path.display(), "new record created");
        Ok(path)
    }

    pub fn find_proposed(&self) -> Result<ProposedLookup, LifecycleError> {
        self.verify_records_dir()?;
        let read_dir = fs::read_dir(&self.records_dir).map_err(|source| LifecycleError::Io {
            path: self.records_dir.clone(),
            source,
        })?;
        let mut found: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(is_unassigned)
                    .unwrap_or(false)
            })
            .collect();
        found.sort();
        Ok(match found.len() {
            0 => ProposedLookup::NoneFound,
            1 => ProposedLookup::Found(found.remove(0)),
            _ => ProposedLookup::TooMany(found),
        })
    }

    /// Assigns the next id to the single proposed record and sets its review status.
    pub fn accept_or_reject(&self, status: &str, toc: bool) -> Result<Reviewed, LifecycleError> {
        if status != STATUS_ACCEPTED && status != STATUS_REJECTED {
            return Err(LifecycleError::InvalidReviewStatus(status.to_string()));
        }
        let proposed = match self.find_proposed()? {
            ProposedLookup::Found(path) => path,
            ProposedLookup::NoneFound => {
                return Err(LifecycleError::NoProposedRecord(self.records_dir.clone()))
            }
            ProposedLookup::TooMany(paths) => {
                return Err(LifecycleError::TooManyProposedRecords(paths))
            }
        };

        let record = read_record(&proposed)?;
        let id = next_id(&self.records_dir)?;
        let reviewed = self.records_dir.join(filename_for(&id, &record.title));
        if reviewed.exists() {
            return Err(LifecycleError::RecordAlreadyExists(reviewed));
        }

        let content = render(&read_text(&proposed)?, None, Some(status))?;
        self.ops.write(&proposed, &content)?;
        self.ops.rename(&proposed, &reviewed)?;
        info!(
            from = %proposed.display(),
            to = %reviewed.display(),
            status = %status,
            "record reviewed"
        );

        let toc = if toc {
            Some(self.generate_toc()?)
        } else {
            None
        };
        Ok(Reviewed {
            path: reviewed,
            id,
            status: status.to_string(),
            toc,
        })
    }

    /// Rewrites the status of a reviewed record in place, refreshing its date.
    pub fn set_status(&self, path: &Path, status: &str) -> Result<PathBuf, LifecycleError> {
        if !path.is_file() {
            return Err(LifecycleError::RecordNotFound(path.to_path_buf()));
        }
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        if !is_numbered(name) {
            return Err(LifecycleError::RecordNotReviewed(path.to_path_buf()));
        }
        if status == STATUS_PROPOSED {
            return Err(LifecycleError::StatusRequiresUnassignedId(
                path.to_path_buf(),
            ));
        }
        let content = render(&read_text(path)?, None, Some(status))?;
        self.ops.write(path, &content)?;
        info!(path = %path.display(), status = %status, "record status updated");
        Ok(path.to_path_buf())
    }

    /// Renames the record so its filename slug matches its title again.
    pub fn sync_filename(&self, path: &Path) -> Result<SyncOutcome, LifecycleError> {
        if !path.is_file() {
            return Err(LifecycleError::RecordNotFound(path.to_path_buf()));
        }
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        if !check_id_format(&name, FilenameClass::Any) {
            return Err(LifecycleError::InvalidFilename(FilenameIssue::Format {
                filename: name,
                class: FilenameClass::Any,
            }));
        }
        let record = read_record(path)?;
        let dir = path.parent().unwrap_or(Path::new(""));
        let expected = dir.join(filename_for(&record.id, &record.title));
        if expected == path {
            info!(path = %path.display(), "filename already up to date");
            return Ok(SyncOutcome::AlreadyUpToDate(path.to_path_buf()));
        }
        if expected.exists() {
            return Err(LifecycleError::RecordAlreadyExists(expected));
        }
        self.ops.rename(path, &expected)?;
        info!(from = %path.display(), to = %expected.display(), "filename synced with title");
        Ok(SyncOutcome::Renamed {
            from: path.to_path_buf(),
            to: expected,
        })
    }

    /// Full report; never fails on violations.
    pub fn check_report(&self, require_no_proposed: bool) -> Result<CheckReport, LifecycleError> {
        self.verify_records_dir()?;
        Ok(checker::check_repo(&self.records_dir, require_no_proposed)?)
    }

    pub fn check_repo(&self, require_no_proposed: bool) -> Result<CheckReport, LifecycleError> {
        let report = self.check_report(require_no_proposed)?;
        if !report.is_ok() {
            return Err(LifecycleError::RepoCheckFailed(report.messages()));
        }
        info!(records = report.records, "repository check passed");
        Ok(report)
    }

    pub fn generate_toc(&self) -> Result<PathBuf, LifecycleError> {
        self.verify_records_dir()?;
        Ok(toc::generate_with(&self.records_dir, self.ops.as_ref())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine(temp: &TempDir) -> AdrEngine {
        AdrEngine::for_dir(temp.path().join("docs/adr"), Box::new(PlainFileOps))
    }

    #[test]
    fn init_refuses_existing_directory_without_force() {
        let temp = TempDir::new().expect("tempdir");
        let engine = engine(&temp);
        engine.init_repo(false).expect("init");
        let err = engine.init_repo(false).expect_err("exists");
        assert!(matches!(err, LifecycleError::DirectoryAlreadyExists(_)));
    }

    #[test]
    fn init_with_force_erases_previous_content() {
        let temp = TempDir::new().expect("tempdir");
        let engine = engine(&temp);
        engine.init_repo(false).expect("init");
        let stray = engine.records_dir().join("stray.md");
        fs::write(&stray, "x").expect("write");
        let created = engine.init_repo(true).expect("force");
        assert!(!stray.exists());
        assert_eq!(created.len(), 3);
    }

    #[test]
    fn new_adr_requires_directory_and_title() {
        let temp = TempDir::new().expect("tempdir");
        let engine = engine(&temp);
        assert!(matches!(
            engine.new_adr("Title"),
            Err(LifecycleError::DirectoryDoesNotExist(_))
        ));
        engine.init_repo(false).expect("init");
        assert!(matches!(engine.new_adr("  "), Err(LifecycleError::EmptyTitle)));
    }

    #[test]
    fn new_adr_refuses_titles_without_a_slug() {
        let temp = TempDir::new().expect("tempdir");
        let engine = engine(&temp);
        engine.init_repo(false).expect("init");
        assert!(matches!(
            engine.new_adr("!!!"),
            Err(LifecycleError::TitleWithoutSlug(_))
        ));
        assert!(!engine.records_dir().join("XXXX-.md").exists());
    }

    #[test]
    fn verify_new_adr_writes_nothing() {
        let temp = TempDir::new().expect("tempdir");
        let engine = engine(&temp);
        engine.init_repo(false).expect("init");
        let path = engine.verify_new_adr(" Some title ").expect("verify");
        assert_eq!(path, engine.records_dir().join("XXXX-some-title.md"));
        assert!(!path.exists());

        engine.new_adr("Some title").expect("new");
        assert!(matches!(
            engine.verify_new_adr("Some title"),
            Err(LifecycleError::RecordAlreadyExists(_))
        ));
    }

    #[test]
    fn new_adr_uses_template_on_disk() {
        let temp = TempDir::new().expect("tempdir");
        let engine = engine(&temp);
        engine.init_repo(false).expect("init");
        fs::write(
            engine.records_dir().join(TEMPLATE_FILENAME),
            "# t\n\n* Status: s\n* Date: d\n\nCustom body\n",
        )
        .expect("write");
        let path = engine.new_adr("My title").expect("new");
        let text = fs::read_to_string(path).expect("read");
        assert!(text.contains("Custom body"));
        assert!(text.starts_with("# My title\n"));
    }

    #[test]
    fn accept_rejects_non_review_statuses() {
        let temp = TempDir::new().expect("tempdir");
        let engine = engine(&temp);
        assert!(matches!(
            engine.accept_or_reject("deprecated", false),
            Err(LifecycleError::InvalidReviewStatus(_))
        ));
    }

    #[test]
    fn set_status_needs_a_reviewed_record() {
        let temp = TempDir::new().expect("tempdir");
        let engine = engine(&temp);
        engine.init_repo(false).expect("init");
        let proposed = engine.new_adr("Idea").expect("new");
        assert!(matches!(
            engine.set_status(&proposed, "deprecated"),
            Err(LifecycleError::RecordNotReviewed(_))
        ));
        let seed = engine
            .records_dir()
            .join("0001-use-markdown-architectural-decision-records.md");
        assert!(matches!(
            engine.set_status(&seed, STATUS_PROPOSED),
            Err(LifecycleError::StatusRequiresUnassignedId(_))
        ));
        engine.set_status(&seed, "deprecated").expect("deprecate");
        assert_eq!(read_record(&seed).expect("record").status, "deprecated");
    }

    #[test]
    fn too_many_proposed_message_lists_paths() {
        let err = LifecycleError::TooManyProposedRecords(vec![
            PathBuf::from("XXXX-bar.md"),
            PathBuf::from("XXXX-foo.md"),
        ]);
        assert_eq!(
            err.to_string(),
            "There are too many proposed records: 'XXXX-bar.md', 'XXXX-foo.md'"
        );
    }
}
