//! Git review workflow: one branch per record, conventional commit messages.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use crate::checker::CheckReport;
use crate::config::AdrConfig;
use crate::file_ops::GitFileOps;
use crate::filename::{slugify, title_lowercase};
use crate::git::{GitClient, GitError, MAIN_BRANCH};
use crate::lifecycle::{AdrEngine, LifecycleError};
use crate::record::{
    read_record, RecordParseError, STATUS_DEPRECATED, STATUS_PROPOSED, STATUS_SUPERSEDING,
};

pub const INIT_BRANCH: &str = "adr-init-repo";

const PREFIX_PROPOSED: &str = "chore(adr):";
const PREFIX_ADR_ONLY_REPO: &str = "feat(adr):";
const PREFIX_PROJECT_REPO: &str = "docs(adr):";

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Status '{status}' of '{}' does not map to a review request (expected proposed, deprecated or superseding)", .path.display())]
    StatusIncompatibleWithReview { path: PathBuf, status: String },
    #[error("Pre-merge checks failed with {0} violation(s)")]
    PreMergeChecksFailed(usize),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Parse(#[from] RecordParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewRequest {
    Propose,
    Deprecate,
    Supersede,
}

impl ReviewRequest {
    pub fn from_status(status: &str) -> Option<Self> {
        match status {
            STATUS_PROPOSED => Some(ReviewRequest::Propose),
            STATUS_DEPRECATED => Some(ReviewRequest::Deprecate),
            STATUS_SUPERSEDING => Some(ReviewRequest::Supersede),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewRequest::Propose => "propose",
            ReviewRequest::Deprecate => "deprecate",
            ReviewRequest::Supersede => "supersede",
        }
    }
}

pub fn default_commit_prefix(adr_only_repo: bool) -> &'static str {
    if adr_only_repo {
        PREFIX_ADR_ONLY_REPO
    } else {
        PREFIX_PROJECT_REPO
    }
}

pub fn commit_prefix_for_status(status: &str, adr_only_repo: bool) -> &'static str {
    if status == STATUS_PROPOSED {
        PREFIX_PROPOSED
    } else {
        default_commit_prefix(adr_only_repo)
    }
}

/// `{prefix} [{status}] {title in lowercase}`
pub fn commit_message(path: &Path, adr_only_repo: bool) -> Result<String, ReviewError> {
    let record = read_record(path)?;
    Ok(format!(
        "{} [{}] {}",
        commit_prefix_for_status(&record.status, adr_only_repo),
        record.status,
        title_lowercase(&record.title)
    ))
}

/// `adr-{request}-{slug}`
pub fn branch_title(path: &Path) -> Result<String, ReviewError> {
    let record = read_record(path)?;
    let request = ReviewRequest::from_status(&record.status).ok_or_else(|| {
        ReviewError::StatusIncompatibleWithReview {
            path: path.to_path_buf(),
            status: record.status.clone(),
        }
    })?;
    Ok(format!("adr-{}-{}", request.as_str(), record.slug))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub path: PathBuf,
    pub branch: String,
}

pub struct ReviewWorkflow {
    engine: AdrEngine,
    git: GitClient,
    adr_only_repo: bool,
    config_file: PathBuf,
}

impl ReviewWorkflow {
    pub fn open(config: &AdrConfig) -> Result<Self, ReviewError> {
        let git = GitClient::open(config.root())?;
        let engine = AdrEngine::new(config, Box::new(GitFileOps::new(git.clone())));
        Ok(Self {
            engine,
            git,
            adr_only_repo: config.adr_only_repo(),
            config_file: config.path(),
        })
    }

    pub fn engine(&self) -> &AdrEngine {
        &self.engine
    }

    pub fn commit_message_default_prefix(&self) -> &'static str {
        default_commit_prefix(self.adr_only_repo)
    }

    pub fn commit_message(&self, path: &Path) -> Result<String, ReviewError> {
        commit_message(path, self.adr_only_repo)
    }

    /// Initialises the records directory and commits it, on `adr-init-repo` when
    /// `main` already exists, on the current branch of an empty repository otherwise.
    pub fn git_init(&self, force: bool) -> Result<Vec<PathBuf>, ReviewError> {
        self.git.verify_index_empty()?;
        self.git.verify_branch_does_not_exist(INIT_BRANCH)?;

        if self.git.branch_exists(MAIN_BRANCH) {
            self.git.checkout(MAIN_BRANCH)?;
            self.git.create_branch_and_checkout(INIT_BRANCH, MAIN_BRANCH)?;
        } else {
            info!("Git repo empty, files will be committed to the current branch");
        }

        let mut created = self.engine.init_repo(force)?;
        if self.config_file.is_file() {
            created.push(self.config_file.clone());
        }
        self.git.stage(&created)?;

        let message = format!(
            "{} initialise adr repository",
            self.commit_message_default_prefix()
        );
        self.git.commit(&message)?;
        info!(
            branch = %self.git.current_branch().unwrap_or_default(),
            message = %message,
            "ADR Git repo initialised"
        );
        Ok(created)
    }

    /// Creates the proposal on its own review branch, cut from `main`, and stages it.
    /// The branch is only created once the record itself can be written.
    pub fn git_new(&self, title: &str) -> Result<NewReview, ReviewError> {
        self.git.verify_index_empty()?;
        self.git.verify_main_branch_exists(MAIN_BRANCH)?;
        self.engine.verify_new_adr(title)?;

        let branch = format!("adr-{}-{}", ReviewRequest::Propose.as_str(), slugify(title));
        self.git.create_branch_and_checkout(&branch, MAIN_BRANCH)?;
        let path = self.engine.new_adr(title)?;
        info!(path = %path.display(), branch = %branch, "proposal staged");
        Ok(NewReview { path, branch })
    }

    pub fn commit_record(&self, path: &Path) -> Result<String, ReviewError> {
        if !self.git.is_staged(path)? {
            return Err(GitError::NotStaged(path.to_path_buf()).into());
        }
        let message = self.commit_message(path)?;
        self.git.commit(&message)?;
        Ok(message)
    }

    pub fn pre_merge_checks(&self) -> Result<CheckReport, ReviewError> {
        let report = self.engine.check_report(true)?;
        if !report.is_ok() {
            for message in report.messages() {
                error!("{}", message);
            }
            return Err(ReviewError::PreMergeChecksFailed(report.violation_count()));
        }
        info!("pre-merge checks passed");
        Ok(report)
    }
}
