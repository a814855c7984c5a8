use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use thiserror::Error;
use tracing::{debug, info};

pub const MAIN_BRANCH: &str = "main";

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git executable not found on PATH")]
    GitNotInstalled,
    #[error("No Git repository found in directory '{}'. Please initialise a Git repository before running command.", .0.display())]
    InvalidRepository(PathBuf),
    #[error("Files are staged in the Git index. Clean before running command.")]
    IndexNotEmpty,
    #[error("Branch '{0}' already exists. Clean before running command.")]
    BranchAlreadyExists(String),
    #[error("Branch '{0}' does not exist. Correct before running command.")]
    MainBranchDoesNotExist(String),
    #[error("'{}' was expected to be staged or committed", .0.display())]
    NotStagedOrCommitted(PathBuf),
    #[error("'{}' was expected to be staged", .0.display())]
    NotStaged(PathBuf),
    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },
    #[error("Failed to run git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Thin wrapper over the `git` binary, scoped to one working tree.
#[derive(Debug, Clone)]
pub struct GitClient {
    workdir: PathBuf,
}

impl GitClient {
    pub fn open(workdir: &Path) -> Result<Self, GitError> {
        which::which("git").map_err(|_| GitError::GitNotInstalled)?;
        let client = Self {
            workdir: workdir.to_path_buf(),
        };
        let output = client.output(&["rev-parse", "--is-inside-work-tree"])?;
        if !output.status.success() {
            return Err(GitError::InvalidRepository(workdir.to_path_buf()));
        }
        Ok(client)
    }

    fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        debug!(args = ?args, "git");
        Command::new("git")
            .arg("-C")
            .arg(&self.workdir)
            .args(args)
            .output()
            .map_err(|source| GitError::Spawn {
                command: args.first().copied().unwrap_or("").to_string(),
                source,
            })
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(GitError::Command {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn path_arg(&self, path: &Path) -> String {
        path.strip_prefix(&self.workdir)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    pub fn stage(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let args: Vec<String> = paths.iter().map(|path| self.path_arg(path)).collect();
        let mut full = vec!["add", "--"];
        full.extend(args.iter().map(String::as_str));
        self.run(&full)?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-m", message])?;
        info!(message = %message, "committed");
        Ok(())
    }

    pub fn has_commits(&self) -> bool {
        self.output(&["rev-parse", "--verify", "--quiet", "HEAD"])
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    pub fn current_branch(&self) -> Option<String> {
        let raw = self.run(&["symbolic-ref", "--short", "HEAD"]).ok()?;
        if raw.is_empty() {
            None
        } else {
            Some(raw)
        }
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        let reference = format!("refs/heads/{}", name);
        self.output(&["show-ref", "--verify", "--quiet", &reference])
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    pub fn verify_branch_does_not_exist(&self, name: &str) -> Result<(), GitError> {
        info!(branch = %name, "verifying branch does not exist");
        if self.branch_exists(name) {
            return Err(GitError::BranchAlreadyExists(name.to_string()));
        }
        Ok(())
    }

    pub fn verify_main_branch_exists(&self, name: &str) -> Result<(), GitError> {
        info!(branch = %name, "verifying branch exists");
        if !self.branch_exists(name) {
            return Err(GitError::MainBranchDoesNotExist(name.to_string()));
        }
        Ok(())
    }

    pub fn checkout(&self, name: &str) -> Result<(), GitError> {
        self.run(&["checkout", name])?;
        Ok(())
    }

    /// Creates `name` from `from` and switches to it.
    pub fn create_branch_and_checkout(&self, name: &str, from: &str) -> Result<(), GitError> {
        info!(branch = %name, from = %from, "creating branch");
        self.verify_branch_does_not_exist(name)?;
        self.run(&["checkout", "-b", name, from])?;
        Ok(())
    }

    /// Staged paths relative to the working tree. Works on repositories without commits.
    pub fn staged_paths(&self) -> Result<Vec<String>, GitError> {
        let raw = if self.has_commits() {
            self.run(&["diff", "--cached", "--name-only"])?
        } else {
            self.run(&["ls-files", "--cached"])?
        };
        Ok(raw
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    pub fn verify_index_empty(&self) -> Result<(), GitError> {
        info!("verifying Git index is empty");
        if !self.staged_paths()?.is_empty() {
            return Err(GitError::IndexNotEmpty);
        }
        Ok(())
    }

    pub fn is_staged(&self, path: &Path) -> Result<bool, GitError> {
        let target = self.path_arg(path);
        Ok(self.staged_paths()?.iter().any(|staged| *staged == target))
    }

    pub fn is_staged_or_committed(&self, path: &Path) -> Result<bool, GitError> {
        let target = self.path_arg(path);
        let tracked = self.run(&["ls-files", "--error-unmatch", "--", &target]).is_ok();
        Ok(tracked || self.is_staged(path)?)
    }

    /// Renames a tracked file and stages the rename.
    pub fn move_path(&self, src: &Path, dst: &Path) -> Result<(), GitError> {
        let src_arg = self.path_arg(src);
        let dst_arg = self.path_arg(dst);
        self.run(&["mv", "--", &src_arg, &dst_arg])?;
        Ok(())
    }
}
