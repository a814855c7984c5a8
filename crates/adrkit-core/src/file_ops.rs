use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::git::{GitClient, GitError};

#[derive(Debug, Error)]
pub enum FileOpsError {
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to rename {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Git(#[from] GitError),
}

/// How record files are persisted. The engine never touches the filesystem for
/// mutations except through this trait.
pub trait FileOps {
    fn name(&self) -> &str;
    fn write(&self, path: &Path, contents: &str) -> Result<(), FileOpsError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FileOpsError>;
    /// Called once a generated file (the TOC) has been written.
    fn after_generate(&self, path: &Path) -> Result<(), FileOpsError>;
}

fn write_file(path: &Path, contents: &str) -> Result<(), FileOpsError> {
    fs::write(path, contents).map_err(|source| FileOpsError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn rename_file(from: &Path, to: &Path) -> Result<(), FileOpsError> {
    fs::rename(from, to).map_err(|source| FileOpsError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainFileOps;

impl FileOps for PlainFileOps {
    fn name(&self) -> &str {
        "plain"
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), FileOpsError> {
        write_file(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FileOpsError> {
        rename_file(from, to)
    }

    fn after_generate(&self, _path: &Path) -> Result<(), FileOpsError> {
        Ok(())
    }
}

/// Same persistence as [`PlainFileOps`], with every touched path staged.
#[derive(Debug, Clone)]
pub struct GitFileOps {
    git: GitClient,
}

impl GitFileOps {
    pub fn new(git: GitClient) -> Self {
        Self { git }
    }

    pub fn open(workdir: &Path) -> Result<Self, FileOpsError> {
        Ok(Self::new(GitClient::open(workdir)?))
    }
}

impl FileOps for GitFileOps {
    fn name(&self) -> &str {
        "git"
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), FileOpsError> {
        write_file(path, contents)?;
        self.git.stage(&[path.to_path_buf()])?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FileOpsError> {
        if self.git.is_staged_or_committed(from)? {
            self.git.move_path(from, to)?;
        } else {
            rename_file(from, to)?;
            self.git.stage(&[to.to_path_buf()])?;
        }
        info!(from = %from.display(), to = %to.display(), "staged rename");
        Ok(())
    }

    fn after_generate(&self, path: &Path) -> Result<(), FileOpsError> {
        self.git.stage(&[path.to_path_buf()])?;
        info!(path = %path.display(), "staged generated file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn plain_ops_write_and_rename() {
        let temp = TempDir::new().expect("tempdir");
        let ops = PlainFileOps;
        let from = temp.path().join("XXXX-a.md");
        let to = temp.path().join("0001-a.md");
        ops.write(&from, "content").expect("write");
        ops.rename(&from, &to).expect("rename");
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).expect("read"), "content");
    }

    #[test]
    fn plain_rename_reports_missing_source() {
        let temp = TempDir::new().expect("tempdir");
        let err = PlainFileOps
            .rename(&temp.path().join("missing.md"), &temp.path().join("b.md"))
            .expect_err("missing");
        assert!(matches!(err, FileOpsError::Rename { .. }));
    }
}
