//! Core domain types for adrkit: Architecture Decision Records kept as Markdown files.

pub mod checker;
pub mod config;
pub mod file_ops;
pub mod filename;
pub mod git;
pub mod ids;
pub mod lifecycle;
pub mod record;
pub mod review;
pub mod templates;
pub mod toc;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
