//! Record bodies shipped with the binary.

pub const MADR_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/madr-template.md"
));

const RECORD_DECISIONS_FILENAME: &str = "0000-record-architecture-decisions.md";
const RECORD_DECISIONS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/0000-record-architecture-decisions.md"
));

const USE_MADR_FILENAME: &str = "0001-use-markdown-architectural-decision-records.md";
const USE_MADR: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/0001-use-markdown-architectural-decision-records.md"
));

#[derive(Debug, Clone, Copy)]
pub struct SeedRecord {
    pub filename: &'static str,
    pub content: &'static str,
}

/// Records written by `init`, in id order.
pub fn seed_records() -> [SeedRecord; 2] {
    [
        SeedRecord {
            filename: RECORD_DECISIONS_FILENAME,
            content: RECORD_DECISIONS,
        },
        SeedRecord {
            filename: USE_MADR_FILENAME,
            content: USE_MADR,
        },
    ]
}
