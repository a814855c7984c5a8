use std::fs;
use std::path::{Path, PathBuf};

use adrkit_core::config::{AdrConfig, SETTING_RECORDS_DIR};
use adrkit_core::file_ops::PlainFileOps;
use adrkit_core::ids::IdError;
use adrkit_core::lifecycle::{AdrEngine, LifecycleError, ProposedLookup, SyncOutcome};
use adrkit_core::record::{read_record, today};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn engine(root: &Path) -> AdrEngine {
    AdrEngine::plain(&AdrConfig::load(root).expect("config"))
}

fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn write_record(dir: &Path, name: &str, title: &str, status: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(
        &path,
        format!(
            "# {}\n\n* Status: {}\n* Date: 2020-01-01\n\n## Context\n",
            title, status
        ),
    )
    .expect("write record");
    path
}

#[test]
fn init_creates_template_and_accepted_seeds() {
    let temp = TempDir::new().expect("tempdir");
    let engine = engine(temp.path());
    let created = engine.init_repo(false).expect("init");

    assert_eq!(created.len(), 3);
    assert_eq!(
        names(&temp.path().join("docs/adr")),
        vec![
            "0000-record-architecture-decisions.md",
            "0001-use-markdown-architectural-decision-records.md",
            "template.md",
        ]
    );
    for seed in &created[1..] {
        let record = read_record(seed).expect("seed");
        assert_eq!(record.status, "accepted");
        assert_eq!(record.date, today());
    }
}

#[test]
fn propose_then_accept_assigns_next_id() {
    let temp = TempDir::new().expect("tempdir");
    let engine = engine(temp.path());
    engine.init_repo(false).expect("init");

    let proposed = engine.new_adr("My ADR Title").expect("new");
    assert_eq!(
        proposed.file_name().and_then(|n| n.to_str()),
        Some("XXXX-my-adr-title.md")
    );
    let record = read_record(&proposed).expect("proposed");
    assert_eq!(record.title, "My ADR Title");
    assert_eq!(record.status, "proposed");

    let reviewed = engine.accept_or_reject("accepted", false).expect("accept");
    assert_eq!(reviewed.id, "0002");
    assert!(!proposed.exists());
    assert_eq!(
        reviewed.path,
        temp.path().join("docs/adr/0002-my-adr-title.md")
    );
    let record = read_record(&reviewed.path).expect("reviewed");
    assert_eq!(record.status, "accepted");
    assert_eq!(record.date, today());
    assert!(reviewed.toc.is_none());
}

#[test]
fn reject_with_toc_regenerates_index() {
    let temp = TempDir::new().expect("tempdir");
    let engine = engine(temp.path());
    engine.init_repo(false).expect("init");
    engine.new_adr("Drop the cache").expect("new");

    let reviewed = engine.accept_or_reject("rejected", true).expect("reject");
    let toc = reviewed.toc.expect("toc generated");
    let text = fs::read_to_string(toc).expect("toc");
    assert!(text.contains("## Rejected Records\n\n* [Drop the cache](0002-drop-the-cache.md)\n"));
}

#[test]
fn new_adr_refuses_to_overwrite() {
    let temp = TempDir::new().expect("tempdir");
    let engine = engine(temp.path());
    engine.init_repo(false).expect("init");
    engine.new_adr("Same title").expect("first");
    assert!(matches!(
        engine.new_adr("Same title"),
        Err(LifecycleError::RecordAlreadyExists(_))
    ));
}

#[test]
fn two_proposals_block_review_and_list_both_paths() {
    let temp = TempDir::new().expect("tempdir");
    let dir = temp.path().join("docs/adr");
    fs::create_dir_all(&dir).expect("dir");
    write_record(&dir, "0000-seed.md", "Seed", "accepted");
    let foo = write_record(&dir, "XXXX-foo.md", "Foo", "proposed");
    let bar = write_record(&dir, "XXXX-bar.md", "Bar", "proposed");
    let engine = engine(temp.path());

    assert_eq!(
        engine.find_proposed().expect("lookup"),
        ProposedLookup::TooMany(vec![bar.clone(), foo.clone()])
    );
    let err = engine.accept_or_reject("accepted", false).expect_err("too many");
    match &err {
        LifecycleError::TooManyProposedRecords(paths) => {
            assert_eq!(paths, &vec![bar.clone(), foo.clone()])
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("XXXX-foo.md"));
    assert!(message.contains("XXXX-bar.md"));
}

#[test]
fn review_without_proposal_fails() {
    let temp = TempDir::new().expect("tempdir");
    let engine = engine(temp.path());
    engine.init_repo(false).expect("init");
    assert_eq!(engine.find_proposed().expect("lookup"), ProposedLookup::NoneFound);
    assert!(matches!(
        engine.accept_or_reject("accepted", false),
        Err(LifecycleError::NoProposedRecord(_))
    ));
}

#[test]
fn review_without_seed_record_fails() {
    let temp = TempDir::new().expect("tempdir");
    let dir = temp.path().join("docs/adr");
    fs::create_dir_all(&dir).expect("dir");
    let proposed = write_record(&dir, "XXXX-lonely.md", "Lonely", "proposed");

    let err = engine(temp.path())
        .accept_or_reject("accepted", false)
        .expect_err("no seed");
    assert!(matches!(
        err,
        LifecycleError::Id(IdError::NoNumberedRecord(_))
    ));
    assert!(proposed.exists());
}

#[test]
fn review_of_unparseable_proposal_aborts_untouched() {
    let temp = TempDir::new().expect("tempdir");
    let dir = temp.path().join("docs/adr");
    fs::create_dir_all(&dir).expect("dir");
    write_record(&dir, "0000-seed.md", "Seed", "accepted");
    let broken = dir.join("XXXX-broken.md");
    fs::write(&broken, "* Status: proposed\n* Date: 2020-01-01\n").expect("write");

    assert!(matches!(
        engine(temp.path()).accept_or_reject("accepted", false),
        Err(LifecycleError::Parse(_))
    ));
    assert!(broken.exists());
}

#[test]
fn sync_filename_renames_once_then_is_a_no_op() {
    let temp = TempDir::new().expect("tempdir");
    let dir = temp.path().join("docs/adr");
    fs::create_dir_all(&dir).expect("dir");
    let drifted = write_record(&dir, "0003-old-name.md", "My New Name", "accepted");
    let before = fs::read_to_string(&drifted).expect("read");
    let engine = engine(temp.path());

    let expected = dir.join("0003-my-new-name.md");
    assert_eq!(
        engine.sync_filename(&drifted).expect("sync"),
        SyncOutcome::Renamed {
            from: drifted.clone(),
            to: expected.clone(),
        }
    );
    assert_eq!(
        engine.sync_filename(&expected).expect("sync again"),
        SyncOutcome::AlreadyUpToDate(expected.clone())
    );
    assert_eq!(fs::read_to_string(&expected).expect("read"), before);
}

#[test]
fn sync_filename_rejects_unknown_id_shape() {
    let temp = TempDir::new().expect("tempdir");
    let path = write_record(temp.path(), "adr-7.md", "Seven", "accepted");
    assert!(matches!(
        engine(temp.path()).sync_filename(&path),
        Err(LifecycleError::InvalidFilename(_))
    ));
}

#[test]
fn records_dir_setting_moves_the_repository() {
    let temp = TempDir::new().expect("tempdir");
    let mut config = AdrConfig::load(temp.path()).expect("config");
    config.set(SETTING_RECORDS_DIR, "architecture").expect("set");
    config.persist().expect("persist");

    let engine = AdrEngine::new(
        &AdrConfig::load(temp.path()).expect("reload"),
        Box::new(PlainFileOps),
    );
    engine.init_repo(false).expect("init");
    assert!(temp
        .path()
        .join("architecture/0000-record-architecture-decisions.md")
        .is_file());
}
