use std::path::Path;
use std::process::Command;

use git2::{Repository, Signature};

fn commit_all(repo: &Repository) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("alice", "alice@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
        .unwrap();
}

fn report(a_entry: &str) -> String {
    format!(
        r#"{{
    "components": [
        {{"key": "p", "type": "project", "status": "same", "reportRef": 1}},
        {{"key": "p:a.rs", "type": "file", "status": "changed", "reportRef": 2, "path": "a.rs"}},
        {{"key": "p:b.rs", "type": "file", "status": "changed", "reportRef": 3, "path": "b.rs"}},
        {{"key": "p:c.rs", "type": "file", "status": "changed", "reportRef": 4, "path": "c.rs"}}
    ],
    "changesets": [{a_entry}]
}}"#
    )
}

fn run_resolve(dir: &Path, report_name: &str) -> serde_json::Value {
    let output = Command::new(env!("CARGO_BIN_EXE_scmtrail"))
        .args([
            "resolve",
            "--report",
            report_name,
            "--store",
            "state/scm.db",
            "--date",
            "2024-05-01T10:00:00Z",
            "--persist",
            "--format",
            "json",
        ])
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "scmtrail resolve failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn resolve_then_reuse_persisted_info() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    std::fs::write(dir.path().join("a.rs"), "fn a() {}\n").unwrap();
    std::fs::write(dir.path().join("b.rs"), "fn b() {}\n").unwrap();
    std::fs::write(dir.path().join("c.rs"), "fn c() {}\n").unwrap();
    commit_all(&repo);
    std::fs::write(dir.path().join("b.rs"), "fn b() {}\nfn b2() {}\n").unwrap();

    let fresh = r#"{"componentRef": 2, "changesets": [{"revision": "r9", "author": "bob", "date": 1700000000000}], "changesetIndexByLine": [0]}"#;
    std::fs::write(dir.path().join("first.json"), report(fresh)).unwrap();

    let first = run_resolve(dir.path(), "first.json");
    let files = first.as_array().unwrap();
    assert_eq!(files.len(), 3, "only files are listed");

    assert_eq!(files[0]["source"], "report");
    assert_eq!(files[0]["latest"]["author"], "bob");

    assert_eq!(files[1]["source"], "generated");
    assert_eq!(files[1]["lines"], 1);
    assert_eq!(files[1]["latest"]["date"], "2024-05-01T10:00:00Z");

    assert!(files[2]["source"].is_null());

    let copy = r#"{"componentRef": 2, "copyFromPrevious": true}"#;
    std::fs::write(dir.path().join("second.json"), report(copy)).unwrap();

    let second = run_resolve(dir.path(), "second.json");
    let files = second.as_array().unwrap();
    assert_eq!(files[0]["source"], "persisted");
    assert_eq!(files[0]["latest"]["revision"], "r9");
}

#[test]
fn file_without_info_is_dropped_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    std::fs::write(dir.path().join("a.rs"), "one\ntwo\nthree\n").unwrap();
    commit_all(&repo);

    let single = |status: &str, entry: &str| {
        format!(
            r#"{{
    "components": [
        {{"key": "p:a.rs", "type": "file", "status": "{status}", "reportRef": 2, "path": "a.rs"}}
    ],
    "changesets": [{entry}]
}}"#
        )
    };

    let fresh = r#"{"componentRef": 2, "changesets": [{"revision": "r1", "author": "bob", "date": 1700000000000}], "changesetIndexByLine": [0, 0, 0]}"#;
    std::fs::write(dir.path().join("first.json"), single("added", fresh)).unwrap();
    let first = run_resolve(dir.path(), "first.json");
    assert_eq!(first[0]["source"], "report");
    assert_eq!(first[0]["lines"], 3);

    // Deleting a line leaves no new or changed lines to generate.
    std::fs::write(dir.path().join("a.rs"), "one\nthree\n").unwrap();
    std::fs::write(dir.path().join("second.json"), single("changed", "")).unwrap();
    let second = run_resolve(dir.path(), "second.json");
    assert!(second[0]["source"].is_null());

    std::fs::write(dir.path().join("third.json"), single("same", "")).unwrap();
    let third = run_resolve(dir.path(), "third.json");
    assert!(third[0]["source"].is_null());
    assert_eq!(third[0]["lines"], 0);
}

#[test]
fn missing_report_fails() {
    let dir = tempfile::tempdir().unwrap();
    Repository::init(dir.path()).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_scmtrail"))
        .args(["resolve", "--report", "absent.json"])
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.json"));
}
