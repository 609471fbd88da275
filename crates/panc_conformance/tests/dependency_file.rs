//! Dependency records written by the emit stage and how the checker treats
//! damaged ones.

use std::fs;

use panc_cache::{DependencyRecord, FileStatCache, Staleness};
use panc_common::SourceKind;
use panc_conformance::{mtime, name, set_mtime, Workspace};
use panc_output::JsonFormatter;

fn built(ws: &Workspace) -> std::path::PathBuf {
    ws.write("repoA", "ns/dep.tpl", "template ns/dep;\n'/dep' = 1;\n");
    ws.write("repoA", "files/motd", "welcome\n");
    let n1 = ws.object(
        "repoA",
        "site/n1",
        "include 'ns/dep';\n'/motd' = file_contents('files/motd');\n'/issue' = file_exists('files/issue');\n",
    );
    let report = ws.compiler(&["repoA"]).run(&[n1.clone()], &[]);
    assert!(report.is_success(), "{:?}", report.failed);
    n1
}

/// Replaces the record of `site/n1` without making it older than the profile.
fn overwrite_record(ws: &Workspace, text: &str) {
    let record = ws.dep_file("site/n1");
    fs::write(&record, text).unwrap();
    set_mtime(&record, mtime(&ws.target(&JsonFormatter, "site/n1")));
}

#[test]
fn record_lists_every_consulted_source() {
    let ws = Workspace::new();
    built(&ws);
    let record = DependencyRecord::read(&ws.dep_file("site/n1")).unwrap();
    let mut seen: Vec<(String, SourceKind)> = record
        .entries()
        .iter()
        .map(|e| (e.name.to_string(), e.kind))
        .collect();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("files/issue".to_string(), SourceKind::AbsentText),
            ("files/motd".to_string(), SourceKind::Text),
            ("ns/dep".to_string(), SourceKind::Tpl),
            ("site/n1".to_string(), SourceKind::Pan),
        ]
    );
    let dep = record
        .entries()
        .iter()
        .find(|e| e.name == name("ns/dep"))
        .unwrap();
    assert_eq!(dep.file(), Some(ws.repo("repoA").join("ns/dep.tpl")));
}

#[test]
fn record_shares_the_profile_timestamp() {
    let ws = Workspace::new();
    built(&ws);
    assert_eq!(
        mtime(&ws.dep_file("site/n1")),
        mtime(&ws.target(&JsonFormatter, "site/n1"))
    );
}

#[test]
fn text_dependency_change_is_outdated() {
    let ws = Workspace::new();
    let n1 = built(&ws);
    let checker = ws.checker(&["repoA"]);
    assert!(!checker.is_outdated(&n1));

    let issue = ws.write("repoA", "files/issue", "hello\n");
    panc_conformance::set_mtime_relative(&issue, &ws.target(&JsonFormatter, "site/n1"), -5);
    assert!(checker.is_outdated(&n1));
}

#[test]
fn malformed_lines_make_the_object_outdated() {
    let ws = Workspace::new();
    let n1 = built(&ws);
    let location = url_of(&ws.repo("repoA"));
    let damaged = [
        "ns/dep\n".to_string(),
        format!("ns/dep TPL {location} extra\n"),
        format!("ns/dep WIDGET {location}\n"),
        format!("ns/dep PANX {location}\n"),
        "ns/dep TPL not-a-uri\n".to_string(),
        "ns/dep ABSENT_SOURCE file:///somewhere/\n".to_string(),
    ];
    let checker = ws.checker(&["repoA"]);
    let stats = FileStatCache::new();
    for text in &damaged {
        overwrite_record(&ws, text);
        match checker.check(&n1, &stats) {
            Staleness::Outdated(reason) => assert!(!reason.is_empty()),
            Staleness::Current => panic!("accepted damaged record {text:?}"),
        }
    }
}

#[test]
fn well_formed_rewrite_is_accepted() {
    let ws = Workspace::new();
    let n1 = built(&ws);
    let original = fs::read_to_string(ws.dep_file("site/n1")).unwrap();
    overwrite_record(&ws, &original);
    assert!(!ws.checker(&["repoA"]).is_outdated(&n1));
}

#[test]
fn record_older_than_profile_is_outdated() {
    let ws = Workspace::new();
    let n1 = built(&ws);
    panc_conformance::set_mtime_relative(
        &ws.dep_file("site/n1"),
        &ws.target(&JsonFormatter, "site/n1"),
        -1,
    );
    assert!(ws.checker(&["repoA"]).is_outdated(&n1));
}

fn url_of(dir: &std::path::Path) -> String {
    format!("file://{}/", dir.display())
}
