//! Incremental build behaviour: a full build followed by dependency checks
//! after the sources, search path or outputs change.

use std::fs;

use panc_build::Artifact;
use panc_conformance::{name, set_mtime_relative, Workspace};
use panc_output::JsonFormatter;

/// Lays out `site/n1`, which includes `ns/dep` and probes `ns/ghost`, in
/// `repoA`, builds it over `repos`, and returns the object's file.
fn built(ws: &Workspace, repos: &[&str]) -> std::path::PathBuf {
    ws.write("repoA", "ns/dep.tpl", "template ns/dep;\n'/dep' = 1;\n");
    let n1 = ws.object(
        "repoA",
        "site/n1",
        "include 'ns/dep';\ninclude if_exists('ns/ghost');\n'/name' = 'n1';\n",
    );
    let report = ws.compiler(repos).run(&[n1.clone()], &[]);
    assert!(report.is_success(), "{:?}", report.failed);
    n1
}

#[test]
fn second_run_finds_nothing_outdated() {
    let ws = Workspace::new();
    let n1 = built(&ws, &["repoA"]);
    let n2 = ws.object("repoA", "site/n2", "include 'ns/dep';\n");
    ws.compiler(&["repoA"]).run(&[n2.clone()], &[]);

    let files = vec![n1, n2];
    assert!(ws.checker(&["repoA"]).filter_outdated(&files).is_empty());

    let again = ws.compiler(&["repoA"]).run_incremental(&files, &[]);
    assert!(again.succeeded.is_empty());
    assert_eq!(again.skipped, files);
}

#[test]
fn deleted_target_is_outdated() {
    let ws = Workspace::new();
    let n1 = built(&ws, &["repoA"]);
    let checker = ws.checker(&["repoA"]);
    assert!(!checker.is_outdated(&n1));

    fs::remove_file(ws.target(&JsonFormatter, "site/n1")).unwrap();
    assert!(ws.dep_file("site/n1").exists());
    assert!(checker.is_outdated(&n1));
}

#[test]
fn deleted_dependency_record_is_outdated() {
    let ws = Workspace::new();
    let n1 = built(&ws, &["repoA"]);
    fs::remove_file(ws.dep_file("site/n1")).unwrap();
    assert!(ws.checker(&["repoA"]).is_outdated(&n1));
}

#[test]
fn dependency_modified_after_build_is_outdated() {
    let ws = Workspace::new();
    let n1 = built(&ws, &["repoA"]);
    let dep = ws.repo("repoA").join("ns/dep.tpl");
    let target = ws.target(&JsonFormatter, "site/n1");

    set_mtime_relative(&dep, &target, 10);
    assert!(ws.checker(&["repoA"]).is_outdated(&n1));

    set_mtime_relative(&dep, &target, -10);
    assert!(!ws.checker(&["repoA"]).is_outdated(&n1));
}

#[test]
fn dependency_shadowed_by_earlier_directory_is_outdated() {
    let ws = Workspace::new();
    let n1 = built(&ws, &["repoA", "repoB"]);
    let target = ws.target(&JsonFormatter, "site/n1");

    // Same name appears in a directory searched after repoA: still current.
    let later = ws.write("repoB", "ns/dep.tpl", "template ns/dep;\n");
    set_mtime_relative(&later, &target, -10);
    assert!(!ws.checker(&["repoA", "repoB"]).is_outdated(&n1));

    // Searched first, it now wins the lookup.
    assert!(ws.checker(&["repoB", "repoA"]).is_outdated(&n1));
}

#[test]
fn dependency_moved_between_directories_is_outdated() {
    let ws = Workspace::new();
    let n1 = built(&ws, &["repoA", "repoB"]);
    let target = ws.target(&JsonFormatter, "site/n1");

    fs::remove_file(ws.repo("repoA").join("ns/dep.tpl")).unwrap();
    let moved = ws.write("repoB", "ns/dep.tpl", "template ns/dep;\n'/dep' = 1;\n");
    set_mtime_relative(&moved, &target, -10);
    assert!(ws.checker(&["repoA", "repoB"]).is_outdated(&n1));
}

#[test]
fn dependency_removed_from_disk_is_outdated() {
    let ws = Workspace::new();
    let n1 = built(&ws, &["repoA"]);
    fs::remove_file(ws.repo("repoA").join("ns/dep.tpl")).unwrap();
    assert!(ws.checker(&["repoA"]).is_outdated(&n1));
}

#[test]
fn dependency_off_the_search_path_keeps_object_current() {
    let ws = Workspace::new();
    let n1 = built(&ws, &["repoA"]);
    fs::create_dir_all(ws.repo("repoB")).unwrap();
    // The recorded file is still on disk but no searched directory holds it.
    assert!(!ws.checker(&["repoB"]).is_outdated(&n1));
}

#[test]
fn absent_dependency_appearing_is_outdated() {
    let ws = Workspace::new();
    let n1 = built(&ws, &["repoA", "repoB"]);
    let record = fs::read_to_string(ws.dep_file("site/n1")).unwrap();
    assert!(record.lines().any(|l| l == "ns/ghost ABSENT_SOURCE"), "{record}");

    let checker = ws.checker(&["repoA", "repoB"]);
    assert!(!checker.is_outdated(&n1));

    let ghost = ws.write("repoB", "ns/ghost.pan", "template ns/ghost;\n");
    set_mtime_relative(&ghost, &ws.target(&JsonFormatter, "site/n1"), -10);
    assert!(checker.is_outdated(&n1));
}

#[test]
fn ignored_dependencies_never_make_objects_outdated() {
    let ws = Workspace::new();
    ws.write("repoA", "ns/noisy_clock.pan", "template ns/noisy_clock;\n'/t' = 1;\n");
    let n1 = ws.object("repoA", "site/n1", "include 'ns/noisy_clock';\n");
    assert!(ws.compiler(&["repoA"]).run(&[n1.clone()], &[]).is_success());

    set_mtime_relative(
        &ws.repo("repoA").join("ns/noisy_clock.pan"),
        &ws.target(&JsonFormatter, "site/n1"),
        60,
    );
    assert!(ws.checker(&["repoA"]).is_outdated(&n1));
    let ignoring = ws
        .checker(&["repoA"])
        .with_ignore_pattern("ns/noisy.*")
        .unwrap();
    assert!(!ignoring.is_outdated(&n1));

    // The pattern must match the whole name.
    let partial = ws.checker(&["repoA"]).with_ignore_pattern("noisy").unwrap();
    assert!(partial.is_outdated(&n1));
}

#[test]
fn incremental_run_rebuilds_only_outdated_objects() {
    let ws = Workspace::new();
    ws.write("repoA", "ns/a.pan", "template ns/a;\n'/a' = 1;\n");
    ws.write("repoA", "ns/b.pan", "template ns/b;\n'/b' = 1;\n");
    let na = ws.object("repoA", "site/na", "include 'ns/a';\n");
    let nb = ws.object("repoA", "site/nb", "include 'ns/b';\n");
    let files = vec![na.clone(), nb.clone()];
    assert!(ws.compiler(&["repoA"]).run(&files, &[]).is_success());

    set_mtime_relative(
        &ws.repo("repoA").join("ns/b.pan"),
        &ws.target(&JsonFormatter, "site/nb"),
        30,
    );
    let report = ws.compiler(&["repoA"]).run_incremental(&files, &[]);
    assert_eq!(report.skipped, vec![na]);
    assert!(report.is_success(), "{:?}", report.failed);
    assert_eq!(report.succeeded, vec![Artifact::Object(name("site/nb"))]);
}
