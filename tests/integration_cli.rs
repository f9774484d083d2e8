//! CLI-level integration tests, offline only: everything here drives the
//! binary against temporary working directories and explicit `--repo`
//! addresses, never the network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tributors(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tributors").unwrap();
    cmd.current_dir(dir.path());
    cmd
}

#[test]
fn test_version_subcommand() {
    let dir = TempDir::new().unwrap();
    tributors(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_init_allcontrib_creates_file() {
    let dir = TempDir::new().unwrap();
    tributors(&dir)
        .args(["init", "allcontrib", "--repo", "singularityhub/sregistry"])
        .assert()
        .success();

    let content =
        std::fs::read_to_string(dir.path().join(".all-contributorsrc")).unwrap();
    assert!(content.contains("\"projectName\": \"sregistry\""));
    assert!(content.contains("\"projectOwner\": \"singularityhub\""));
    assert!(content.contains("\"contributorsPerLine\": 7"));
}

#[test]
fn test_init_refuses_existing_without_force() {
    let dir = TempDir::new().unwrap();
    tributors(&dir)
        .args(["init", "allcontrib", "--repo", "owner/repo"])
        .assert()
        .success();

    tributors(&dir)
        .args(["init", "allcontrib", "--repo", "owner/repo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    tributors(&dir)
        .args(["init", "allcontrib", "--repo", "owner/repo", "--force"])
        .assert()
        .success();
}

#[test]
fn test_init_malformed_repository() {
    let dir = TempDir::new().unwrap();
    tributors(&dir)
        .args(["init", "allcontrib", "--repo", "not-a-repo-address"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed repository address"));
}

#[test]
fn test_update_missing_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    // The contributor-list file must pre-exist for update; failing this
    // precondition never reaches the network.
    tributors(&dir)
        .args(["update", "allcontrib", "--repo", "owner/repo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_unknown_resource_rejected_at_boundary() {
    let dir = TempDir::new().unwrap();
    tributors(&dir)
        .args(["update", "bitbucket"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_update_lookup_auto_detect_failure() {
    let dir = TempDir::new().unwrap();
    tributors(&dir)
        .arg("update-lookup")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No resources auto-detected"));
}

#[test]
fn test_update_lookup_backfills_cache_from_mailmap() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".tributors"),
        r#"{"vsoch": {"email": "vsoch@example.com"}}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join(".mailmap"),
        "Vanessa Sochat <vsoch@example.com>\n",
    )
    .unwrap();

    tributors(&dir).arg("update-lookup").assert().success();

    let cache = std::fs::read_to_string(dir.path().join(".tributors")).unwrap();
    assert!(cache.contains("Vanessa Sochat"));
}

#[test]
fn test_update_lookup_mailmap_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".mailmap"), " <joe.smith@gmail.com>\n").unwrap();

    tributors(&dir)
        .args(["update-lookup", "mailmap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<joe.smith@gmail.com>"));
}

#[test]
fn test_skip_cache_leaves_no_cache_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".mailmap"),
        "Vanessa Sochat <vsoch@example.com>\n",
    )
    .unwrap();

    tributors(&dir)
        .args(["--skip-cache", "update-lookup", "mailmap"])
        .assert()
        .success();
    assert!(!dir.path().join(".tributors").exists());
}

#[test]
fn test_invalid_contribution_type_is_fatal() {
    let dir = TempDir::new().unwrap();
    tributors(&dir)
        .args([
            "update",
            "allcontrib",
            "--repo",
            "owner/repo",
            "--ctype",
            "sorcery",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid contribution type sorcery"));
}

#[test]
fn test_init_zenodo_requires_doi() {
    let dir = TempDir::new().unwrap();
    tributors(&dir)
        .args(["init", "zenodo", "--repo", "owner/repo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--doi"));
}
