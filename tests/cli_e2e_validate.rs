//! End-to-end tests for the `validate` command

use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Test that a well-formed configuration validates cleanly
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_validate_good_config() {
    let temp = assert_fs::TempDir::new().unwrap();
    let config_file = temp.child(".hgsubtree.yaml");
    config_file
        .write_str(
            r#"
lib:
  source: ../upstream
  destination: |
    mkdir third_party/lib
    move *.c third_party/lib
"#,
        )
        .unwrap();

    let mut cmd = cargo_bin_cmd!("hg-subtree");

    cmd.arg("validate")
        .arg("--config")
        .arg(config_file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 destination rule(s)"));
}

/// Test that a spec without destination rules fails validation
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_validate_missing_destination() {
    let temp = assert_fs::TempDir::new().unwrap();
    let config_file = temp.child(".hgsubtree.yaml");
    config_file
        .write_str("lib:\n  source: ../upstream\n")
        .unwrap();

    let mut cmd = cargo_bin_cmd!("hg-subtree");

    cmd.arg("validate")
        .arg("--config")
        .arg(config_file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("no destination rules"));
}

/// Test that an unknown rule operation fails validation
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_validate_unknown_rule() {
    let temp = assert_fs::TempDir::new().unwrap();
    let config_file = temp.child(".hgsubtree.yaml");
    config_file
        .write_str("lib:\n  source: ../upstream\n  destination: symlink * lib\n")
        .unwrap();

    let mut cmd = cargo_bin_cmd!("hg-subtree");

    cmd.arg("validate")
        .arg("--config")
        .arg(config_file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("unknown destination rule"));
}

/// Test that a missing file is an error
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_validate_missing_file() {
    let mut cmd = cargo_bin_cmd!("hg-subtree");

    cmd.arg("validate")
        .arg("--config")
        .arg("/nonexistent/config.yaml")
        .assert()
        .failure();
}
