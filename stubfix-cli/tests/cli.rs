//! End-to-end tests for the stubfix binary.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SIP: &str = "\
class voidptr:
    def asarray(self, size: int = -1) -> array: ...
";

const QTWIDGETS: &str = "\
import typing

from PyQt6 import QtCore


class QLineEdit(QWidget):
    def setText(self, a0: str) -> None: ...
";

const RULES: &str = r#"
[[rule]]
module = "QtWidgets"
class = "QLineEdit"
method = "setText"
params = [{ name = "a0", current = "str", desired = "typing.Optional[str]" }]
"#;

fn stubfix() -> Command {
    Command::cargo_bin("stubfix").expect("stubfix binary")
}

fn create_temp_repo(stubs: &[(&str, &str)]) -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    let root = td.path();

    fs::create_dir_all(root.join("PyQt6-stubs")).unwrap();
    for (name, text) in stubs {
        fs::write(root.join("PyQt6-stubs").join(name), text).unwrap();
    }
    fs::write(root.join("rules.toml"), RULES).unwrap();
    td
}

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_fix_is_dry_run_by_default() {
    let temp = create_temp_repo(&[("sip.pyi", SIP)]);

    stubfix()
        .current_dir(temp.path())
        .args(["fix", "--no-checker", "--rules", "rules.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 changed"))
        .stdout(predicate::str::contains("dry-run"));

    assert_eq!(read(temp.path().join("PyQt6-stubs/sip.pyi")), SIP);

    let out = temp.path().join("artifacts/stubfix");
    assert!(out.join("report.json").is_file());
    assert!(out.join("report.md").is_file());
    assert!(read(out.join("patch.diff")).contains("array[int]"));
}

#[test]
fn test_fix_apply_writes_stubs() {
    let temp = create_temp_repo(&[("sip.pyi", SIP)]);

    stubfix()
        .current_dir(temp.path())
        .args(["fix", "--no-checker", "--rules", "rules.toml", "--apply"])
        .assert()
        .success()
        .stdout(predicate::str::contains("verdict: pass"));

    assert_eq!(
        read(temp.path().join("PyQt6-stubs/sip.pyi")),
        "class voidptr:\n    def asarray(self, size: int = -1) -> array[int]: ...\n"
    );
}

#[test]
fn test_fix_reads_captured_diagnostics() {
    let temp = create_temp_repo(&[("QtWidgets.pyi", QTWIDGETS)]);
    fs::create_dir_all(temp.path().join("captured")).unwrap();
    fs::write(
        temp.path().join("captured/QtWidgets.txt"),
        "QtWidgets.pyi:7: error: Name \"QtGui\" is not defined  [name-defined]\n",
    )
    .unwrap();

    stubfix()
        .current_dir(temp.path())
        .args([
            "fix",
            "--diagnostics-dir",
            "captured",
            "--rules",
            "rules.toml",
            "--apply",
        ])
        .assert()
        .success();

    let fixed = read(temp.path().join("PyQt6-stubs/QtWidgets.pyi"));
    assert!(fixed.contains("from PyQt6 import QtCore, QtGui\n"));
    assert!(fixed.contains("def setText(self, a0: typing.Optional[str]) -> None: ..."));
}

#[test]
fn test_malformed_diagnostics_fail_the_run() {
    let temp = create_temp_repo(&[("QtWidgets.pyi", QTWIDGETS), ("sip.pyi", SIP)]);
    fs::create_dir_all(temp.path().join("captured")).unwrap();
    fs::write(temp.path().join("captured/QtWidgets.txt"), "garbage\n").unwrap();

    stubfix()
        .current_dir(temp.path())
        .args(["fix", "--diagnostics-dir", "captured", "--rules", "rules.toml"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("1 failed"));

    let report = read(temp.path().join("artifacts/stubfix/report.json"));
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(value["verdict"]["status"], "fail");
    assert_eq!(value["files"][1]["status"], "changed");
}

#[test]
fn test_unmatched_rule_exits_two() {
    let temp = create_temp_repo(&[("QtWidgets.pyi", "class QLabel(QWidget): ...\n")]);

    stubfix()
        .current_dir(temp.path())
        .args(["fix", "--no-checker", "--rules", "rules.toml"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("verdict: warn"));

    let md = read(temp.path().join("artifacts/stubfix/report.md"));
    assert!(md.contains("QLineEdit.setText"));
}

#[test]
fn test_file_arguments_select_modules() {
    let temp = create_temp_repo(&[("QtWidgets.pyi", QTWIDGETS), ("sip.pyi", SIP)]);

    stubfix()
        .current_dir(temp.path())
        .args([
            "fix",
            "PyQt6-stubs/sip.pyi",
            "--no-checker",
            "--rules",
            "rules.toml",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1 file(s)"));
}

#[test]
fn test_config_file_sets_directories() {
    let temp = create_temp_repo(&[]);
    fs::create_dir_all(temp.path().join("stubs")).unwrap();
    fs::write(temp.path().join("stubs/sip.pyi"), SIP).unwrap();
    fs::write(
        temp.path().join("stubfix.toml"),
        "[stubs]\ndir = \"stubs\"\n\n[output]\ndir = \"out\"\n",
    )
    .unwrap();

    stubfix()
        .current_dir(temp.path())
        .args(["fix", "--no-checker", "--rules", "rules.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 changed"));

    assert!(temp.path().join("out/report.json").is_file());
}

#[test]
fn test_invalid_config_is_an_error() {
    let temp = create_temp_repo(&[("sip.pyi", SIP)]);
    fs::write(temp.path().join("stubfix.toml"), "[stubs\n").unwrap();

    stubfix()
        .current_dir(temp.path())
        .args(["fix", "--no-checker"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_rules_file_is_an_error() {
    let temp = create_temp_repo(&[("sip.pyi", SIP)]);

    stubfix()
        .current_dir(temp.path())
        .args(["fix", "--no-checker", "--rules", "nope.toml"])
        .assert()
        .code(1);
}

#[test]
fn test_checker_flags_conflict() {
    stubfix()
        .args(["fix", "--no-checker", "--diagnostics-dir", "captured"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_list_rules_text() {
    stubfix()
        .arg("list-rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("QLineEdit.setText"))
        .stdout(predicate::str::contains("voidptr.setwriteable"));
}

#[test]
fn test_list_rules_json_filters_module() {
    let output = stubfix()
        .args(["list-rules", "--module", "sip", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rules = value["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["method"], "setwriteable");
    assert!(value["members"].as_array().unwrap().is_empty());
}

#[test]
fn test_list_custom() {
    stubfix()
        .arg("list-custom")
        .assert()
        .success()
        .stdout(predicate::str::contains("pyqtslot_decorator"))
        .stdout(predicate::str::contains("sip.voidptr.asarray"));
}

#[test]
fn test_unknown_format_is_rejected() {
    stubfix()
        .args(["list-custom", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
