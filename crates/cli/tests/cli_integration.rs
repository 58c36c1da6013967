//! CLI integration tests for the `yoml` binary.
//!
//! Each test writes a catalog and documents into a temp directory and runs
//! the binary against them, checking exit codes, stdout and stderr.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CATALOG: &str = r#"
config:
  rejectUnconsumedKeys: true
types:
  - name: shape
    attributes: { name: string, color: string }
    constructors: [no-args]
    serializers:
      - explicitField:
          fieldName: name
          keyName: shape-name
          alias: my-name
  - name: shape-with-size
    extends: shape
    attributes: { size: int }
    serializers:
      - explicitField: { fieldName: name, keyName: shape-w-size-name }
      - explicitField: { fieldName: size, alias: shape-size, constraint: required }
"#;

/// Helper: a `yoml` command with logging silenced so stderr holds only errors.
fn yoml() -> Command {
    let mut cmd = cargo_bin_cmd!("yoml");
    cmd.env("YOML_LOG", "off");
    cmd
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("catalog.yaml"), CATALOG).expect("write catalog");
        Fixture { dir }
    }

    fn catalog(&self) -> PathBuf {
        self.dir.path().join("catalog.yaml")
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("write document");
        path
    }
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    yoml()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Convert documents to typed objects"));
}

#[test]
fn version_exits_0() {
    yoml()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("yoml"));
}

#[test]
fn unknown_subcommand_fails() {
    yoml().arg("frobnicate").assert().failure();
}

// ──────────────────────────────────────────────
// 2. read
// ──────────────────────────────────────────────

#[test]
fn read_prints_typed_value() {
    let fx = Fixture::new();
    let doc = fx.file("doc.yaml", "type: shape-with-size\nmy-name: diamond\nshape-size: 3\n");

    let assert = yoml()
        .arg("read")
        .arg("--catalog")
        .arg(fx.catalog())
        .arg(&doc)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is JSON");
    assert_eq!(value["$type"], "shape-with-size");
    assert_eq!(value["name"], "diamond");
    assert_eq!(value["size"], 3);
}

#[test]
fn read_with_expected_type() {
    let fx = Fixture::new();
    let doc = fx.file("doc.json", r#"{"shape-name": "kite", "fields": {"color": "red"}}"#);

    yoml()
        .arg("read")
        .arg("--catalog")
        .arg(fx.catalog())
        .arg("--type")
        .arg("shape")
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"$type\": \"shape\""))
        .stdout(predicate::str::contains("\"color\": \"red\""));
}

#[test]
fn read_missing_required_field_exits_1() {
    let fx = Fixture::new();
    let doc = fx.file("doc.yaml", "type: shape-with-size\nmy-name: diamond\n");

    yoml()
        .arg("read")
        .arg("--catalog")
        .arg(fx.catalog())
        .arg(&doc)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("read failed"))
        .stderr(predicate::str::contains("size"));
}

#[test]
fn read_error_as_json() {
    let fx = Fixture::new();
    let doc = fx.file("doc.yaml", "type: no-such-type\n");

    let assert = yoml()
        .args(["--output", "json", "read", "--catalog"])
        .arg(fx.catalog())
        .arg(&doc)
        .assert()
        .failure()
        .code(1);

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    let err: serde_json::Value = serde_json::from_str(stderr.trim()).expect("stderr is JSON");
    assert!(err["error"].as_str().is_some_and(|m| m.contains("no-such-type")));
}

#[test]
fn quiet_suppresses_error_text() {
    let fx = Fixture::new();
    let doc = fx.file("doc.yaml", "type: no-such-type\n");

    yoml()
        .args(["--quiet", "read", "--catalog"])
        .arg(fx.catalog())
        .arg(&doc)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::is_empty());
}

#[test]
fn missing_document_file_exits_1() {
    let fx = Fixture::new();

    yoml()
        .arg("read")
        .arg("--catalog")
        .arg(fx.catalog())
        .arg(fx.dir.path().join("absent.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading file"));
}

#[test]
fn invalid_catalog_exits_1() {
    let fx = Fixture::new();
    let bad = fx.file("bad.yaml", "types:\n  - name: a\n    extends: nowhere\n");
    let doc = fx.file("doc.yaml", "type: a\n");

    yoml()
        .arg("read")
        .arg("--catalog")
        .arg(&bad)
        .arg(&doc)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("nowhere"));
}

// ──────────────────────────────────────────────
// 3. roundtrip
// ──────────────────────────────────────────────

#[test]
fn roundtrip_normalizes_keys_as_yaml() {
    let fx = Fixture::new();
    let doc = fx.file("doc.yaml", "type: shape-with-size\nmy-name: diamond\nshape-size: 3\n");

    yoml()
        .arg("roundtrip")
        .arg("--catalog")
        .arg(fx.catalog())
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("type: shape-with-size"))
        .stdout(predicate::str::contains("shape-w-size-name: diamond"))
        .stdout(predicate::str::contains("size: 3"));
}

#[test]
fn roundtrip_json_output() {
    let fx = Fixture::new();
    let doc = fx.file("doc.yaml", "type: shape-with-size\nmy-name: diamond\nshape-size: 3\n");

    let assert = yoml()
        .args(["--output", "json", "roundtrip", "--catalog"])
        .arg(fx.catalog())
        .arg(&doc)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let written: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is JSON");
    assert_eq!(written["type"], "shape-with-size");
    assert_eq!(written["shape-w-size-name"], "diamond");
    assert_eq!(written["size"], 3);
}

// ──────────────────────────────────────────────
// 4. doc
// ──────────────────────────────────────────────

#[test]
fn doc_prints_markdown() {
    let fx = Fixture::new();

    yoml()
        .arg("doc")
        .arg("--catalog")
        .arg(fx.catalog())
        .arg("shape")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# shape"))
        .stdout(predicate::str::contains("shape-name"))
        .stdout(predicate::str::contains("my-name"));
}

#[test]
fn doc_json_lists_fragments() {
    let fx = Fixture::new();

    let assert = yoml()
        .args(["--output", "json", "doc", "--catalog"])
        .arg(fx.catalog())
        .arg("shape-with-size")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let docs: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is JSON");
    assert_eq!(docs["type_name"], "shape-with-size");
    let fragments = docs["fragments"].as_array().expect("fragments array");
    assert!(fragments
        .iter()
        .any(|f| f["text"].as_str().is_some_and(|t| t.contains("shape-size"))));
}

#[test]
fn doc_unknown_type_exits_1() {
    let fx = Fixture::new();

    yoml()
        .arg("doc")
        .arg("--catalog")
        .arg(fx.catalog())
        .arg("unicorn")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unicorn"));
}
