//! Tests for the `nix-closure` binary.

use predicates::prelude::*;
use tempfile::TempDir;

use crate::common::{nix_closure_cmd, write_config, write_graph_tool};
use nix_closure::hash::{file_hash, tree_hash};
use nix_closure::test_utils::StoreFixture;

fn fixture_with_app() -> StoreFixture {
    let fixture = StoreFixture::new();
    let app = fixture.add_package("0a1b2c-hello-2.12.1", &[("bin/hello", b"hello world")]);
    fixture.add_package("3d4e5f-glibc-2.39", &[("lib/libc.so.6", b"libc")]);
    fixture.link_result("result", &app);
    fixture
}

#[test]
fn test_hash_directory() {
    let fixture = fixture_with_app();
    let app = fixture.store_root().join("0a1b2c-hello-2.12.1");
    let expected = tree_hash(&app).unwrap();

    nix_closure_cmd()
        .arg("hash")
        .arg(&app)
        .assert()
        .success()
        .stdout(format!("{expected}\n"));
}

#[test]
fn test_hash_flat_file() {
    let fixture = fixture_with_app();
    let binary = fixture.store_root().join("0a1b2c-hello-2.12.1/bin/hello");
    let expected = file_hash(&binary).unwrap();

    nix_closure_cmd()
        .args(["hash", "--flat"])
        .arg(&binary)
        .assert()
        .success()
        .stdout(format!("{expected}\n"));
}

#[test]
fn test_hash_missing_path() {
    let temp = TempDir::new().unwrap();
    nix_closure_cmd()
        .arg("hash")
        .arg(temp.path().join("gone"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_identity() {
    nix_closure_cmd()
        .args(["identity", "/nix/store/abc123-hello-2.12.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name: hello"))
        .stdout(predicate::str::contains("version: 2.12.1"))
        .stdout(predicate::str::contains("digest: abc123"));
}

#[test]
fn test_identity_json() {
    let output = nix_closure_cmd()
        .args(["identity", "--json", "--store-root", "/gnu/store", "/gnu/store/x-y-z-1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["result_digest"], "x-y");
    assert_eq!(json["name"], "z");
    assert_eq!(json["version"], "1");
}

#[test]
fn test_identity_malformed() {
    nix_closure_cmd()
        .args(["identity", "/nix/store/hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed store path"))
        .stderr(predicate::str::contains("suggestion"));
}

#[test]
fn test_graph_json() {
    let fixture = fixture_with_app();
    let tools = TempDir::new().unwrap();
    let dot = fixture.dot_graph(
        &["0a1b2c-hello-2.12.1", "3d4e5f-glibc-2.39", "7a8b9c-gone-1.0"],
        &[("0a1b2c-hello-2.12.1", "3d4e5f-glibc-2.39"), ("0a1b2c-hello-2.12.1", "7a8b9c-gone-1.0")],
    );
    let tool = write_graph_tool(tools.path(), &dot);
    let config = write_config(tools.path(), fixture.store_root(), &tool);

    let output = nix_closure_cmd()
        .arg("--config")
        .arg(&config)
        .arg("graph")
        .arg(fixture.output_dir())
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["artifact"]["name"], "hello");
    assert_eq!(json["artifact"]["version"], "2.12.1");
    assert_eq!(json["unknown"], 1);
    assert_eq!(json["graph"]["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(json["graph"]["edges"].as_array().unwrap().len(), 2);
}

#[test]
fn test_graph_tree_marks_unknown() {
    let fixture = fixture_with_app();
    let tools = TempDir::new().unwrap();
    let dot = fixture.dot_graph(
        &["0a1b2c-hello-2.12.1", "7a8b9c-gone-1.0"],
        &[("0a1b2c-hello-2.12.1", "7a8b9c-gone-1.0")],
    );
    let tool = write_graph_tool(tools.path(), &dot);
    let config = write_config(tools.path(), fixture.store_root(), &tool);

    nix_closure_cmd()
        .arg("--config")
        .arg(&config)
        .arg("graph")
        .arg(fixture.output_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("7a8b9c-gone-1.0"))
        .stdout(predicate::str::contains("unknown"))
        .stderr(predicate::str::contains("shown as unknown"));
}

#[test]
fn test_graph_tree_starts_at_result() {
    let fixture = fixture_with_app();
    let tools = TempDir::new().unwrap();
    let dot = fixture.dot_graph(
        &["0a1b2c-hello-2.12.1", "3d4e5f-glibc-2.39"],
        &[("0a1b2c-hello-2.12.1", "3d4e5f-glibc-2.39")],
    );
    assert!(dot.contains("\"3d4e5f-glibc-2.39\" -> \"0a1b2c-hello-2.12.1\""));
    let tool = write_graph_tool(tools.path(), &dot);
    let config = write_config(tools.path(), fixture.store_root(), &tool);

    let output = nix_closure_cmd()
        .arg("--config")
        .arg(&config)
        .arg("graph")
        .arg(fixture.output_dir())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let tree: Vec<&str> = stdout.lines().filter(|l| l.contains("── ")).collect();
    assert_eq!(tree.len(), 2, "{stdout}");
    assert!(tree[0].starts_with("└── 0a1b2c-hello-2.12.1"), "{stdout}");
    assert!(tree[1].starts_with("    └── 3d4e5f-glibc-2.39"), "{stdout}");
}

#[test]
fn test_graph_without_result_symlink() {
    let fixture = StoreFixture::new();
    let tools = TempDir::new().unwrap();
    let tool = write_graph_tool(tools.path(), "digraph G {}\n");
    let config = write_config(tools.path(), fixture.store_root(), &tool);

    nix_closure_cmd()
        .arg("--config")
        .arg(&config)
        .arg("graph")
        .arg(fixture.output_dir())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not a readable symlink"))
        .stderr(predicate::str::contains("nix build"));
}

#[test]
fn test_graph_tool_failure() {
    let fixture = fixture_with_app();
    let tools = TempDir::new().unwrap();
    let config = write_config(tools.path(), fixture.store_root(), std::path::Path::new("false"));

    nix_closure_cmd()
        .arg("--config")
        .arg(&config)
        .arg("graph")
        .arg(fixture.output_dir())
        .assert()
        .failure()
        .stderr(predicate::str::contains("External tool 'false' failed"));
}

#[test]
fn test_graph_rejects_zero_parallelism() {
    let fixture = fixture_with_app();
    nix_closure_cmd()
        .arg("graph")
        .arg(fixture.output_dir())
        .args(["--max-parallel", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--max-parallel must be at least 1"));
}

#[test]
fn test_missing_config_file() {
    let temp = TempDir::new().unwrap();
    nix_closure_cmd()
        .arg("--config")
        .arg(temp.path().join("absent.toml"))
        .args(["identity", "/nix/store/a-b-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
