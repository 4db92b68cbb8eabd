#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::{tempdir, TempDir};

const CONFIG: &str = r#"
backends:
  spicedb:
    kind: static
    grants:
      - { actor: david, resource: acc123, permission: can_download_statement }
  neo4j:
    kind: static
    grants:
      - { actor: david, resource: acc123, permission: can_download_statement }
"#;

fn workspace() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("entitlement.yaml"), CONFIG).unwrap();
    dir
}

fn entitlement(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("entitlement").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("ENTITLEMENT_CONFIG")
        .env_remove("ENTITLEMENT_RECONCILE_POLICY")
        .env_remove("ENTITLEMENT_CALL_TIMEOUT_MS")
        .env_remove("ENTITLEMENT_GRAPHQL_ENDPOINT")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn version_prints_package_version() {
    let dir = workspace();
    entitlement(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn check_uses_default_config_file() {
    let dir = workspace();
    entitlement(&dir)
        .args(["check", "david", "acc123", "can_download_statement"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ALLOW via spicedb"));
}

#[test]
fn check_json_in_dual_mode() {
    let dir = workspace();
    let out = entitlement(&dir)
        .args([
            "check",
            "david",
            "acc123",
            "can_download_statement",
            "--backend",
            "both",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["allowed"], true);
    assert_eq!(v["permissionship"], "granted");
    assert_eq!(v["backend"], "both");
}

#[test]
fn fail_on_deny_sets_exit_code() {
    let dir = workspace();
    entitlement(&dir)
        .args(["check", "emma", "acc123", "can_download_statement", "--fail-on-deny"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("DENY"));
}

#[test]
fn unconfigured_backend_is_a_denial_not_an_error() {
    let dir = workspace();
    entitlement(&dir)
        .args([
            "check",
            "david",
            "acc123",
            "can_download_statement",
            "--backend",
            "graphql",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("DENY via graphql"))
        .stdout(predicate::str::contains("not available"));
}

#[test]
fn missing_explicit_config_is_config_error() {
    let dir = workspace();
    entitlement(&dir)
        .args(["--config", "absent.yaml", "health"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn invalid_env_override_is_config_error() {
    let dir = workspace();
    entitlement(&dir)
        .env("ENTITLEMENT_RECONCILE_POLICY", "majority")
        .arg("health")
        .assert()
        .code(2);
}

#[test]
fn no_config_means_no_backends() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("entitlement").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("ENTITLEMENT_CONFIG")
        .args(["check", "david", "acc123", "can_download_statement"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DENY via spicedb"));
}

#[test]
fn health_echoes_backend() {
    let dir = workspace();
    let out = entitlement(&dir)
        .args(["health", "--backend", "neo4j", "--format", "json"])
        .output()
        .unwrap();
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["healthy"], true);
    assert_eq!(v["backend"], "neo4j");
    assert_eq!(v["status_message"], "OK");
}

#[test]
fn bulk_preserves_order() {
    let dir = workspace();
    fs::write(
        dir.path().join("requests.json"),
        r#"{"max_concurrency": 2, "requests": [
            {"actor":"emma","resource":"acc123","permission":"can_download_statement"},
            {"actor":"david","resource":"acc123","permission":"can_download_statement"},
            {"actor":"david","resource":"acc123","permission":"can_download_statement","context":{"implementation":"graphql"}}
        ]}"#,
    )
    .unwrap();

    let out = entitlement(&dir)
        .args(["bulk", "--input", "requests.json", "--format", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    let allowed: Vec<bool> = v["responses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["allowed"].as_bool().unwrap())
        .collect();
    assert_eq!(allowed, [false, true, false]);
    assert_eq!(v["success_count"], 2);
    assert_eq!(v["error_count"], 1);
}

#[test]
fn bench_mismatch_exits_one() {
    let dir = workspace();
    fs::write(
        dir.path().join("plan.yaml"),
        r#"
iterations: 5
concurrency: 2
cases:
  - { name: granted, actor: david, resource: acc123, permission: can_download_statement, expected: true }
  - { name: wrong, actor: emma, resource: acc123, permission: can_download_statement, expected: true }
"#,
    )
    .unwrap();

    entitlement(&dir)
        .args(["bench", "--plan", "plan.yaml"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("10 requests"));

    let out = entitlement(&dir)
        .args(["bench", "--plan", "plan.yaml", "--format", "json"])
        .output()
        .unwrap();
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["results"][0]["successful_requests"], 5);
    assert_eq!(v["results"][1]["failed_requests"], 5);
}

#[test]
fn stream_answers_each_line_in_order() {
    let dir = workspace();
    let input = concat!(
        r#"{"actor":"david","resource":"acc123","permission":"can_download_statement"}"#,
        "\n",
        "not json\n",
        r#"{"actor":"emma","resource":"acc123","permission":"can_download_statement","context":{"implementation":"neo4j"}}"#,
        "\n",
    );
    let out = entitlement(&dir)
        .arg("stream")
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(out.status.success());

    let lines: Vec<Value> = String::from_utf8(out.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["allowed"], true);
    assert_eq!(lines[1]["allowed"], false);
    assert_eq!(lines[1]["backend"], "neo4j");
}
