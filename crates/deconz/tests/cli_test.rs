//! Integration tests for the `deconz` CLI binary.
//!
//! Argument parsing, config handling and error exit codes run without a
//! gateway; REST commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const TOKEN: &str = "TESTTOKEN42";

/// Build a [`Command`] for the `deconz` binary with env isolation.
///
/// Clears all `DECONZ_*` env vars and points the config file into `dir`
/// so tests never touch the user's real configuration.
fn deconz_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("deconz");
    cmd.env("DECONZ_CONFIG", dir.join("config.toml"))
        .env_remove("DECONZ_PROFILE")
        .env_remove("DECONZ_HOST")
        .env_remove("DECONZ_PORT")
        .env_remove("DECONZ_WS_PORT")
        .env_remove("DECONZ_TOKEN")
        .env_remove("DECONZ_TIMEOUT")
        .env_remove("DECONZ_DEFAULT_PROFILE")
        .env_remove("RUST_LOG");
    cmd
}

fn gateway_args(server: &MockServer) -> Vec<String> {
    let addr = server.address();
    vec![
        "--host".into(),
        addr.ip().to_string(),
        "--port".into(),
        addr.port().to_string(),
        "--token".into(),
        TOKEN.into(),
    ]
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = deconz_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    deconz_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("pair")
            .and(predicate::str::contains("lights"))
            .and(predicate::str::contains("sensors"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    deconz_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("deconz"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_brightness_out_of_range_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    deconz_cmd(dir.path())
        .args(["lights", "set", "1", "--on", "--bri", "255"])
        .assert()
        .code(2);
}

#[test]
fn test_light_set_requires_on_or_off() {
    let dir = tempfile::tempdir().unwrap();
    deconz_cmd(dir.path())
        .args(["lights", "set", "1"])
        .assert()
        .code(2);
}

#[test]
fn test_on_and_off_conflict() {
    let dir = tempfile::tempdir().unwrap();
    deconz_cmd(dir.path())
        .args(["lights", "set", "1", "--on", "--off"])
        .assert()
        .code(2);
}

// ── Configuration errors ────────────────────────────────────────────

#[test]
fn test_missing_gateway_reports_no_config() {
    let dir = tempfile::tempdir().unwrap();
    deconz_cmd(dir.path())
        .args(["lights", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No gateway configured"));
}

#[test]
fn test_missing_token_exits_auth() {
    let dir = tempfile::tempdir().unwrap();
    deconz_cmd(dir.path())
        .args(["--host", "127.0.0.1", "sensors", "list"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No access token configured"));
}

#[test]
fn test_unknown_profile_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    deconz_cmd(dir.path())
        .args(["--profile", "nope", "sensors", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("profile 'nope' not found"));
}

#[test]
fn test_config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();

    deconz_cmd(dir.path())
        .args(["--host", "10.0.0.9", "--ws-port", "443", "config", "init", "--protocol", "wss"])
        .assert()
        .success();

    assert!(dir.path().join("config.toml").exists());

    deconz_cmd(dir.path())
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"stream_url\": \"wss://10.0.0.9:443\"")
                .and(predicate::str::contains("\"port\": 80")),
        );

    deconz_cmd(dir.path())
        .args(["config", "profiles", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default"));
}

#[test]
fn test_config_path_honours_override() {
    let dir = tempfile::tempdir().unwrap();
    deconz_cmd(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Gateway commands ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_lights_list_renders_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/{TOKEN}/lights")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "2": { "name": "Desk", "type": "Color light", "modelid": "LCT015", "manufacturername": "Philips" }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = deconz_cmd(dir.path());
    cmd.args(gateway_args(&server)).args(["lights", "list"]);
    let output = run(cmd).await;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Desk"));
    assert!(stdout.contains("Color light | LCT015 | Philips"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_light_exits_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/{TOKEN}/lights/77")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!([
            { "error": { "type": 3, "address": "/lights/77", "description": "resource, /lights/77, not available" } }
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = deconz_cmd(dir.path());
    cmd.args(gateway_args(&server)).args(["lights", "get", "77:Porch"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pair_prints_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "success": { "username": "FRESHKEY" } }])),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let addr = server.address();
    let mut cmd = deconz_cmd(dir.path());
    cmd.args(["--host", &addr.ip().to_string(), "--port", &addr.port().to_string()])
        .args(["pair", "--retries", "0"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "FRESHKEY");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pair_without_link_button_exits_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let addr = server.address();
    let mut cmd = deconz_cmd(dir.path());
    cmd.args(["--host", &addr.ip().to_string(), "--port", &addr.port().to_string()])
        .args(["pair", "--retries", "0"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Link button is not pressed"));
}
