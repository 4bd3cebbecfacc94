//! CLI integration tests for the wesmirror command-line interface.
//!
//! Every test points the binary at its own temporary config directory and
//! database. Tests that talk to a server use a wiremock WES server.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Command for the wesmirror binary isolated under `dir`.
fn wesmirror(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wesmirror").unwrap();
    cmd.env("WESMIRROR_CONFIG_DIR", dir.join("config"))
        .env("WESMIRROR_DATABASE", dir.join("mirror.db"))
        .env_remove("WESMIRROR_SERVER_TOKEN")
        .current_dir(dir);
    cmd
}

fn service_info() -> Value {
    json!({
        "auth_instructions_url": "https://wes.test/auth",
        "contact_info_url": "https://wes.test/contact",
        "workflow_engines": [{
            "engine_name": "cwltool",
            "engine_version": "3.1",
            "workflow_types": [{"language_type": "CWL", "language_version": "v1.0"}]
        }],
        "supported_wes_versions": ["1.0.0"]
    })
}

fn workflows() -> Value {
    json!({
        "workflows": [{
            "workflow_name": "trimming",
            "workflow_version": "1.0.0",
            "language_type": "CWL",
            "language_version": "v1.0",
            "workflow_location": "https://raw.githubusercontent.com/org/repo/main/trimming.cwl",
            "workflow_content": "inputs:\n  fastq: File\n  quality:\n    type: int\n    default: 20\n",
            "workflow_parameters_template_location": null,
            "workflow_parameters_template": null
        }]
    })
}

async fn wes_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/service-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(service_info()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workflows()))
        .mount(&server)
        .await;
    server
}

fn host_of(server: &MockServer) -> String {
    server.address().to_string()
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    wesmirror(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("service"))
        .stdout(predicate::str::contains("workflow"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    wesmirror(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wesmirror"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let dir = TempDir::new().unwrap();
    wesmirror(dir.path()).arg("frobnicate").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_path_uses_config_dir() {
    let dir = TempDir::new().unwrap();
    wesmirror(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_reads_user_config() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(
        dir.path().join("config").join("config.toml"),
        "[remote]\ntimeout_secs = 7\n",
    )
    .unwrap();

    let output = wesmirror(dir.path())
        .args(["--json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let shown = stdout_json(&output);
    assert_eq!(shown["remote"]["timeout_secs"], 7);
}

// ─────────────────────────────────────────────────────────────────────────────
// Services
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_service_list_empty() {
    let dir = TempDir::new().unwrap();
    wesmirror(dir.path())
        .args(["service", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No services registered"));
}

#[test]
fn test_service_show_unknown_fails() {
    let dir = TempDir::new().unwrap();
    wesmirror(dir.path())
        .args(["service", "show", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Service not found"));
}

#[test]
fn test_service_add_unreachable_server() {
    let dir = TempDir::new().unwrap();
    wesmirror(dir.path())
        .args(["service", "add", "local", "--host", "127.0.0.1:9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please enter the correct URL."));
}

#[test]
fn test_service_add_rejects_bad_scheme() {
    let dir = TempDir::new().unwrap();
    wesmirror(dir.path())
        .args(["service", "add", "s", "--host", "h", "--scheme", "ftp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid scheme"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_register_browse_and_prepare() {
    let server = wes_server().await;
    let dir = TempDir::new().unwrap();
    let host = host_of(&server);

    wesmirror(dir.path())
        .args(["service", "add", "local", "--host", &host])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered local"));

    wesmirror(dir.path())
        .args(["service", "add", "local", "--host", &host])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "A service with that name already exists.",
        ));

    let output = wesmirror(dir.path())
        .args(["--json", "service", "show", "local"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let detail = stdout_json(&output);
    assert_eq!(detail["workflow_engines"][0]["name"], "cwltool");
    assert_eq!(detail["supported_wes_versions"][0]["wes_version"], "1.0.0");

    let output = wesmirror(dir.path())
        .args(["--json", "workflow", "list", "--service", "local"])
        .output()
        .unwrap();
    let listed = stdout_json(&output);
    let token = listed[0]["token"].as_str().unwrap().to_string();

    let output = wesmirror(dir.path())
        .args(["--json", "workflow", "show", &token])
        .output()
        .unwrap();
    let shown = stdout_json(&output);
    assert_eq!(
        shown["cwl_viewer_url"],
        "https://view.commonwl.org/workflows/github.com/org/repo/blob/main/trimming.cwl"
    );
    assert_eq!(shown["executable_engines"][0]["name"], "cwltool");

    let output = wesmirror(dir.path())
        .args([
            "workflow", "prepare", &token, "--name", "run-1", "-p", "fastq=/data/r1.fq",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let run = stdout_json(&output);
    assert_eq!(run["run_name"], "run-1");
    assert_eq!(run["engine_name"], "cwltool");
    assert_eq!(run["parameters"], json!({"fastq": "/data/r1.fq", "quality": 20}));

    let params_file = dir.path().join("job.yml");
    std::fs::write(
        &params_file,
        "fastq:\n  class: File\n  path: /data/from-file.fq\nquality: 30\n",
    )
    .unwrap();
    let output = wesmirror(dir.path())
        .args(["workflow", "prepare", &token, "--name", "run-2", "--params-file"])
        .arg(&params_file)
        .args(["-p", "quality=35"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let run = stdout_json(&output);
    assert_eq!(
        run["parameters"],
        json!({"fastq": "/data/from-file.fq", "quality": 35})
    );

    wesmirror(dir.path())
        .args(["workflow", "prepare", &token, "--params-file", "missing.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read parameters file"));

    wesmirror(dir.path())
        .args(["service", "refresh", "local"])
        .assert()
        .success();

    wesmirror(dir.path())
        .args(["service", "delete", "local"])
        .assert()
        .success();
    wesmirror(dir.path())
        .args(["service", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No services registered"));

    wesmirror(dir.path())
        .args(["service", "purge", "local"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
    wesmirror(dir.path())
        .args(["service", "purge", "local", "--yes"])
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_json_output_hides_server_token() {
    let server = wes_server().await;
    let dir = TempDir::new().unwrap();
    let host = host_of(&server);

    let added = wesmirror(dir.path())
        .args(["--json", "service", "add", "local", "--host", &host])
        .env("WESMIRROR_SERVER_TOKEN", "hunter2-token")
        .output()
        .unwrap();
    assert!(added.status.success());
    assert!(!String::from_utf8_lossy(&added.stdout).contains("hunter2-token"));

    for args in [
        vec!["--json", "service", "list"],
        vec!["--json", "service", "show", "local"],
    ] {
        wesmirror(dir.path())
            .args(&args)
            .assert()
            .success()
            .stdout(predicate::str::contains("local"))
            .stdout(predicate::str::contains("hunter2-token").not());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_reports_server_failure() {
    let server = wes_server().await;
    let dir = TempDir::new().unwrap();
    let host = host_of(&server);

    wesmirror(dir.path())
        .args(["service", "add", "local", "--host", &host])
        .assert()
        .success();

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    wesmirror(dir.path())
        .args(["service", "refresh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be refreshed"));

    let output = wesmirror(dir.path())
        .args(["--json", "workflow", "list"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output).as_array().unwrap().len(), 1);
}
