//! CLI integration tests for the bankline command-line interface.
//!
//! Each test gets its own config and data directory so the stored session
//! never leaks between tests or into the user's home.

use assert_cmd::Command;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Isolated config/data directories for one test.
struct Sandbox {
    config: TempDir,
    data: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            config: TempDir::new().unwrap(),
            data: TempDir::new().unwrap(),
        }
    }

    /// Get a command for the bankline binary inside this sandbox.
    fn bankline(&self) -> Command {
        let mut cmd = Command::cargo_bin("bankline").unwrap();
        cmd.env("BANKLINE_CONFIG_DIR", self.config.path())
            .env("BANKLINE_DATA_DIR", self.data.path())
            .env_remove("BANKLINE_SERVER_URL");
        cmd
    }
}

fn token_expiring_in(secs: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let exp = chrono::Utc::now().timestamp() + secs;
    let payload = URL_SAFE_NO_PAD.encode(json!({"sub": "u1", "exp": exp}).to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    Sandbox::new()
        .bankline()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bankline"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("guard"))
        .stdout(predicate::str::contains("request"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    Sandbox::new()
        .bankline()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bankline"));
}

#[test]
fn test_request_help() {
    Sandbox::new()
        .bankline()
        .args(["request", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--data"))
        .stdout(predicate::str::contains("--timeout-ms"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Session and Guard Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_guard_without_session_redirects() {
    Sandbox::new()
        .bankline()
        .args(["--json", "guard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/welcome"))
        .stdout(predicate::str::contains("no_token"));
}

#[test]
fn test_guard_strict_exit_code() {
    Sandbox::new()
        .bankline()
        .args(["guard", "--strict"])
        .assert()
        .code(2);
}

#[test]
fn test_guard_strict_flushes_log_file() {
    let sandbox = Sandbox::new();
    sandbox.bankline().args(["guard", "--strict"]).assert().code(2);

    let logs = sandbox.config.path().join("logs");
    let contents: String = std::fs::read_dir(&logs)
        .unwrap()
        .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect();
    assert!(contents.contains("Route guard evaluated"));
}

#[test]
fn test_login_guard_logout_cycle() {
    let sandbox = Sandbox::new();
    let token = token_expiring_in(3600);

    sandbox
        .bankline()
        .args(["login", "--token", &token, "--email", "ana@bank.test"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session stored"));

    sandbox
        .bankline()
        .args(["--json", "guard"])
        .assert()
        .success()
        .stdout(predicate::str::diff("true\n"));

    sandbox.bankline().arg("logout").assert().success();

    sandbox
        .bankline()
        .args(["--json", "guard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no_token"));
}

#[test]
fn test_expired_session_is_removed_by_guard() {
    let sandbox = Sandbox::new();
    sandbox
        .bankline()
        .args(["--json", "login", "--token", &token_expiring_in(-60)])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"expired\": true"));

    sandbox
        .bankline()
        .args(["--json", "guard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("token_expired"));

    sandbox
        .bankline()
        .args(["--json", "guard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no_token"));
}

#[test]
fn test_login_rejects_malformed_token() {
    Sandbox::new()
        .bankline()
        .args(["login", "--token", "not-a-token"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to store session"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_defaults() {
    Sandbox::new()
        .bankline()
        .args(["--json", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"base_timeout_ms\": 30000"))
        .stdout(predicate::str::contains("\"max_retries\": 3"));
}

#[test]
fn test_config_file_and_server_override() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.config.path().join("config.toml"),
        "base_url = \"https://from-file.test\"\nbase_timeout_ms = 5000\n",
    )
    .unwrap();

    sandbox
        .bankline()
        .args(["--json", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://from-file.test"))
        .stdout(predicate::str::contains("\"base_timeout_ms\": 5000"));

    sandbox
        .bankline()
        .args(["--json", "--server", "http://override.test", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://override.test"));
}

#[test]
fn test_invalid_config_fails() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.config.path().join("config.toml"), "base_timeout_ms = 0\n").unwrap();

    sandbox
        .bankline()
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_request_rejects_bad_body() {
    Sandbox::new()
        .bankline()
        .args(["request", "POST", "/api/transfers", "--data", "{oops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--data is not valid JSON"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_sends_stored_credential() {
    let server = MockServer::start().await;
    let token = token_expiring_in(3600);
    Mock::given(method("GET"))
        .and(path("/api/accounts"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "a1"}])))
        .mount(&server)
        .await;

    let sandbox = Sandbox::new();
    sandbox.bankline().args(["login", "--token", &token]).assert().success();

    sandbox
        .bankline()
        .args(["--server", &server.uri(), "request", "get", "/api/accounts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"a1\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_not_found_reports_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/loans/9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "no such loan"})))
        .expect(1)
        .mount(&server)
        .await;

    Sandbox::new()
        .bankline()
        .args(["--server", &server.uri(), "request", "GET", "/api/loans/9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Resource Not Found"))
        .stderr(predicate::str::contains("no such loan"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_unauthorized_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::new();
    sandbox
        .bankline()
        .args(["login", "--token", &token_expiring_in(3600), "--email", "ana@bank.test"])
        .assert()
        .success();

    sandbox
        .bankline()
        .args(["--server", &server.uri(), "request", "GET", "/api/me"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("session_expired"))
        .stderr(predicate::str::contains("Session Expired"));

    sandbox
        .bankline()
        .args(["--json", "guard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no_token"));
}
