use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::net::TcpListener;
use std::time::{Duration, Instant};

#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("qapad").unwrap();
    cmd.env_remove("API_KEY").env_remove("RUST_LOG");
    cmd
}

// --- Help & version ---

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("QA scratchpad"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("qapad"));
}

// --- Projects ---

#[test]
fn projects_lists_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .arg("projects")
        .assert()
        .success()
        .stdout(predicate::str::contains("angelone"))
        .stdout(predicate::str::contains("https://www.indiainfoline.com/news"));
}

#[test]
fn projects_from_default_config_file() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("qapad.toml"),
        "[[projects]]\nid = \"shop\"\nname = \"Demo Shop\"\nurl = \"https://shop.example.com\"\n",
    )
    .unwrap();
    cmd()
        .current_dir(&tmp)
        .arg("projects")
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo Shop"))
        .stdout(predicate::str::contains("angelone").not());
}

// --- Config validation ---

#[test]
fn missing_explicit_config_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .args(["--config", "nope.toml", "projects"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn unknown_config_field_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("qapad.toml"), "api_key = \"secret\"\n").unwrap();
    cmd()
        .current_dir(&tmp)
        .arg("projects")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown field"));
}

// --- Suggest (never reaches the network) ---

#[test]
fn suggest_blank_component_is_validation_error() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .args(["suggest", "   "])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("component name"));
}

#[test]
fn suggest_without_api_key_is_configuration_error() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .args(["suggest", "header navigation"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("API_KEY environment variable not set"));
}

#[test]
fn suggest_unknown_project_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .args(["suggest", "--project", "nowhere", "header"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown project: nowhere"));
}

// --- Interactive session on piped stdin ---

#[test]
fn session_add_list_export() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .write_stdin(
            "add low Footer typo | Footer says Copyrigth.\n\
             add critical Login broken | Login button does nothing.\n\
             list\n\
             export\n\
             quit\n",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("added bug-2 [Critical] Login broken"))
        .stdout(predicate::str::contains("exported 2 bug(s)"));

    let report = fs::read_to_string(tmp.path().join("bug_report_angelone.txt")).unwrap();
    assert!(report.contains("#1: Login broken"));
    assert!(report.contains("#2: Footer typo"));
}

#[test]
fn session_suggest_without_api_key_keeps_running() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .write_stdin("suggest stock chart\nsuggest   \nlist\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("API_KEY environment variable not set"))
        .stdout(predicate::str::contains("component name"))
        .stdout(predicate::str::contains("no bugs reported yet"));
}

#[test]
fn session_quit_does_not_wait_for_pending_suggestion() {
    // A server that accepts connections and never answers.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });

    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("qapad.toml"),
        format!("api_base = \"http://127.0.0.1:{port}\"\nrequest_timeout = 6\n"),
    )
    .unwrap();

    let started = Instant::now();
    cmd()
        .current_dir(&tmp)
        .env("API_KEY", "k")
        .write_stdin("suggest header\nquit\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("asking for suggestions about \"header\""));
    let elapsed = started.elapsed();
    assert!(
        elapsed < Duration::from_secs(3),
        "quit waited {elapsed:?} for the pending request"
    );
}
