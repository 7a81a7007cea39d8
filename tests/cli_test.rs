//! Tests for the operator commands of the `creditchat` binary

mod common;

use assert_cmd::Command;
use common::temp_config_file;
use predicates::prelude::*;
use tempfile::TempDir;

fn creditchat(db: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("creditchat").unwrap();
    cmd.env_remove("CREDITCHAT_DB")
        .arg("--config")
        .arg("does-not-exist.yaml")
        .arg("--storage-path")
        .arg(db);
    cmd
}

fn field(stdout: &str, name: &str) -> String {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix(&format!("{name}:")))
        .map(|rest| rest.trim().to_string())
        .unwrap_or_else(|| panic!("no `{name}` line in output:\n{stdout}"))
}

#[test]
fn test_users_add_prints_id_and_token() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("creditchat.db");

    creditchat(&db)
        .args(["users", "add", "--name", "Alice", "--credits", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created user Alice"))
        .stdout(predicate::str::contains("credits: 5"))
        .stdout(predicate::str::contains("token:"));

    assert!(db.exists());
}

#[test]
fn test_credits_grant_reports_new_balance() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("creditchat.db");

    let output = creditchat(&db)
        .args(["users", "add", "--name", "Bob", "--credits", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let user_id = field(&String::from_utf8_lossy(&output.stdout), "id");

    creditchat(&db)
        .args(["credits", "grant", "--user", &user_id, "--amount", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("balance is now 5"));
}

#[test]
fn test_credits_grant_to_unknown_user_fails() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("creditchat.db");

    creditchat(&db)
        .args(["credits", "grant", "--user", "ghost", "--amount", "4"])
        .assert()
        .failure();
}

#[test]
fn test_publish_missing_message_fails() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("creditchat.db");

    creditchat(&db)
        .args(["images", "publish", "--chat", "nope", "--index", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No message 0 in chat nope"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_dir, config_path) = temp_config_file(
        r#"
generation:
  timeout_seconds: 0
"#,
    );

    let tmp = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("creditchat").unwrap();
    cmd.env_remove("CREDITCHAT_DB")
        .arg("--config")
        .arg(&config_path)
        .arg("--storage-path")
        .arg(tmp.path().join("creditchat.db"))
        .args(["users", "add", "--name", "Alice"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("must be greater than 0"));
}
