//! Integration tests for login/logout/whoami commands.

mod fixtures;

use assert_cmd::cargo::cargo_bin_cmd;
use fixtures::{EXPIRED_TOKEN, VALID_TOKEN, can_bind_localhost, read_session, temp_home, write_session};
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_stores_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"token": "x.y.z", "name": "Alice", "email": "a@b.com"}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("taskdash")
        .env("TASKDASH_HOME", home.path())
        .env("TASKDASH_API_URL", server.uri())
        .args(["login", "--email", "a@b.com", "--password", "secret"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome back, Alice!"));

    let session = read_session(home.path());
    assert_eq!(session["token"], json!("x.y.z"));
    let user: Value = serde_json::from_str(session["user"].as_str().unwrap()).unwrap();
    assert_eq!(user, json!({"name": "Alice", "email": "a@b.com"}));
}

#[tokio::test]
async fn test_login_reads_credentials_from_stdin() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "from stdin"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"accessToken": "a.b.c", "user": {"id": 1, "email": "a@b.com"}}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("taskdash")
        .env("TASKDASH_HOME", home.path())
        .env("TASKDASH_API_URL", server.uri())
        .env_remove("TASKDASH_EMAIL")
        .env_remove("TASKDASH_PASSWORD")
        .arg("login")
        .write_stdin("a@b.com\nfrom stdin\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome back, a@b.com!"));

    assert_eq!(read_session(home.path())["token"], json!("a.b.c"));
}

#[tokio::test]
async fn test_login_failure_shows_server_message() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    cargo_bin_cmd!("taskdash")
        .env("TASKDASH_HOME", home.path())
        .env("TASKDASH_API_URL", server.uri())
        .args(["login", "--email", "a@b.com", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid credentials"));

    assert!(read_session(home.path()).get("token").is_none());
}

#[test]
fn test_login_without_password_fails_before_network() {
    let home = temp_home();

    // Nothing listens on the discard port.
    cargo_bin_cmd!("taskdash")
        .env("TASKDASH_HOME", home.path())
        .env("TASKDASH_API_URL", "http://127.0.0.1:9")
        .env_remove("TASKDASH_PASSWORD")
        .args(["login", "--email", "a@b.com"])
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Email and password are required"));
}

#[tokio::test]
async fn test_register_does_not_log_in() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "Carol"})))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("taskdash")
        .env("TASKDASH_HOME", home.path())
        .env("TASKDASH_API_URL", server.uri())
        .args([
            "register",
            "--name",
            "Carol",
            "--email",
            "c@d.com",
            "--password",
            "pw",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome Carol!"));

    assert!(read_session(home.path()).get("token").is_none());
}

#[test]
fn test_logout_when_not_logged_in() {
    let home = temp_home();

    cargo_bin_cmd!("taskdash")
        .env("TASKDASH_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[test]
fn test_logout_clears_session() {
    let home = temp_home();
    write_session(home.path(), VALID_TOKEN);

    cargo_bin_cmd!("taskdash")
        .env("TASKDASH_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out"));

    let session = read_session(home.path());
    assert!(session.get("token").is_none());
    assert!(session.get("user").is_none());
}

#[test]
fn test_whoami_shows_user() {
    let home = temp_home();
    write_session(home.path(), VALID_TOKEN);

    cargo_bin_cmd!("taskdash")
        .env("TASKDASH_HOME", home.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice"))
        .stdout(predicate::str::contains("a@b.com"))
        .stdout(predicate::str::contains(VALID_TOKEN).not());
}

#[test]
fn test_whoami_with_expired_token_purges_session() {
    let home = temp_home();
    write_session(home.path(), EXPIRED_TOKEN);

    cargo_bin_cmd!("taskdash")
        .env("TASKDASH_HOME", home.path())
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"))
        .stderr(predicate::str::contains("expired"));

    assert!(read_session(home.path()).get("token").is_none());
}

#[test]
fn test_corrupt_session_file_resolves_to_logged_out() {
    let home = temp_home();
    std::fs::write(home.path().join("session.json"), "{ not json").unwrap();

    cargo_bin_cmd!("taskdash")
        .env("TASKDASH_HOME", home.path())
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}
