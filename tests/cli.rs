//! End-to-end tests of the launcher binary.
//!
//! Secrets come from the reserved `test` locator, so no network is used.
//! Successful runs really replace the launcher with the target program.

#![cfg(unix)]

mod support;
use predicates::prelude::*;
use support::*;

#[test]
fn test_injects_aws_fixture() {
    let t = Test::new();
    let output = t.launch(&["--aws-secret-arn", "test", "printenv", "_ANSWER"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "42\n");
}

#[test]
fn test_injects_azure_fixture() {
    let t = Test::new();
    let output = t.launch(&[
        "--azure-key-vault-name",
        "test",
        "sh",
        "-c",
        "echo \"$_QUESTION\"",
    ]);
    assert_success(&output);
    assert_stdout_contains(
        &output,
        "The Ultimate Question of Life, the Universe, and Everything",
    );
}

#[test]
fn test_locator_from_environment_variable() {
    let t = Test::new();
    let output = t
        .cmd()
        .env("AWS_SECRET_ARN", "test")
        .args(["printenv", "_ANSWER"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "42\n");
}

#[test]
fn test_provider_collision_warns_but_launches() {
    let t = Test::new();
    let output = t.launch(&[
        "--aws-secret-arn",
        "test",
        "--azure-key-vault-name",
        "test",
        "printenv",
        "_ANSWER",
    ]);
    assert_success(&output);
    assert_eq!(stdout(&output), "42\n");
    assert_stderr_contains(&output, "secrets key collision detected");
}

#[test]
fn test_existing_variable_overwritten_with_warning() {
    let t = Test::new();
    let output = t
        .cmd()
        .env("_ANSWER", "old")
        .args(["--aws-secret-arn", "test", "printenv", "_ANSWER"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "42\n");
    assert_stderr_contains(&output, "overwriting already existing environment variable");
}

#[test]
fn test_no_secrets_no_warnings() {
    let t = Test::new();
    let output = t.launch(&["true"]);
    assert_success(&output);
    assert_stderr_excludes(&output, "collision");
    assert_stderr_excludes(&output, "overwriting");
}

#[test]
fn test_arguments_passed_through() {
    let t = Test::new();
    let output = t.launch(&["sh", "-c", "echo \"$0|$1|$2\"", "zero", "--one", "two"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "zero|--one|two\n");
}

#[test]
fn test_child_exit_code_is_the_process_exit_code() {
    let t = Test::new();
    let output = t.launch(&["sh", "-c", "exit 42"]);
    assert_eq!(output.status.code(), Some(42));
}

#[test]
fn test_relative_executable_in_current_directory() {
    use std::os::unix::fs::PermissionsExt;

    let t = Test::new();
    let script = t.dir.path().join("hello.sh");
    std::fs::write(&script, "#!/bin/sh\necho hello from script\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let output = t.launch(&["hello.sh"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "hello from script\n");
}

#[test]
fn test_executable_found_on_path() {
    use std::os::unix::fs::PermissionsExt;

    let t = Test::new();
    let bin = tempfile::TempDir::new().unwrap();
    let script = bin.path().join("launcher-path-tool");
    std::fs::write(&script, "#!/bin/sh\necho found on path\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let path = format!(
        "{}:{}",
        bin.path().display(),
        std::env::var("PATH").unwrap_or_default()
    );
    let output = t
        .cmd()
        .env("PATH", path)
        .arg("launcher-path-tool")
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "found on path\n");
}

#[test]
fn test_missing_executable_fails() {
    let t = Test::new();
    t.cmd()
        .arg("launcher-no-such-binary-anywhere")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "Failed with error: executable not found: launcher-no-such-binary-anywhere",
        ));
}

#[test]
fn test_missing_path_with_separator_fails() {
    let t = Test::new();
    let output = t.launch(&["./missing/printenv"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "executable not found: ./missing/printenv");
}

#[test]
fn test_non_executable_target_fails() {
    let t = Test::new();
    std::fs::write(t.dir.path().join("notes.txt"), "just text").unwrap();
    let output = t.launch(&["./notes.txt"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to execute");
}

#[test]
fn test_no_command_prints_usage() {
    let t = Test::new();
    t.cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--aws-secret-arn"));
}

#[test]
fn test_soft_ulimit_applied() {
    let t = Test::new();
    let output = t.launch(&["--ulimit-soft", "64", "sh", "-c", "ulimit -n"]);
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "64");
}

#[test]
fn test_soft_above_hard_fails_before_launch() {
    let t = Test::new();
    let output = t.launch(&[
        "--ulimit-soft",
        "200",
        "--ulimit-hard",
        "100",
        "printenv",
        "HOME",
    ]);
    assert_failure(&output);
    assert!(stdout(&output).is_empty());
    assert_stderr_contains(&output, "soft open-files limit 200 exceeds hard limit 100");
}

#[test]
fn test_negative_ulimit_means_unchanged() {
    let t = Test::new();
    let before = std::process::Command::new("sh")
        .args(["-c", "ulimit -n"])
        .output()
        .unwrap();
    let output = t.launch(&["--ulimit-soft", "-1", "sh", "-c", "ulimit -n"]);
    assert_success(&output);
    assert_eq!(stdout(&output), String::from_utf8_lossy(&before.stdout));
}

#[test]
fn test_invalid_log_level_fails() {
    let t = Test::new();
    t.cmd()
        .args(["--log-level", "chatty", "true"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid log-level 'chatty'"));
}

#[test]
fn test_dev_log_mode_debug_output() {
    let t = Test::new();
    let output = t.launch(&[
        "--log-mode",
        "dev",
        "--log-level",
        "debug",
        "--aws-secret-arn",
        "test",
        "true",
    ]);
    assert_success(&output);
    assert_stderr_contains(&output, "launching the process");
}

#[test]
fn test_log_mode_from_env_ignores_case() {
    let t = Test::new();
    t.cmd()
        .env("LOG_MODE", "PROD")
        .args(["printenv", "_ANSWER"])
        .env("AWS_SECRET_ARN", "test")
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn test_invalid_flag_value_exits_one() {
    let t = Test::new();
    t.cmd()
        .args(["--log-mode", "loud", "true"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("loud"));
}

#[cfg(feature = "aws")]
#[test]
fn test_short_arn_without_region_fails_without_network() {
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    let t = Test::new();
    let missing = t.dir.path().join("no-such-aws-file");
    // stands in for the instance metadata service; must never be contacted
    let imds = TcpListener::bind("127.0.0.1:0").unwrap();
    imds.set_nonblocking(true).unwrap();
    let endpoint = format!("http://{}", imds.local_addr().unwrap());

    let start = Instant::now();
    let output = t
        .cmd()
        .env_remove("AWS_REGION")
        .env_remove("AWS_DEFAULT_REGION")
        .env_remove("AWS_PROFILE")
        .env_remove("AWS_EC2_METADATA_DISABLED")
        .env("AWS_EC2_METADATA_SERVICE_ENDPOINT", &endpoint)
        .env("AWS_CONFIG_FILE", &missing)
        .env("AWS_SHARED_CREDENTIALS_FILE", &missing)
        .env("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE")
        .env("AWS_SECRET_ACCESS_KEY", "example")
        .args(["--aws-secret-arn", "my-app-secret", "true"])
        .output()
        .unwrap();

    assert_failure(&output);
    assert_stderr_contains(&output, "secret's ARN seems to be corrupt");
    assert!(start.elapsed() < Duration::from_secs(2), "{:?}", start.elapsed());
    assert!(
        matches!(imds.accept(), Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock),
        "metadata endpoint was contacted"
    );
}
