//! Drive the compiled `nexus-script` binary.

use std::process::Output;

use async_tempfile::TempDir;
use indoc::indoc;
use nexus_script::{api::Script, testing::MockNexus};
use reqwest::{Method, StatusCode};
use xshell::{Shell, cmd};

const CLI_PATH: &str = env!("CARGO_BIN_EXE_nexus-script");

/// Environment variables that would leak the caller's setup into a test.
const NEXUS_ENV: [&str; 6] = [
    "NEXUS_USER",
    "NEXUS_PASSWORD",
    "NEXUS_CALL_ARGS",
    "NEXUS_ENDPOINT",
    "NEXUS_CA_FILE",
    "NEXUS_SOCKS_PROXY",
];

fn nexus_script(args: Vec<String>, env: Vec<(&'static str, String)>) -> Output {
    let sh = Shell::new().unwrap();
    let mut cmd = cmd!(sh, "{CLI_PATH} {args...}").ignore_status();
    for var in NEXUS_ENV {
        cmd = cmd.env_remove(var);
    }
    for (key, value) in env {
        cmd = cmd.env(key, value);
    }
    cmd.output().unwrap()
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn nexus_script_async(args: Vec<String>, env: Vec<(&'static str, String)>) -> Output {
    tokio::task::spawn_blocking(move || nexus_script(args, env))
        .await
        .unwrap()
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

#[test]
fn version_exits_zero() {
    let output = nexus_script(strings(&["--version"]), vec![]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("nexus-script "), "{stdout}");
}

#[test]
fn missing_function_exits_one() {
    let output = nexus_script(strings(&["--run"]), vec![]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(
        stderr,
        indoc! {"
            Must list at least one function to upload via --function option
            See also --help.
        "}
    );
}

#[test]
fn invalid_proxy_exits_one() {
    let output = nexus_script(
        strings(&["-f", "a.groovy"]),
        vec![("NEXUS_SOCKS_PROXY", String::from("not-a-proxy"))],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Invalid --proxy specified: not-a-proxy"), "{stderr}");
}

#[test]
fn unknown_flag_exits_one() {
    let output = nexus_script(strings(&["--bogus"]), vec![]);
    assert_eq!(output.status.code(), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn uploads_and_runs_through_call_args() {
    let nexus = MockNexus::new().await;
    let dir = TempDir::new_in(std::env::temp_dir().as_path()).await.unwrap();
    let script = dir.dir_path().join("greet.groovy");
    let data = dir.dir_path().join("name with spaces.txt");
    tokio::fs::write(&script, "return \"hello $args\"").await.unwrap();
    tokio::fs::write(&data, "world").await.unwrap();

    let call_args = format!("-n|{}|-d|{}", nexus.base_url, data.to_string_lossy());
    let output = nexus_script_async(
        vec![
            String::from("--function"),
            script.to_string_lossy().into_owned(),
            String::from("--run"),
        ],
        vec![("NEXUS_CALL_ARGS", call_args)],
    )
    .await;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    assert!(output.status.success(), "{stderr}");
    assert_eq!(
        nexus.scripts(),
        [Script::groovy("greet", "return \"hello $args\"")]
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    let ran = serde_json::from_str::<serde_json::Value>(stdout.trim_end()).unwrap();
    assert_eq!(ran["result"], "world");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_error_exits_one_with_body() {
    let nexus = MockNexus::new().await;
    nexus.fail_on(
        Method::POST,
        "/service/rest/v1/script",
        StatusCode::BAD_REQUEST,
        "startup failed: unexpected token",
    );
    let dir = TempDir::new_in(std::env::temp_dir().as_path()).await.unwrap();
    let script = dir.dir_path().join("broken.groovy");
    tokio::fs::write(&script, "return (").await.unwrap();

    let output = nexus_script_async(
        vec![
            String::from("-n"),
            nexus.base_url.to_string(),
            String::from("-f"),
            script.to_string_lossy().into_owned(),
        ],
        vec![],
    )
    .await;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("HTTP ERROR 400: Bad Request"), "{stderr}");
    assert!(stderr.contains("startup failed: unexpected token"), "{stderr}");
    assert!(output.stdout.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deleting_unknown_script_succeeds() {
    let nexus = MockNexus::new().await;

    let output = nexus_script_async(
        vec![
            String::from("-n"),
            nexus.base_url.to_string(),
            String::from("-f"),
            String::from("never-uploaded.groovy"),
            String::from("--skip-upload"),
            String::from("--delete"),
        ],
        vec![],
    )
    .await;

    assert!(output.status.success());
    let methods = nexus
        .requests()
        .into_iter()
        .map(|r| r.method)
        .collect::<Vec<_>>();
    assert_eq!(methods, [Method::GET]);
}
