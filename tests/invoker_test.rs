#![cfg(unix)]

use galfitm_feedme::feedme::Model;
use galfitm_feedme::{GalfitError, GalfitmInvoker};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).unwrap();
    path
}

#[tokio::test]
async fn test_successful_run_captures_stdout() {
    let dir = TempDir::new().unwrap();
    let exe = script(dir.path(), "fake_galfitm", "echo \"fitting $1\"; echo 'note' >&2");
    let feedme = dir.path().join("obj.feedme");
    std::fs::write(&feedme, "").unwrap();

    let output = GalfitmInvoker::new(&exe, 10).run(&feedme).await.unwrap();

    assert_eq!(output.stdout.trim(), format!("fitting {}", feedme.display()));
    assert_eq!(output.stderr.trim(), "note");
}

#[tokio::test]
async fn test_non_zero_exit_is_tool_failure() {
    let dir = TempDir::new().unwrap();
    let exe = script(
        dir.path(),
        "failing_galfitm",
        "echo 'iteration 1'; echo 'Error: cannot open PSF' >&2; exit 3",
    );

    let err = GalfitmInvoker::new(&exe, 10)
        .run(&dir.path().join("missing.feedme"))
        .await
        .unwrap_err();

    match &err {
        GalfitError::ExternalToolFailure {
            code,
            stdout,
            stderr,
        } => {
            assert_eq!(*code, Some(3));
            assert!(stdout.contains("iteration 1"));
            assert!(stderr.contains("cannot open PSF"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.user_friendly_message().contains("cannot open PSF"));
}

#[tokio::test]
async fn test_timeout_kills_child() {
    let dir = TempDir::new().unwrap();
    let exe = script(dir.path(), "slow_galfitm", "sleep 30");

    let started = Instant::now();
    let err = GalfitmInvoker::new(&exe, 1)
        .run(&dir.path().join("obj.feedme"))
        .await
        .unwrap_err();

    assert!(matches!(err, GalfitError::ExternalToolTimeout { seconds: 1 }));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_run_model_writes_feedme_first() {
    let dir = TempDir::new().unwrap();
    let exe = script(dir.path(), "cat_galfitm", "cat \"$1\"");
    let feedme = dir.path().join("out/obj.feedme");

    let mut model = Model::new();
    model.activate_components(["sky"]).unwrap();

    let output = GalfitmInvoker::new(&exe, 10)
        .with_working_dir(dir.path())
        .run_model(&model, &feedme)
        .await
        .unwrap();

    assert!(feedme.exists());
    assert!(output.stdout.contains("0) sky"));
}

#[tokio::test]
async fn test_missing_executable_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = GalfitmInvoker::new(dir.path().join("nope"), 5)
        .run(&dir.path().join("obj.feedme"))
        .await
        .unwrap_err();
    assert!(matches!(err, GalfitError::IoError(_)));
}
