use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::TempDir;

#[test]
fn test_missing_models_exit_with_failure_before_any_output() {
    let models = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_handmark-worker"))
        .arg("--model-dir")
        .arg(models.path())
        .env("XDG_CACHE_HOME", cache.path())
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // A frame is offered, but the worker must give up before reading it.
    let mut stdin = child.stdin.take().unwrap();
    let _ = stdin.write_all(&[0, 0, 0, 5, b'H', b'E', b'L', b'L', b'O']);
    drop(stdin);

    let output = child.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(stderr.starts_with("Error: "));
    assert!(stderr.contains("palm_detection.onnx"));
}

#[test]
fn test_invalid_flag_value_is_rejected() {
    let models = TempDir::new().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_handmark-worker"))
        .arg("--model-dir")
        .arg(models.path())
        .args(["--max-hands", "0"])
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}
