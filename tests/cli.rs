use std::fs;
use std::process::Command;

fn heatdis() -> Command {
    Command::new(env!("CARGO_BIN_EXE_heatdis"))
}

fn write_backend_config(dir: &std::path::Path) -> std::path::PathBuf {
    let store = dir.join("ckpt");
    let path = dir.join("backend.json");
    fs::write(
        &path,
        format!("{{ \"checkpoint_dir\": {:?} }}", store.to_str().unwrap()),
    )
    .unwrap();
    path
}

#[test]
fn zero_size_exits_with_code_3() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_backend_config(dir.path());
    let output = heatdis()
        .args(["--size", "0"])
        .arg(&config)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Wrong memory size"));
    // Fails before the backend is touched.
    assert!(!dir.path().join("ckpt").exists());
}

#[test]
fn unreadable_backend_config_exits_with_code_2() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    let output = heatdis()
        .args(["--size", "1", "--nsteps", "1"])
        .arg(&missing)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn malformed_backend_config_exits_with_code_2() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backend.json");
    fs::write(&path, "not json").unwrap();
    let output = heatdis()
        .args(["--size", "1", "--nsteps", "1"])
        .arg(&path)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn build_info_short_circuits() {
    let output = heatdis().arg("--build-info").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("git_describe"));
}

#[test]
fn small_run_prints_the_standard_surface() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_backend_config(dir.path());
    let output = heatdis()
        .args([
            "--size",
            "1",
            "--nsteps",
            "4",
            "--checkpoint-interval",
            "2",
            "--ranks",
            "2",
        ])
        .arg(&config)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Local data size is"));
    assert!(stdout.contains("Target precision"));
    assert!(stdout.contains("Maximum number of iterations : 4"));
    assert!(stdout.contains("Execution finished in"));

    // Interval 2 over 4 steps: version 2 persisted, 4 skipped as the
    // final iteration, for both ranks.
    let store = dir.path().join("ckpt");
    assert!(store.join("heatdis.r0.v2.ckpt").exists());
    assert!(store.join("heatdis.r1.v2.ckpt").exists());
    assert!(!store.join("heatdis.r0.v4.ckpt").exists());
}

#[test]
fn transactional_flag_keeps_the_final_version() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_backend_config(dir.path());
    let output = heatdis()
        .args([
            "--size",
            "1",
            "--nsteps",
            "4",
            "--checkpoint-interval",
            "2",
            "--transactional",
            "--run-id",
            "wrapped",
        ])
        .arg(&config)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let store = dir.path().join("ckpt");
    assert!(store.join("wrapped.r0.v2.ckpt").exists());
    assert!(store.join("wrapped.r0.v4.ckpt").exists());
}
