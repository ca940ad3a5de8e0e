// Get git info
// make available to src as constants
use std::process::Command;

fn git(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!(
        "cargo:rustc-env=GIT_DESCRIBE={}",
        git(&["describe", "--tags", "--always"])
    );
    println!("cargo:rustc-env=GIT_HASH={}", git(&["rev-parse", "HEAD"]));
}
