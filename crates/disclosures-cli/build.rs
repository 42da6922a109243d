use chrono::Utc;
use std::process::Command;

fn main() {
    // Short hash plus "-dirty" when tracked files are modified
    let described = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string());

    let build_hash = match described {
        Some(d) if d.ends_with("-dirty") => format!("{d}-{}", Utc::now().format("%Y%m%d-%H%M%S")),
        Some(d) => d,
        None => "unknown".to_string(),
    };

    println!("cargo:rustc-env=BUILD_HASH={build_hash}");

    // .git lives at the workspace root
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");
}
