use std::path::Path;
use std::process::Command;

/// Stamp the short commit hash into `DAILIES_BUILD_SHA` for `--version`.
fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let repo_root = Path::new(&manifest_dir).join("..");
    let git_dir = repo_root.join(".git");

    let sha = Command::new("git")
        .arg("-C")
        .arg(&repo_root)
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=DAILIES_BUILD_SHA={sha}");

    // HEAD only changes on checkout; a commit moves the branch ref it names.
    // Missing paths would force a rerun on every build, so only existing ones are watched.
    let head = std::fs::read_to_string(git_dir.join("HEAD")).unwrap_or_default();
    let branch_ref = head.trim().strip_prefix("ref: ").map(|r| git_dir.join(r));
    let watched = [Some(git_dir.join("HEAD")), branch_ref, Some(git_dir.join("packed-refs"))];
    for path in watched.into_iter().flatten().filter(|p| p.exists()) {
        println!("cargo:rerun-if-changed={}", path.display());
    }
    println!("cargo:rerun-if-changed=build.rs");
}
