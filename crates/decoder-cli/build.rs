//! Stamps `GIT_SHA` and `BUILD_DATE` into the `decoder-cli --version` string.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

fn main() {
    let manifest_dir = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default());
    let workspace_root = manifest_dir.join("../..");

    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    for watched in ["HEAD", "index"] {
        let path = workspace_root.join(".git").join(watched);
        if path.exists() {
            println!("cargo:rerun-if-changed={}", path.display());
        }
    }

    println!(
        "cargo:rustc-env=GIT_SHA={}",
        git_revision(&workspace_root).unwrap_or_else(|| "unknown".to_string())
    );
    println!("cargo:rustc-env=BUILD_DATE={}", build_date());
}

/// Short commit hash, suffixed with `-dirty` when the tree has local changes.
fn git_revision(root: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["describe", "--always", "--dirty", "--abbrev=9", "--exclude=*"])
        .output()
        .ok()
        .filter(|out| out.status.success())?;
    let revision = String::from_utf8(out.stdout).ok()?.trim().to_string();
    (!revision.is_empty()).then_some(revision)
}

fn build_date() -> String {
    env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.parse::<i64>().ok())
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .unwrap_or_else(OffsetDateTime::now_utc)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown-date".to_string())
}
