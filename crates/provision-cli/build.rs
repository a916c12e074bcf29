use std::env;
use std::process::Command;

use chrono::{DateTime, Utc};

const RELEASE_TAG_PREFIX: &str = "provision@v";

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/");
    println!("cargo:rerun-if-changed=../../.git/index");
    println!("cargo:rerun-if-env-changed=PROVISION_BUILD_VERSION");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    let version = env::var("PROVISION_BUILD_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| describe(env!("CARGO_PKG_VERSION")));

    println!("cargo:rustc-env=PROVISION_VERSION={version}");
}

/// `0.1.0` on a commit tagged `provision@v0.1.0`, otherwise
/// `0.1.0+<hash>[.dirty].<yyyymmdd>` as semver build metadata.
fn describe(version: &str) -> String {
    let Some(hash) = git(&["rev-parse", "--short", "HEAD"]) else {
        return format!("{version}+unknown.{}", build_date());
    };

    let tag = git(&[
        "describe",
        "--tags",
        "--exact-match",
        "--match",
        &format!("{RELEASE_TAG_PREFIX}*"),
    ]);
    let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
        .is_some_and(|status| !status.is_empty());

    if !dirty && tag.as_deref() == Some(&format!("{RELEASE_TAG_PREFIX}{version}")) {
        return version.to_owned();
    }

    let dirty = if dirty { ".dirty" } else { "" };
    format!("{version}+{hash}{dirty}.{}", build_date())
}

/// Honours `SOURCE_DATE_EPOCH` so packaged builds are reproducible.
fn build_date() -> String {
    env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
        .format("%Y%m%d")
        .to_string()
}

/// Trimmed stdout of a successful git invocation.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|out| out.trim().to_owned())
}
