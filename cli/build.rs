use std::{env, fs, io, path::PathBuf, process::Command};

const REVISION_ENV: &str = "DROIDINJECT_GIT_REVISION";

fn main() {
    println!("cargo:rerun-if-env-changed={}", REVISION_ENV);
    if let Err(e) = write_version_strings() {
        panic!("failed to write the version strings: {:?}", e);
    }
}

fn out_file(name: &str) -> PathBuf {
    PathBuf::from(env::var("OUT_DIR").unwrap()).join(name)
}

/// Both files hold Rust string literals for `include!`
fn write_version_strings() -> io::Result<()> {
    let version = env::var("CARGO_PKG_VERSION").unwrap();
    let target = env::var("TARGET").unwrap();
    let rev = revision().unwrap_or_else(|| String::from("unknown"));

    fs::write(out_file("simple_version_string"), format!("\"{}\"", version))?;
    fs::write(
        out_file("version_string"),
        format!("r#\"{} ({})\nrev {}\"#", version, target, rev.trim()),
    )
}

fn revision() -> Option<String> {
    if let Ok(rev) = env::var(REVISION_ENV) {
        return Some(rev);
    }
    let out = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8(out.stdout).ok()
}
