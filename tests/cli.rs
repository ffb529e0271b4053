//! CLI tests for droidplan.
//!
//! These run the binary against the bundled Flutter demo project.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn demo_project() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/neoflex")
}

/// A config directory isolated from the user's own config
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "").unwrap();
        Self { dir }
    }

    fn droidplan(&self) -> Command {
        let mut cmd = Command::cargo_bin("droidplan").unwrap();
        cmd.arg("--config").arg(self.dir.path().join("config.toml"));
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("droidplan")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("batch"));
}

#[test]
fn test_resolve_debug_descriptor() {
    Sandbox::new()
        .droidplan()
        .arg("resolve")
        .arg(demo_project())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"applicationId\": \"com.example.neoflex\""))
        .stdout(predicate::str::contains("\"variant\": \"debug\""));
}

#[test]
fn test_release_warns_about_debug_identity() {
    Sandbox::new()
        .droidplan()
        .args(["resolve", "--variant", "release"])
        .arg(demo_project())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"signingIdentityRef\": \"debug\""))
        .stderr(predicate::str::contains("SigningIdentityMismatchWarning"));
}

#[test]
fn test_strict_mode_fails_on_warnings() {
    Sandbox::new()
        .droidplan()
        .args(["--strict", "resolve", "--variant", "release"])
        .arg(demo_project())
        .assert()
        .code(2);
}

#[test]
fn test_unknown_variant_exits_with_error() {
    Sandbox::new()
        .droidplan()
        .args(["resolve", "--variant", "staging"])
        .arg(demo_project())
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "error: Failed to resolve variant 'staging': UnknownVariantError",
        ));
}

#[test]
fn test_flutter_profile_variant_resolves() {
    Sandbox::new()
        .droidplan()
        .args(["resolve", "--variant", "profile"])
        .arg(demo_project())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"variant\": \"profile\""))
        .stderr(predicate::str::contains("SigningIdentityMismatchWarning"));
}

const SIGNED_MODULE: &str = r#"
plugins {
    id("com.android.application")
}

android {
    signingConfigs {
        create("upload") {
            storeFile = file("upload.jks")
            keyAlias = "upload"
        }
    }
    defaultConfig {
        applicationId = "com.example.signed"
        minSdk = 23
        targetSdk = 34
        versionCode = 4
        versionName = "1.3"
    }
    buildTypes {
        release {
            signingConfig = signingConfigs.getByName("upload")
        }
        create("staging") {
            applicationIdSuffix = ".staging"
        }
    }
}
"#;

#[test]
fn test_check_notes_missing_keystore_and_unsigned_variant() {
    let sandbox = Sandbox::new();
    let module = sandbox.dir.path().join("signed");
    std::fs::create_dir_all(&module).unwrap();
    std::fs::write(module.join("build.gradle.kts"), SIGNED_MODULE).unwrap();

    sandbox
        .droidplan()
        .arg("check")
        .arg(&module)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ release: app-release.apk signed with 'upload'"))
        .stdout(predicate::str::contains("upload.jks not found on this machine"))
        .stdout(predicate::str::contains("✓ staging: app-staging.apk signed with 'unsigned'"))
        .stderr(predicate::str::contains("UnsignedArtifactWarning"));
}

#[test]
fn test_plan_written_to_file() {
    let sandbox = Sandbox::new();
    let output = sandbox.dir.path().join("plan.json");

    sandbox
        .droidplan()
        .args(["plan", "--variant", "release", "--output"])
        .arg(&output)
        .arg(demo_project())
        .assert()
        .success();

    let plan = std::fs::read_to_string(&output).unwrap();
    assert!(plan.contains("\"outputFile\": \"app-release.apk\""));
    assert!(plan.contains("-optimizationpasses 3"));
}

#[test]
fn test_check_reports_every_variant() {
    Sandbox::new()
        .droidplan()
        .arg("check")
        .arg(demo_project())
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ debug"))
        .stdout(predicate::str::contains("✓ release"))
        .stdout(predicate::str::contains("✓ profile"));
}

#[test]
fn test_convert_to_toml_and_resolve_it() {
    let sandbox = Sandbox::new();
    let module = sandbox.dir.path().join("module");
    std::fs::create_dir_all(&module).unwrap();
    let toml_path = module.join("droidplan.toml");

    sandbox
        .droidplan()
        .arg("convert")
        .arg(demo_project())
        .arg("--output")
        .arg(&toml_path)
        .assert()
        .success();

    let written = std::fs::read_to_string(&toml_path).unwrap();
    assert!(written.contains("com.example.neoflex"));

    sandbox
        .droidplan()
        .arg("resolve")
        .arg(&module)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"applicationId\": \"com.example.neoflex\""));
}

#[test]
fn test_batch_mixes_success_and_failure() {
    let sandbox = Sandbox::new();
    let empty = sandbox.dir.path().join("empty");
    std::fs::create_dir_all(&empty).unwrap();

    sandbox
        .droidplan()
        .args(["batch", "--jobs", "2"])
        .arg(demo_project())
        .arg(&empty)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("com.example.neoflex"))
        .stdout(predicate::str::contains("✗"));
}

#[test]
fn test_config_prints_defaults() {
    Sandbox::new()
        .droidplan()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("default_variant = \"debug\""));
}
