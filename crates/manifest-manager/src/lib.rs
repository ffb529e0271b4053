//! Build Manifest Manager
//!
//! Reads app build manifests from `build.gradle.kts` or `droidplan.toml`
//! and writes them back out in either format.

pub mod gradle_dsl;
pub mod manifest;
pub mod parser;
pub mod writer;

pub use manifest::{
    AppliedVia, ArtifactCoordinate, BuildTypeDecl, DependencyEntry, DependencyScope,
    FlutterConfig, Manifest, PluginDeclaration, RuleFileRef, SigningConfigDecl,
    ToolchainSettings, DEBUG_SIGNING_IDENTITY, FLUTTER_PROFILE_BUILD_TYPE, IMPLICIT_BUILD_TYPES,
};
pub use parser::{GradleParseOptions, ManifestFormat, ManifestParser, ParseError};
pub use writer::{ManifestWriter, WriteError};

/// Well-known plugin identifiers
pub mod plugin_ids {
    pub const ANDROID_APPLICATION: &str = "com.android.application";
    pub const KOTLIN_ANDROID: &str = "org.jetbrains.kotlin.android";
    /// Legacy alias of [`KOTLIN_ANDROID`]
    pub const KOTLIN_ANDROID_LEGACY: &str = "kotlin-android";
    pub const FLUTTER: &str = "dev.flutter.flutter-gradle-plugin";
    pub const GOOGLE_SERVICES: &str = "com.google.gms.google-services";
}

/// Default manifest file names, in lookup order
pub const MANIFEST_FILE_NAMES: &[&str] = &["droidplan.toml", "build.gradle.kts"];
