//! Project discovery
//!
//! Locates the manifest of a project directory and loads it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use droidplan_core::ResolverConfig;
use droidplan_engine::{FsRuleSource, Resolver};
use droidplan_manifest::{
    GradleParseOptions, Manifest, ManifestFormat, ManifestParser, MANIFEST_FILE_NAMES,
};

/// Gradle build script of an app module
pub const GRADLE_SCRIPT: &str = "build.gradle.kts";

/// How the manifest of a project was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    /// A `droidplan.toml` document
    Native,
    /// Flutter project root with `android/app/build.gradle.kts`
    Flutter,
    /// A Gradle app module directory
    GradleModule,
}

impl ProjectKind {
    /// Get the display name for the project kind
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Native => "droidplan manifest",
            Self::Flutter => "Flutter app",
            Self::GradleModule => "Gradle module",
        }
    }
}

/// A discovered project
#[derive(Debug, Clone)]
pub struct Project {
    pub kind: ProjectKind,
    /// Directory discovery started from
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    /// Directory project rule files are relative to
    pub module_dir: PathBuf,
}

impl Project {
    /// Find the manifest of `path`, which may be a directory or a manifest file
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.is_file() {
            return Self::from_manifest_file(path);
        }
        if !path.is_dir() {
            anyhow::bail!("No such file or directory: {:?}", path);
        }

        for name in MANIFEST_FILE_NAMES {
            let candidate = path.join(name);
            if candidate.is_file() {
                let kind = match ManifestFormat::from_path(&candidate) {
                    Some(ManifestFormat::Toml) => ProjectKind::Native,
                    _ => ProjectKind::GradleModule,
                };
                return Ok(Self::new(kind, path, candidate));
            }
        }

        let flutter_module = path.join("android").join("app").join(GRADLE_SCRIPT);
        if path.join("pubspec.yaml").is_file() && flutter_module.is_file() {
            return Ok(Self::new(ProjectKind::Flutter, path, flutter_module));
        }

        Err(anyhow::anyhow!(
            "No {} found in {:?}",
            MANIFEST_FILE_NAMES.join(" or "),
            path
        ))
    }

    fn from_manifest_file(path: &Path) -> Result<Self> {
        let kind = match ManifestFormat::from_path(path) {
            Some(ManifestFormat::Toml) => ProjectKind::Native,
            Some(ManifestFormat::GradleKts) => ProjectKind::GradleModule,
            None => anyhow::bail!("Unsupported manifest file: {:?}", path),
        };
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::new(kind, root, path.to_path_buf()))
    }

    fn new(kind: ProjectKind, root: &Path, manifest_path: PathBuf) -> Self {
        let module_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        debug!("Discovered {} at {:?}", kind.display_name(), manifest_path);
        Self {
            kind,
            root: root.to_path_buf(),
            manifest_path,
            module_dir,
        }
    }

    /// Flutter project root, when the manifest belongs to one
    pub fn flutter_root(&self) -> Option<PathBuf> {
        match self.kind {
            ProjectKind::Flutter => Some(self.root.clone()),
            ProjectKind::GradleModule => {
                // android/app/build.gradle.kts -> ../..
                let candidate = self.module_dir.parent()?.parent()?;
                candidate
                    .join("pubspec.yaml")
                    .is_file()
                    .then(|| candidate.to_path_buf())
            }
            ProjectKind::Native => None,
        }
    }

    /// Parse options carrying the Flutter version from `pubspec.yaml`
    pub fn parse_options(&self) -> Result<GradleParseOptions> {
        let mut options = GradleParseOptions::default();
        let Some(root) = self.flutter_root() else {
            return Ok(options);
        };

        let pubspec = root.join("pubspec.yaml");
        let content = std::fs::read_to_string(&pubspec)
            .with_context(|| format!("Failed to read {:?}", pubspec))?;
        if let Some((name, code)) = pubspec_version(&content) {
            debug!("Flutter version {} ({:?}) from {:?}", name, code, pubspec);
            options = options.with_flutter_property("versionName", name);
            if let Some(code) = code {
                options = options.with_flutter_property("versionCode", code);
            }
        }
        Ok(options)
    }

    /// Load the project's manifest
    pub async fn load_manifest(&self) -> Result<Manifest> {
        let options = self.parse_options()?;
        let manifest = ManifestParser::parse_file(&self.manifest_path, &options)
            .await
            .with_context(|| format!("Failed to load manifest {:?}", self.manifest_path))?;
        info!(
            "Loaded {} ({})",
            manifest.application_id,
            self.kind.display_name()
        );
        Ok(manifest)
    }

    /// Rule files of this project, with the configured default rule directory
    pub fn rule_source(&self, config: &ResolverConfig) -> FsRuleSource {
        FsRuleSource::new(&self.module_dir).with_default_dir(config.rules.default_rule_dir.clone())
    }

    /// Resolver reading rule files from this project's module directory
    pub fn resolver(&self, config: &ResolverConfig) -> Resolver {
        Resolver::for_module(config, &self.module_dir)
    }

    /// Name shown in reports
    pub fn label(&self) -> String {
        self.manifest_path.display().to_string()
    }
}

/// Split the `version:` line of a pubspec into name and build number
fn pubspec_version(content: &str) -> Option<(String, Option<String>)> {
    let raw = content
        .lines()
        .filter(|line| !line.starts_with(char::is_whitespace))
        .find_map(|line| line.strip_prefix("version:"))?
        .trim();
    let value = match raw.chars().next() {
        Some(quote @ ('"' | '\'')) => raw[1..].split(quote).next().unwrap_or_default(),
        _ => raw.split(" #").next().unwrap_or_default().trim(),
    };
    if value.is_empty() {
        return None;
    }
    match value.split_once('+') {
        Some((name, code)) => Some((name.to_string(), Some(code.to_string()))),
        None => Some((value.to_string(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL_KTS: &str = r#"
plugins {
    id("com.android.application")
}

android {
    defaultConfig {
        applicationId = "com.example.app"
        minSdk = 24
        targetSdk = 34
        versionCode = flutter.versionCode
        versionName = flutter.versionName
    }
}
"#;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_native_first() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("droidplan.toml"), "");
        write(&dir.path().join(GRADLE_SCRIPT), "");

        let project = Project::discover(dir.path()).unwrap();
        assert_eq!(project.kind, ProjectKind::Native);
        assert_eq!(project.manifest_path, dir.path().join("droidplan.toml"));
    }

    #[test]
    fn test_discover_module_directory() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join(GRADLE_SCRIPT), MINIMAL_KTS);

        let project = Project::discover(dir.path()).unwrap();
        assert_eq!(project.kind, ProjectKind::GradleModule);
        assert_eq!(project.module_dir, dir.path());
    }

    #[test]
    fn test_discover_flutter_project() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("pubspec.yaml"), "name: app\nversion: 2.1.0+14\n");
        write(&dir.path().join("android/app").join(GRADLE_SCRIPT), MINIMAL_KTS);

        let project = Project::discover(dir.path()).unwrap();
        assert_eq!(project.kind, ProjectKind::Flutter);
        assert_eq!(project.module_dir, dir.path().join("android/app"));
    }

    #[test]
    fn test_discover_module_file_finds_flutter_root() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("pubspec.yaml"), "version: 1.0.0\n");
        let script = dir.path().join("android/app").join(GRADLE_SCRIPT);
        write(&script, MINIMAL_KTS);

        let project = Project::discover(&script).unwrap();
        assert_eq!(project.kind, ProjectKind::GradleModule);
        assert_eq!(project.flutter_root(), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_discover_empty_directory_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Project::discover(dir.path()).is_err());
        assert!(Project::discover(dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_pubspec_version() {
        assert_eq!(
            pubspec_version("name: a\nversion: 1.2.3+45\n"),
            Some(("1.2.3".into(), Some("45".into())))
        );
        assert_eq!(pubspec_version("version: '1.0.0'"), Some(("1.0.0".into(), None)));
        assert_eq!(
            pubspec_version("version: \"1.0.0+1\"\n"),
            Some(("1.0.0".into(), Some("1".into())))
        );
        assert_eq!(
            pubspec_version("version: \"3.1.0+7\" # bumped by CI\n"),
            Some(("3.1.0".into(), Some("7".into())))
        );
        assert_eq!(
            pubspec_version("version: 1.4.0+2 # release\n"),
            Some(("1.4.0".into(), Some("2".into())))
        );
        // nested keys are not the app version
        assert_eq!(pubspec_version("environment:\n  version: 3\n"), None);
    }

    #[tokio::test]
    async fn test_load_manifest_uses_pubspec_version() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("pubspec.yaml"), "name: app\nversion: \"2.1.0+14\"\n");
        write(&dir.path().join("android/app").join(GRADLE_SCRIPT), MINIMAL_KTS);

        let project = Project::discover(dir.path()).unwrap();
        let manifest = project.load_manifest().await.unwrap();
        assert_eq!(manifest.version_code, 14);
        assert_eq!(manifest.version_name, "2.1.0");
    }
}
