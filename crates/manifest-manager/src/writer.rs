//! Manifest Writer
//!
//! Writes a [`Manifest`] back out as droidplan TOML or as a
//! `build.gradle.kts` the parser reads back to the same manifest.

use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use crate::manifest::{
    AppliedVia, BuildTypeDecl, DependencyEntry, DependencyScope, Manifest, RuleFileRef,
    DEBUG_SIGNING_IDENTITY, IMPLICIT_BUILD_TYPES,
};
use crate::parser::ManifestFormat;

/// Writer errors
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("TOML serialize error: {0}")]
    Toml(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported manifest format: {0}")]
    UnsupportedFormat(String),
}

/// Manifest writer
pub struct ManifestWriter {
    indent: usize,
}

impl Default for ManifestWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestWriter {
    /// Create a new writer with default settings
    pub fn new() -> Self {
        Self { indent: 4 }
    }

    /// Set indentation of the Gradle output
    pub fn with_indent(mut self, spaces: usize) -> Self {
        self.indent = spaces;
        self
    }

    /// Write manifest as droidplan TOML
    pub fn to_toml(&self, manifest: &Manifest) -> Result<String, WriteError> {
        Ok(toml::to_string_pretty(manifest)?)
    }

    /// Write manifest as a Gradle Kotlin DSL script
    pub fn to_gradle_kts(&self, manifest: &Manifest) -> String {
        let mut out = Script::new(self.indent);

        let declared: Vec<_> = manifest
            .plugins
            .iter()
            .filter(|p| p.applied_via == AppliedVia::Declared)
            .collect();
        if !declared.is_empty() {
            out.open("plugins");
            for plugin in declared {
                out.line(&format!("id({})", quote(&plugin.id)));
            }
            out.close();
            out.blank();
        }
        for plugin in manifest
            .plugins
            .iter()
            .filter(|p| p.applied_via == AppliedVia::ExplicitApply)
        {
            out.line(&format!("apply(plugin = {})", quote(&plugin.id)));
        }
        if manifest
            .plugins
            .iter()
            .any(|p| p.applied_via == AppliedVia::ExplicitApply)
        {
            out.blank();
        }

        self.android_block(&mut out, manifest);

        if !manifest.dependencies.is_empty() {
            out.blank();
            out.open("dependencies");
            for entry in &manifest.dependencies {
                out.line(&dependency_line(entry));
            }
            out.close();
        }

        if let Some(ref flutter) = manifest.flutter {
            out.blank();
            out.open("flutter");
            out.line(&format!("source = {}", quote(&flutter.source)));
            out.close();
        }

        out.finish()
    }

    /// Write manifest to a file, picking the format from its name
    pub async fn write_file(
        &self,
        manifest: &Manifest,
        path: impl AsRef<Path>,
    ) -> Result<(), WriteError> {
        let path = path.as_ref();
        let content = match ManifestFormat::from_path(path) {
            Some(ManifestFormat::Toml) => self.to_toml(manifest)?,
            Some(ManifestFormat::GradleKts) => self.to_gradle_kts(manifest),
            None => return Err(WriteError::UnsupportedFormat(path.display().to_string())),
        };
        tokio::fs::write(path, content).await?;
        info!("Wrote manifest to {:?}", path);
        Ok(())
    }

    fn android_block(&self, out: &mut Script, manifest: &Manifest) {
        out.open("android");
        if let Some(ref namespace) = manifest.namespace {
            out.line(&format!("namespace = {}", quote(namespace)));
        }
        if let Some(compile) = manifest.compile_toolchain_version {
            out.line(&format!("compileSdk = {}", compile));
        }
        if let Some(ref ndk) = manifest.ndk_version {
            out.line(&format!("ndkVersion = {}", quote(ndk)));
        }

        let toolchain = &manifest.toolchain;
        out.blank();
        out.open("compileOptions");
        out.line(&format!(
            "sourceCompatibility = {}",
            java_constant(&toolchain.source_compat)
        ));
        out.line(&format!(
            "targetCompatibility = {}",
            java_constant(&toolchain.target_compat)
        ));
        if toolchain.desugaring_enabled {
            out.line("isCoreLibraryDesugaringEnabled = true");
        }
        out.close();

        if let Some(ref jvm_target) = toolchain.jvm_target {
            out.blank();
            out.open("kotlinOptions");
            out.line(&format!("jvmTarget = {}", quote(jvm_target)));
            out.close();
        }

        out.blank();
        out.open("defaultConfig");
        out.line(&format!("applicationId = {}", quote(&manifest.application_id)));
        out.line(&format!("minSdk = {}", manifest.min_platform_version));
        out.line(&format!("targetSdk = {}", manifest.target_platform_version));
        out.line(&format!("versionCode = {}", manifest.version_code));
        out.line(&format!("versionName = {}", quote(&manifest.version_name)));
        out.close();

        if !manifest.signing_configs.is_empty() {
            out.blank();
            out.open("signingConfigs");
            for (name, decl) in &manifest.signing_configs {
                let header = if name == DEBUG_SIGNING_IDENTITY {
                    format!("getByName({})", quote(name))
                } else {
                    format!("create({})", quote(name))
                };
                out.open(&header);
                if let Some(ref store) = decl.store_file {
                    out.line(&format!("storeFile = file({})", quote(store)));
                }
                if let Some(ref alias) = decl.key_alias {
                    out.line(&format!("keyAlias = {}", quote(alias)));
                }
                out.close();
            }
            out.close();
        }

        if !manifest.build_types.is_empty() {
            out.blank();
            out.open("buildTypes");
            for (name, decl) in &manifest.build_types {
                let header = if IMPLICIT_BUILD_TYPES.contains(&name.as_str()) {
                    name.clone()
                } else {
                    format!("create({})", quote(name))
                };
                out.open(&header);
                build_type_body(out, decl);
                out.close();
            }
            out.close();
        }
        out.close();
    }
}

fn build_type_body(out: &mut Script, decl: &BuildTypeDecl) {
    if let Some(ref base) = decl.init_with {
        out.line(&format!("initWith(getByName({}))", quote(base)));
    }
    if let Some(ref identity) = decl.signing_config {
        out.line(&format!(
            "signingConfig = signingConfigs.getByName({})",
            quote(identity)
        ));
    }
    if let Some(value) = decl.debuggable {
        out.line(&format!("isDebuggable = {}", value));
    }
    if let Some(value) = decl.minify_enabled {
        out.line(&format!("isMinifyEnabled = {}", value));
    }
    if let Some(value) = decl.shrink_resources {
        out.line(&format!("isShrinkResources = {}", value));
    }
    if let Some(ref suffix) = decl.application_id_suffix {
        out.line(&format!("applicationIdSuffix = {}", quote(suffix)));
    }
    if let Some(ref suffix) = decl.version_name_suffix {
        out.line(&format!("versionNameSuffix = {}", quote(suffix)));
    }
    if !decl.proguard_files.is_empty() {
        let files: Vec<String> = decl
            .proguard_files
            .iter()
            .map(|file| match file {
                RuleFileRef::Default(name) => format!("getDefaultProguardFile({})", quote(name)),
                RuleFileRef::Project(path) => quote(path),
            })
            .collect();
        out.line(&format!("proguardFiles({})", files.join(", ")));
    }
}

fn dependency_line(entry: &DependencyEntry) -> String {
    let notation = quote(&entry.notation());
    let with_variant = |base: &str, suffix: &str| match entry.variant {
        Some(ref variant) => format!("{}{}", variant, suffix),
        None => base.to_string(),
    };
    match entry.scope {
        DependencyScope::Bom => format!("implementation(platform({}))", notation),
        DependencyScope::Compile => {
            format!("{}({})", with_variant("implementation", "Implementation"), notation)
        }
        DependencyScope::Runtime => {
            format!("{}({})", with_variant("runtimeOnly", "RuntimeOnly"), notation)
        }
        DependencyScope::Test => format!("testImplementation({})", notation),
        DependencyScope::CoreLibraryDesugaring => format!("coreLibraryDesugaring({})", notation),
    }
}

/// "1.8" -> JavaVersion.VERSION_1_8
fn java_constant(level: &str) -> String {
    let bare = level.rsplit('.').next().filter(|_| level.contains('_')).unwrap_or(level);
    let bare = bare
        .trim_start_matches("VERSION_")
        .trim_start_matches("JVM_");
    format!("JavaVersion.VERSION_{}", bare.replace('.', "_"))
}

/// Kotlin string literal
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Indentation-tracking output buffer
struct Script {
    buf: String,
    depth: usize,
    indent: usize,
}

impl Script {
    fn new(indent: usize) -> Self {
        Self {
            buf: String::new(),
            depth: 0,
            indent,
        }
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.buf, "{:width$}{}", "", text, width = self.depth * self.indent);
    }

    fn open(&mut self, header: &str) {
        self.line(&format!("{} {{", header));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    fn blank(&mut self) {
        if !self.buf.is_empty() && !self.buf.ends_with("{\n") && !self.buf.ends_with("\n\n") {
            self.buf.push('\n');
        }
    }

    fn finish(self) -> String {
        self.buf
    }
}
