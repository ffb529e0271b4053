//! Build Manifest Data Structures
//!
//! Represents everything an app module's build script declares: identity,
//! platform levels, compiler settings, build types, signing configs,
//! dependencies and plugins.

use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use droidplan_core::{PlanError, Result};

static APPLICATION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$").unwrap());

static COORDINATE_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap());

/// Build types every Android module has without declaring them
pub const IMPLICIT_BUILD_TYPES: &[&str] = &["debug", "release"];

/// Build type the Flutter Gradle plugin registers (initWith debug, not debuggable)
pub const FLUTTER_PROFILE_BUILD_TYPE: &str = "profile";

/// Signing identity available without a signingConfigs entry
pub const DEBUG_SIGNING_IDENTITY: &str = "debug";

/// Complete build manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Globally unique reverse-domain id (e.g. "com.example.app")
    pub application_id: String,

    /// Code namespace; defaults to the application id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Minimum platform API level (minSdk)
    pub min_platform_version: u32,

    /// Target platform API level (targetSdk)
    pub target_platform_version: u32,

    /// API level compiled against (compileSdk); defaults to the target level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_toolchain_version: Option<u32>,

    /// NDK version (e.g. "27.0.12077973")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndk_version: Option<String>,

    /// Monotonic integer version
    pub version_code: u32,

    /// Human readable version
    pub version_name: String,

    /// Java/Kotlin compiler settings
    #[serde(default)]
    pub toolchain: ToolchainSettings,

    /// Named signing identities (references only)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub signing_configs: IndexMap<String, SigningConfigDecl>,

    /// Build type declarations, in declaration order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub build_types: IndexMap<String, BuildTypeDecl>,

    /// External libraries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyEntry>,

    /// Build plugins, in application order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginDeclaration>,

    /// Flutter bridge settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flutter: Option<FlutterConfig>,
}

impl Manifest {
    /// Create a minimal manifest
    pub fn new(application_id: &str, min_sdk: u32, target_sdk: u32) -> Self {
        Self {
            application_id: application_id.to_string(),
            namespace: None,
            min_platform_version: min_sdk,
            target_platform_version: target_sdk,
            compile_toolchain_version: None,
            ndk_version: None,
            version_code: 1,
            version_name: "1.0".to_string(),
            toolchain: ToolchainSettings::default(),
            signing_configs: IndexMap::new(),
            build_types: IndexMap::new(),
            dependencies: Vec::new(),
            plugins: Vec::new(),
            flutter: None,
        }
    }

    /// Namespace, falling back to the application id
    pub fn effective_namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(&self.application_id)
    }

    /// compileSdk, falling back to the target level
    pub fn effective_compile_version(&self) -> u32 {
        self.compile_toolchain_version
            .unwrap_or(self.target_platform_version)
    }

    /// Add a dependency
    pub fn add_dependency(&mut self, entry: DependencyEntry) {
        self.dependencies.push(entry);
    }

    /// Add a plugin declared in the plugins block
    pub fn add_plugin(&mut self, id: &str) {
        self.plugins.push(PluginDeclaration::declared(id));
    }

    /// Whether `name` is a signing identity this manifest can reference
    pub fn has_signing_identity(&self, name: &str) -> bool {
        name == DEBUG_SIGNING_IDENTITY || self.signing_configs.contains_key(name)
    }

    /// Whether the Flutter Gradle plugin is applied
    pub fn is_flutter_app(&self) -> bool {
        self.plugins.iter().any(|p| p.id == crate::plugin_ids::FLUTTER)
    }

    /// Names of every resolvable variant: implicit types first (plus
    /// `profile` for Flutter apps), then declared ones
    pub fn variant_names(&self) -> Vec<String> {
        let mut names: Vec<String> = IMPLICIT_BUILD_TYPES.iter().map(|s| s.to_string()).collect();
        if self.is_flutter_app() {
            names.push(FLUTTER_PROFILE_BUILD_TYPE.to_string());
        }
        for name in self.build_types.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Check identity fields and platform level ordering
    pub fn validate(&self) -> Result<()> {
        if self.application_id.trim().is_empty() {
            return Err(PlanError::invalid(
                "android.defaultConfig.applicationId",
                "missing required field",
            ));
        }
        if !APPLICATION_ID.is_match(&self.application_id) {
            return Err(PlanError::invalid(
                "android.defaultConfig.applicationId",
                format!("'{}' is not a reverse-domain identifier", self.application_id),
            ));
        }
        if let Some(ref namespace) = self.namespace {
            if !APPLICATION_ID.is_match(namespace) {
                return Err(PlanError::invalid(
                    "android.namespace",
                    format!("'{}' is not a valid namespace", namespace),
                ));
            }
        }
        if self.version_code == 0 {
            return Err(PlanError::invalid(
                "android.defaultConfig.versionCode",
                "versionCode must be a positive integer",
            ));
        }
        if self.version_name.trim().is_empty() {
            return Err(PlanError::invalid(
                "android.defaultConfig.versionName",
                "missing required field",
            ));
        }
        if self.min_platform_version > self.target_platform_version {
            return Err(PlanError::invalid(
                "android.defaultConfig.minSdk",
                format!(
                    "minSdk {} is above targetSdk {}",
                    self.min_platform_version, self.target_platform_version
                ),
            ));
        }
        if self.target_platform_version > self.effective_compile_version() {
            return Err(PlanError::invalid(
                "android.defaultConfig.targetSdk",
                format!(
                    "targetSdk {} is above compileSdk {}",
                    self.target_platform_version,
                    self.effective_compile_version()
                ),
            ));
        }
        Ok(())
    }
}

/// Compiler settings shared by javac and the Kotlin compiler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolchainSettings {
    /// Java source compatibility as written (e.g. "1.8", "VERSION_17")
    pub source_compat: String,
    /// Java target compatibility as written
    pub target_compat: String,
    /// Kotlin jvmTarget; follows target_compat when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jvm_target: Option<String>,
    /// Core library desugaring
    pub desugaring_enabled: bool,
    /// Highest Java library API level the app calls into (e.g. "8" for
    /// `java.time`); devices below its API level need desugaring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_level: Option<String>,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            source_compat: "1.8".to_string(),
            target_compat: "1.8".to_string(),
            jvm_target: None,
            desugaring_enabled: false,
            library_level: None,
        }
    }
}

/// A named signing identity; never holds passwords
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningConfigDecl {
    /// Keystore file reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_file: Option<String>,
    /// Key alias inside the keystore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_alias: Option<String>,
}

/// Build type as declared; unset fields fall back to `init_with` and then to
/// the build type's defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTypeDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shrink_resources: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debuggable: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proguard_files: Vec<RuleFileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name_suffix: Option<String>,
}

/// Reference to a shrinker rule file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RuleFileRef {
    /// File shipped with the build tools (getDefaultProguardFile)
    Default(String),
    /// File relative to the module directory
    Project(String),
}

impl RuleFileRef {
    const DEFAULT_PREFIX: &'static str = "default:";

    pub fn file_name(&self) -> &str {
        match self {
            RuleFileRef::Default(name) | RuleFileRef::Project(name) => name,
        }
    }
}

impl fmt::Display for RuleFileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleFileRef::Default(name) => write!(f, "{}{}", Self::DEFAULT_PREFIX, name),
            RuleFileRef::Project(path) => f.write_str(path),
        }
    }
}

impl TryFrom<String> for RuleFileRef {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("rule file reference must not be empty".to_string());
        }
        Ok(match trimmed.strip_prefix(Self::DEFAULT_PREFIX) {
            Some(name) => RuleFileRef::Default(name.to_string()),
            None => RuleFileRef::Project(trimmed.to_string()),
        })
    }
}

impl From<RuleFileRef> for String {
    fn from(value: RuleFileRef) -> Self {
        value.to_string()
    }
}

/// Dependency scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyScope {
    #[default]
    Compile,
    Runtime,
    Test,
    /// Platform aggregate (bill of materials)
    Bom,
    /// Desugared JDK library
    CoreLibraryDesugaring,
}

impl DependencyScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyScope::Compile => "compile",
            DependencyScope::Runtime => "runtime",
            DependencyScope::Test => "test",
            DependencyScope::Bom => "bom",
            DependencyScope::CoreLibraryDesugaring => "coreLibraryDesugaring",
        }
    }
}

/// `group:artifact` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactCoordinate {
    pub group: String,
    pub artifact: String,
}

impl ArtifactCoordinate {
    /// Parse `group:artifact` or `group:artifact:version`
    pub fn parse(notation: &str) -> std::result::Result<(Self, Option<String>), String> {
        let parts: Vec<&str> = notation.trim().split(':').collect();
        let (group, artifact, version) = match parts.as_slice() {
            [g, a] => (*g, *a, None),
            [g, a, v] => (*g, *a, Some(v.to_string())),
            _ => return Err(format!("'{}' is not group:artifact[:version]", notation)),
        };
        for part in [group, artifact] {
            if !COORDINATE_PART.is_match(part) {
                return Err(format!("'{}' is not group:artifact[:version]", notation));
            }
        }
        let version = version.filter(|v| !v.trim().is_empty());
        Ok((
            Self {
                group: group.to_string(),
                artifact: artifact.to_string(),
            },
            version,
        ))
    }

    /// Vendor namespace used for platform inheritance
    pub fn vendor(&self) -> &str {
        &self.group
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

impl TryFrom<String> for ArtifactCoordinate {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match Self::parse(&value)? {
            (coordinate, None) => Ok(coordinate),
            (_, Some(_)) => Err(format!("'{}' must not carry a version", value)),
        }
    }
}

impl From<ArtifactCoordinate> for String {
    fn from(value: ArtifactCoordinate) -> Self {
        value.to_string()
    }
}

/// External library declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEntry {
    /// `group:artifact`
    pub name: ArtifactCoordinate,
    /// Explicit version or range; inherited from a platform when absent
    #[serde(default, rename = "version", alias = "versionConstraint", skip_serializing_if = "Option::is_none")]
    pub version_constraint: Option<String>,
    #[serde(default)]
    pub scope: DependencyScope,
    /// Only applies to this variant (e.g. debugImplementation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl DependencyEntry {
    /// Parse Gradle notation `group:artifact[:version]`
    pub fn parse(notation: &str, scope: DependencyScope) -> std::result::Result<Self, String> {
        let (name, version_constraint) = ArtifactCoordinate::parse(notation)?;
        Ok(Self {
            name,
            version_constraint,
            scope,
            variant: None,
        })
    }

    /// Platform aggregate pinning a vendor's versions
    pub fn platform(notation: &str) -> std::result::Result<Self, String> {
        let entry = Self::parse(notation, DependencyScope::Bom)?;
        if entry.version_constraint.is_none() {
            return Err(format!("platform '{}' needs a version", notation));
        }
        Ok(entry)
    }

    pub fn is_platform(&self) -> bool {
        self.scope == DependencyScope::Bom
    }

    /// Whether the entry takes part in building `variant`
    pub fn applies_to(&self, variant: &str) -> bool {
        self.variant.as_deref().map_or(true, |v| v == variant)
    }

    /// Gradle notation with the explicit version, if any
    pub fn notation(&self) -> String {
        match self.version_constraint {
            Some(ref v) => format!("{}:{}", self.name, v),
            None => self.name.to_string(),
        }
    }
}

/// How a plugin ends up applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppliedVia {
    /// Listed in the plugins block
    #[default]
    Declared,
    /// Applied with an explicit apply(plugin = ...) call
    ExplicitApply,
}

/// Build plugin declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDeclaration {
    pub id: String,
    #[serde(default)]
    pub applied_via: AppliedVia,
    /// Plugins that must already be applied
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_after: Vec<String>,
}

impl PluginDeclaration {
    pub fn declared(id: &str) -> Self {
        Self {
            id: id.to_string(),
            applied_via: AppliedVia::Declared,
            applied_after: Vec::new(),
        }
    }

    pub fn explicit(id: &str) -> Self {
        Self {
            id: id.to_string(),
            applied_via: AppliedVia::ExplicitApply,
            applied_after: Vec::new(),
        }
    }
}

/// flutter { } block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlutterConfig {
    /// Path to the Flutter project root, relative to the module
    pub source: String,
}
