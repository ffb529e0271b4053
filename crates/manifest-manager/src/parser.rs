//! Build Manifest Parser
//!
//! Reads a [`Manifest`] from either the native TOML document or an app
//! module's `build.gradle.kts`.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, trace};

use droidplan_core::PlanError;

use crate::gradle_dsl::{parse_script, Arg, Expr, Stmt, StmtKind, TemplatePart};
use crate::manifest::{
    BuildTypeDecl, DependencyEntry, DependencyScope, FlutterConfig, Manifest, PluginDeclaration,
    RuleFileRef, SigningConfigDecl,
};

/// Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: {field}: {message}")]
    InvalidValue {
        line: usize,
        field: String,
        message: String,
    },
    #[error("missing required field {0}")]
    MissingField(String),
    #[error("Unsupported manifest format: {0}")]
    UnsupportedFormat(String),
    #[error("Kotlin grammar error: {0}")]
    Grammar(String),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ParseError> for PlanError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Syntax { line, message } => PlanError::ManifestSyntax { line, message },
            ParseError::InvalidValue {
                line,
                field,
                message,
            } => PlanError::InvalidManifest {
                reason: format!("line {}: {}", line, message),
                field_path: field,
            },
            ParseError::MissingField(field) => PlanError::invalid(field, "missing required field"),
            ParseError::Toml(e) => PlanError::TomlParse(e),
            ParseError::Io(e) => PlanError::Io(e),
            other => PlanError::Config(other.to_string()),
        }
    }
}

/// On-disk manifest formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// droidplan.toml
    Toml,
    /// build.gradle.kts
    GradleKts,
}

impl ManifestFormat {
    /// Detect the format from a file name
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        if name.ends_with(".gradle.kts") {
            Some(ManifestFormat::GradleKts)
        } else if name.ends_with(".toml") {
            Some(ManifestFormat::Toml)
        } else {
            None
        }
    }
}

/// Values the Flutter Gradle plugin injects as `flutter.*` properties
#[derive(Debug, Clone)]
pub struct GradleParseOptions {
    pub flutter_properties: BTreeMap<String, String>,
}

impl Default for GradleParseOptions {
    fn default() -> Self {
        let flutter_properties = [
            ("compileSdkVersion", "35"),
            ("targetSdkVersion", "35"),
            ("minSdkVersion", "21"),
            ("ndkVersion", "27.0.12077973"),
            ("versionCode", "1"),
            ("versionName", "1.0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { flutter_properties }
    }
}

impl GradleParseOptions {
    /// Override a `flutter.*` property (e.g. versionCode from pubspec.yaml)
    pub fn with_flutter_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.flutter_properties.insert(key.to_string(), value.into());
        self
    }
}

/// Manifest parser
pub struct ManifestParser;

impl ManifestParser {
    /// Parse a manifest file, picking the format from its name
    pub async fn parse_file(
        path: impl AsRef<Path>,
        options: &GradleParseOptions,
    ) -> Result<Manifest, ParseError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ParseError::FileNotFound(path.display().to_string()));
        }
        let format = ManifestFormat::from_path(path)
            .ok_or_else(|| ParseError::UnsupportedFormat(path.display().to_string()))?;

        debug!("Parsing {:?} manifest from {:?}", format, path);
        let content = tokio::fs::read_to_string(path).await?;
        match format {
            ManifestFormat::Toml => Self::parse_toml(&content),
            ManifestFormat::GradleKts => Self::parse_gradle_kts(&content, options),
        }
    }

    /// Parse the native TOML document
    pub fn parse_toml(content: &str) -> Result<Manifest, ParseError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse an app module's `build.gradle.kts`
    pub fn parse_gradle_kts(
        content: &str,
        options: &GradleParseOptions,
    ) -> Result<Manifest, ParseError> {
        let stmts = parse_script(content)?;
        let mut builder = KtsBuilder::new(options);
        builder.top_level(&stmts)?;
        builder.finish()
    }
}

/// Collects settings while walking the statement tree
struct KtsBuilder<'o> {
    options: &'o GradleParseOptions,
    application_id: Option<String>,
    min_sdk: Option<u32>,
    target_sdk: Option<u32>,
    version_code: Option<u32>,
    version_name: Option<String>,
    manifest: Manifest,
}

impl<'o> KtsBuilder<'o> {
    fn new(options: &'o GradleParseOptions) -> Self {
        Self {
            options,
            application_id: None,
            min_sdk: None,
            target_sdk: None,
            version_code: None,
            version_name: None,
            manifest: Manifest::new("", 0, 0),
        }
    }

    fn finish(mut self) -> Result<Manifest, ParseError> {
        self.manifest.application_id = self
            .application_id
            .ok_or_else(|| missing("android.defaultConfig.applicationId"))?;
        self.manifest.min_platform_version =
            self.min_sdk.ok_or_else(|| missing("android.defaultConfig.minSdk"))?;
        self.manifest.target_platform_version = self
            .target_sdk
            .ok_or_else(|| missing("android.defaultConfig.targetSdk"))?;
        self.manifest.version_code = self
            .version_code
            .ok_or_else(|| missing("android.defaultConfig.versionCode"))?;
        self.manifest.version_name = self
            .version_name
            .ok_or_else(|| missing("android.defaultConfig.versionName"))?;
        Ok(self.manifest)
    }

    fn top_level(&mut self, stmts: &[Stmt]) -> Result<(), ParseError> {
        for stmt in stmts {
            let StmtKind::Expr(ref expr) = stmt.kind else {
                continue;
            };
            match (expr.call_name(), block_of(expr)) {
                (Some("plugins"), Some(body)) => self.plugins(body)?,
                (Some("android"), Some(body)) => self.android(body)?,
                (Some("dependencies"), Some(body)) => self.dependencies(body)?,
                (Some("flutter"), Some(body)) => self.flutter(body)?,
                (Some("kotlin"), Some(body)) => self.kotlin(body)?,
                (Some("apply"), None) => self.explicit_apply(expr, stmt.line)?,
                (name, _) => trace!("line {}: skipping {:?}", stmt.line, name),
            }
        }
        Ok(())
    }

    fn plugins(&mut self, body: &[Stmt]) -> Result<(), ParseError> {
        for stmt in body {
            let StmtKind::Expr(ref expr) = stmt.kind else {
                continue;
            };
            if !applies_now(expr) {
                debug!("line {}: plugin declared with apply false", stmt.line);
                continue;
            }
            let id = plugin_id(expr).ok_or_else(|| ParseError::InvalidValue {
                line: stmt.line,
                field: "plugins".into(),
                message: "expected id(\"...\") or kotlin(\"...\")".into(),
            })?;
            self.manifest.plugins.push(PluginDeclaration::declared(&id));
        }
        Ok(())
    }

    fn explicit_apply(&mut self, expr: &Expr, line: usize) -> Result<(), ParseError> {
        let Expr::Call { args, .. } = expr else {
            return Ok(());
        };
        let id = args
            .iter()
            .find(|a| a.name.as_deref() == Some("plugin"))
            .and_then(|a| a.value.as_str())
            .ok_or_else(|| ParseError::InvalidValue {
                line,
                field: "apply".into(),
                message: "expected apply(plugin = \"...\")".into(),
            })?;
        self.manifest.plugins.push(PluginDeclaration::explicit(id));
        Ok(())
    }

    fn android(&mut self, body: &[Stmt]) -> Result<(), ParseError> {
        for stmt in body {
            match stmt.kind {
                StmtKind::Assign {
                    ref target,
                    ref value,
                } => match target.path().as_deref() {
                    Some("namespace") => {
                        self.manifest.namespace = Some(self.text(value, "android.namespace", stmt.line)?)
                    }
                    Some("compileSdk") => {
                        self.manifest.compile_toolchain_version =
                            Some(self.number(value, "android.compileSdk", stmt.line)?)
                    }
                    Some("ndkVersion") => {
                        self.manifest.ndk_version =
                            Some(self.text(value, "android.ndkVersion", stmt.line)?)
                    }
                    other => trace!("line {}: skipping android.{:?}", stmt.line, other),
                },
                StmtKind::Expr(ref expr) => match (expr.call_name(), block_of(expr)) {
                    (Some("compileOptions"), Some(b)) => self.compile_options(b)?,
                    (Some("kotlinOptions"), Some(b)) => self.kotlin_options(b)?,
                    (Some("defaultConfig"), Some(b)) => self.default_config(b)?,
                    (Some("signingConfigs"), Some(b)) => self.signing_configs(b)?,
                    (Some("buildTypes"), Some(b)) => self.build_types(b)?,
                    (Some("compileSdkVersion"), None) => {
                        self.manifest.compile_toolchain_version =
                            Some(self.number(first_arg(expr, stmt.line)?, "android.compileSdk", stmt.line)?)
                    }
                    (name, _) => trace!("line {}: skipping android.{:?}", stmt.line, name),
                },
                StmtKind::Ignored => {}
            }
        }
        Ok(())
    }

    fn compile_options(&mut self, body: &[Stmt]) -> Result<(), ParseError> {
        for stmt in body {
            let StmtKind::Assign {
                ref target,
                ref value,
            } = stmt.kind
            else {
                continue;
            };
            match target.path().as_deref() {
                Some("sourceCompatibility") => {
                    self.manifest.toolchain.source_compat = self.java_version(
                        value,
                        "android.compileOptions.sourceCompatibility",
                        stmt.line,
                    )?
                }
                Some("targetCompatibility") => {
                    self.manifest.toolchain.target_compat = self.java_version(
                        value,
                        "android.compileOptions.targetCompatibility",
                        stmt.line,
                    )?
                }
                Some("isCoreLibraryDesugaringEnabled") | Some("coreLibraryDesugaringEnabled") => {
                    self.manifest.toolchain.desugaring_enabled = boolean(
                        value,
                        "android.compileOptions.isCoreLibraryDesugaringEnabled",
                        stmt.line,
                    )?
                }
                other => trace!("line {}: skipping compileOptions.{:?}", stmt.line, other),
            }
        }
        Ok(())
    }

    fn kotlin_options(&mut self, body: &[Stmt]) -> Result<(), ParseError> {
        for stmt in body {
            match stmt.kind {
                StmtKind::Assign {
                    ref target,
                    ref value,
                } if target.path().as_deref() == Some("jvmTarget") => {
                    self.manifest.toolchain.jvm_target =
                        Some(self.java_version(value, "android.kotlinOptions.jvmTarget", stmt.line)?);
                }
                // compilerOptions { jvmTarget.set(JvmTarget.JVM_17) }
                StmtKind::Expr(ref expr @ Expr::Call { ref callee, .. })
                    if callee.path().as_deref() == Some("jvmTarget.set") =>
                {
                    let value = first_arg(expr, stmt.line)?;
                    self.manifest.toolchain.jvm_target =
                        Some(self.java_version(value, "kotlin.compilerOptions.jvmTarget", stmt.line)?);
                }
                StmtKind::Expr(ref expr) if expr.call_name() == Some("compilerOptions") => {
                    if let Some(b) = block_of(expr) {
                        self.kotlin_options(b)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn kotlin(&mut self, body: &[Stmt]) -> Result<(), ParseError> {
        self.kotlin_options(body)
    }

    fn default_config(&mut self, body: &[Stmt]) -> Result<(), ParseError> {
        for stmt in body {
            let (name, value) = match stmt.kind {
                StmtKind::Assign {
                    ref target,
                    ref value,
                } => (target.path(), value),
                // minSdkVersion(23) style
                StmtKind::Expr(ref expr @ Expr::Call { .. }) if block_of(expr).is_none() => {
                    match expr.call_name() {
                        Some(name) => (Some(name.to_string()), first_arg(expr, stmt.line)?),
                        None => continue,
                    }
                }
                _ => continue,
            };
            let line = stmt.line;
            match name.as_deref() {
                Some("applicationId") => {
                    self.application_id =
                        Some(self.text(value, "android.defaultConfig.applicationId", line)?)
                }
                Some("minSdk") | Some("minSdkVersion") => {
                    self.min_sdk = Some(self.number(value, "android.defaultConfig.minSdk", line)?)
                }
                Some("targetSdk") | Some("targetSdkVersion") => {
                    self.target_sdk =
                        Some(self.number(value, "android.defaultConfig.targetSdk", line)?)
                }
                Some("versionCode") => {
                    self.version_code =
                        Some(self.number(value, "android.defaultConfig.versionCode", line)?)
                }
                Some("versionName") => {
                    self.version_name =
                        Some(self.text(value, "android.defaultConfig.versionName", line)?)
                }
                other => trace!("line {}: skipping defaultConfig.{:?}", line, other),
            }
        }
        Ok(())
    }

    fn signing_configs(&mut self, body: &[Stmt]) -> Result<(), ParseError> {
        for stmt in body {
            let StmtKind::Expr(ref expr) = stmt.kind else {
                continue;
            };
            let Some((name, block)) = named_block(expr) else {
                continue;
            };
            let decl = self.manifest.signing_configs.entry(name).or_default();
            for inner in block {
                let StmtKind::Assign {
                    ref target,
                    ref value,
                } = inner.kind
                else {
                    continue;
                };
                match target.path().as_deref() {
                    Some("storeFile") => {
                        decl.store_file = match value {
                            Expr::Call { .. } if value.call_name() == Some("file") => {
                                value.first_str_arg().map(str::to_string)
                            }
                            Expr::Str(s) => Some(s.clone()),
                            _ => None,
                        }
                    }
                    Some("keyAlias") => decl.key_alias = value.as_str().map(str::to_string),
                    // Passwords are never copied into the manifest
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn build_types(&mut self, body: &[Stmt]) -> Result<(), ParseError> {
        for stmt in body {
            let StmtKind::Expr(ref expr) = stmt.kind else {
                continue;
            };
            let Some((name, block)) = named_block(expr) else {
                continue;
            };
            let field = format!("android.buildTypes.{}", name);
            let mut decl = self
                .manifest
                .build_types
                .shift_remove(&name)
                .unwrap_or_default();
            for inner in block {
                self.build_type_setting(&mut decl, inner, &field)?;
            }
            self.manifest.build_types.insert(name, decl);
        }
        Ok(())
    }

    fn build_type_setting(
        &self,
        decl: &mut BuildTypeDecl,
        stmt: &Stmt,
        field: &str,
    ) -> Result<(), ParseError> {
        let line = stmt.line;
        match stmt.kind {
            StmtKind::Assign {
                ref target,
                ref value,
            } => {
                let setting = target.path().unwrap_or_default();
                let path = format!("{}.{}", field, setting);
                match setting.as_str() {
                    "signingConfig" => decl.signing_config = signing_reference(value),
                    "isMinifyEnabled" | "minifyEnabled" => {
                        decl.minify_enabled = Some(boolean(value, &path, line)?)
                    }
                    "isShrinkResources" | "shrinkResources" => {
                        decl.shrink_resources = Some(boolean(value, &path, line)?)
                    }
                    "isDebuggable" | "debuggable" => {
                        decl.debuggable = Some(boolean(value, &path, line)?)
                    }
                    "applicationIdSuffix" => {
                        decl.application_id_suffix = Some(self.text(value, &path, line)?)
                    }
                    "versionNameSuffix" => {
                        decl.version_name_suffix = Some(self.text(value, &path, line)?)
                    }
                    other => trace!("line {}: skipping {}.{}", line, field, other),
                }
            }
            StmtKind::Expr(ref expr) => match (expr, expr.call_name()) {
                (Expr::Call { args, .. }, Some("proguardFiles") | Some("proguardFile")) => {
                    for arg in args {
                        decl.proguard_files
                            .push(rule_file(arg, &format!("{}.proguardFiles", field), line)?);
                    }
                }
                (Expr::Call { args, .. }, Some("initWith")) => {
                    decl.init_with = args.first().and_then(|a| match a.value {
                        Expr::Ident(ref name) => Some(name.clone()),
                        ref call => call.first_str_arg().map(str::to_string),
                    });
                }
                _ => trace!("line {}: skipping call in {}", line, field),
            },
            StmtKind::Ignored => {}
        }
        Ok(())
    }

    fn dependencies(&mut self, body: &[Stmt]) -> Result<(), ParseError> {
        for stmt in body {
            let StmtKind::Expr(ref expr @ Expr::Call { ref args, .. }) = stmt.kind else {
                continue;
            };
            let Some(configuration) = expr.call_name() else {
                continue;
            };
            let Some((scope, variant)) = configuration_scope(configuration) else {
                debug!("line {}: skipping configuration '{}'", stmt.line, configuration);
                continue;
            };
            let Some(arg) = args.first() else {
                continue;
            };
            let field = format!("dependencies.{}", configuration);
            let entry = match arg.value {
                Expr::Str(ref notation) => DependencyEntry::parse(notation, scope),
                ref call @ Expr::Call { .. } => match call.call_name() {
                    Some("platform") | Some("enforcedPlatform") => {
                        let notation = call.first_str_arg().unwrap_or_default();
                        DependencyEntry::platform(notation)
                    }
                    Some("kotlin") => {
                        let module = call.first_str_arg().unwrap_or_default();
                        DependencyEntry::parse(&format!("org.jetbrains.kotlin:kotlin-{}", module), scope)
                    }
                    other => {
                        debug!("line {}: skipping local dependency {:?}", stmt.line, other);
                        continue;
                    }
                },
                _ => {
                    debug!("line {}: skipping computed dependency notation", stmt.line);
                    continue;
                }
            };
            let mut entry = entry.map_err(|message| ParseError::InvalidValue {
                line: stmt.line,
                field,
                message,
            })?;
            entry.variant = variant;
            self.manifest.dependencies.push(entry);
        }
        Ok(())
    }

    fn flutter(&mut self, body: &[Stmt]) -> Result<(), ParseError> {
        for stmt in body {
            if let StmtKind::Assign {
                ref target,
                ref value,
            } = stmt.kind
            {
                if target.path().as_deref() == Some("source") {
                    let source = self.text(value, "flutter.source", stmt.line)?;
                    self.manifest.flutter = Some(FlutterConfig { source });
                }
            }
        }
        Ok(())
    }

    /// String literal, template, `flutter.*` property or `x.toString()`
    fn text(&self, expr: &Expr, field: &str, line: usize) -> Result<String, ParseError> {
        match expr {
            Expr::Str(s) => Ok(s.clone()),
            Expr::Template(parts) => self.template(parts, field, line),
            Expr::Member(..) => self.flutter_property(expr, field, line),
            Expr::Call { callee, args, .. } if args.is_empty() && expr.call_name() == Some("toString") => {
                match callee.as_ref() {
                    Expr::Member(receiver, _) => self.text(receiver, field, line),
                    _ => Err(invalid(line, field, "expected a string")),
                }
            }
            _ => Err(invalid(line, field, "expected a string")),
        }
    }

    fn number(&self, expr: &Expr, field: &str, line: usize) -> Result<u32, ParseError> {
        let raw = match expr {
            Expr::Number(n) => n.clone(),
            Expr::Member(..) => self.flutter_property(expr, field, line)?,
            Expr::Template(parts) => self.template(parts, field, line)?,
            _ => return Err(invalid(line, field, "expected an integer")),
        };
        raw.parse()
            .map_err(|_| invalid(line, field, format!("'{}' is not an integer", raw)))
    }

    /// `JavaVersion.VERSION_1_8`, `JvmTarget.JVM_17`, `"11"` or
    /// `JavaVersion.VERSION_11.toString()`, normalised to "1.8", "17", "11"
    fn java_version(&self, expr: &Expr, field: &str, line: usize) -> Result<String, ParseError> {
        match expr {
            Expr::Str(s) => Ok(s.clone()),
            Expr::Number(n) => Ok(n.clone()),
            Expr::Template(parts) => self.template(parts, field, line),
            Expr::Member(..) => {
                let path = expr.path().unwrap_or_default();
                let constant = path.rsplit('.').next().unwrap_or_default();
                let level = constant
                    .strip_prefix("VERSION_")
                    .or_else(|| constant.strip_prefix("JVM_"))
                    .ok_or_else(|| invalid(line, field, format!("unknown Java version '{}'", path)))?;
                Ok(level.replace('_', "."))
            }
            Expr::Call { callee, args, .. } if args.is_empty() && expr.call_name() == Some("toString") => {
                match callee.as_ref() {
                    Expr::Member(receiver, _) => self.java_version(receiver, field, line),
                    _ => Err(invalid(line, field, "expected a Java version")),
                }
            }
            _ => Err(invalid(line, field, "expected a Java version")),
        }
    }

    /// Concatenate a string template; only literals and `flutter.*`
    /// properties can be evaluated without running Gradle
    fn template(&self, parts: &[TemplatePart], field: &str, line: usize) -> Result<String, ParseError> {
        let mut out = String::new();
        for part in parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Expr { expr, source } => {
                    let value = match expr {
                        Expr::Str(s) | Expr::Number(s) => s.clone(),
                        Expr::Member(..) if is_flutter_path(expr) => {
                            self.flutter_property(expr, field, line)?
                        }
                        _ => {
                            return Err(invalid(
                                line,
                                field,
                                format!("cannot evaluate template expression `{}`", source),
                            ))
                        }
                    };
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }

    fn flutter_property(&self, expr: &Expr, field: &str, line: usize) -> Result<String, ParseError> {
        let path = expr.path().unwrap_or_default();
        let key = path
            .strip_prefix("flutter.")
            .ok_or_else(|| invalid(line, field, format!("cannot evaluate '{}'", path)))?;
        self.options
            .flutter_properties
            .get(key)
            .cloned()
            .ok_or_else(|| invalid(line, field, format!("unknown Flutter property '{}'", key)))
    }
}

fn is_flutter_path(expr: &Expr) -> bool {
    expr.path().is_some_and(|p| p.starts_with("flutter."))
}

fn missing(field: &str) -> ParseError {
    ParseError::MissingField(field.to_string())
}

fn invalid(line: usize, field: &str, message: impl Into<String>) -> ParseError {
    ParseError::InvalidValue {
        line,
        field: field.to_string(),
        message: message.into(),
    }
}

fn boolean(expr: &Expr, field: &str, line: usize) -> Result<bool, ParseError> {
    expr.as_bool()
        .ok_or_else(|| invalid(line, field, "expected true or false"))
}

fn block_of(expr: &Expr) -> Option<&[Stmt]> {
    match expr {
        Expr::Call {
            block: Some(body), ..
        } => Some(body),
        _ => None,
    }
}

fn first_arg(expr: &Expr, line: usize) -> Result<&Expr, ParseError> {
    match expr {
        Expr::Call { args, .. } if !args.is_empty() => Ok(&args[0].value),
        _ => Err(ParseError::Syntax {
            line,
            message: "expected an argument".into(),
        }),
    }
}

/// `release { }`, `getByName("release") { }`, `create("staging") { }`
fn named_block(expr: &Expr) -> Option<(String, &[Stmt])> {
    let block = block_of(expr)?;
    match expr.call_name()? {
        "getByName" | "named" | "create" | "register" | "maybeCreate" => {
            Some((expr.first_str_arg()?.to_string(), block))
        }
        name => Some((name.to_string(), block)),
    }
}

/// `signingConfigs.getByName("x")`, `signingConfigs["x"]`, `null`
fn signing_reference(value: &Expr) -> Option<String> {
    match value {
        Expr::Call { .. } => value.first_str_arg().map(str::to_string),
        Expr::Index(_, index) => index.as_str().map(str::to_string),
        _ => None,
    }
}

fn rule_file(arg: &Arg, field: &str, line: usize) -> Result<RuleFileRef, ParseError> {
    match arg.value {
        Expr::Str(ref path) => Ok(RuleFileRef::Project(path.clone())),
        ref call @ Expr::Call { .. } => match (call.call_name(), call.first_str_arg()) {
            (Some("getDefaultProguardFile"), Some(name)) => Ok(RuleFileRef::Default(name.to_string())),
            (Some("file"), Some(path)) => Ok(RuleFileRef::Project(path.to_string())),
            _ => Err(invalid(line, field, "expected a rule file reference")),
        },
        _ => Err(invalid(line, field, "expected a rule file reference")),
    }
}

fn plugin_id(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Infix { lhs, .. } => plugin_id(lhs),
        Expr::Call { .. } => match expr.call_name()? {
            "id" => expr.first_str_arg().map(str::to_string),
            "kotlin" => expr
                .first_str_arg()
                .map(|m| format!("org.jetbrains.kotlin.{}", m)),
            _ => None,
        },
        // `application`, `java` and other core plugins
        Expr::Ident(name) => Some(name.clone()),
        _ => None,
    }
}

/// `id("x") version "1" apply false` declares without applying
fn applies_now(expr: &Expr) -> bool {
    match expr {
        Expr::Infix { lhs, name, rhs } => {
            if name == "apply" && rhs.as_bool() == Some(false) {
                return false;
            }
            applies_now(lhs)
        }
        _ => true,
    }
}

/// Map a dependency configuration to its scope and variant filter
fn configuration_scope(configuration: &str) -> Option<(DependencyScope, Option<String>)> {
    let scope = match configuration {
        "implementation" | "api" | "compileOnly" => DependencyScope::Compile,
        "runtimeOnly" => DependencyScope::Runtime,
        "testImplementation" | "androidTestImplementation" | "testRuntimeOnly" => {
            DependencyScope::Test
        }
        "coreLibraryDesugaring" => DependencyScope::CoreLibraryDesugaring,
        other => {
            for (suffix, scope) in [
                ("Implementation", DependencyScope::Compile),
                ("Api", DependencyScope::Compile),
                ("RuntimeOnly", DependencyScope::Runtime),
            ] {
                if let Some(variant) = other.strip_suffix(suffix) {
                    if !variant.is_empty() && variant.chars().all(|c| c.is_ascii_alphanumeric()) {
                        return Some((scope, Some(variant.to_string())));
                    }
                }
            }
            return None;
        }
    };
    Some((scope, None))
}
