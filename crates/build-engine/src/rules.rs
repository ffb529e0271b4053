//! Shrinker Rule Files
//!
//! Reads the rule files a variant lists and merges them in order.
//! Every rule has a key; a later rule with the same key replaces the
//! earlier one in place.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, trace};

use droidplan_core::{PlanError, Result};
use droidplan_manifest::RuleFileRef;

/// Default rules shipped with the Android build tools
pub const PROGUARD_ANDROID: &str = "proguard-android.txt";
/// Default rules with optimization enabled
pub const PROGUARD_ANDROID_OPTIMIZE: &str = "proguard-android-optimize.txt";

const COMMON_DEFAULT_RULES: &str = r#"-dontusemixedcaseclassnames
-verbose

-keepattributes AnnotationDefault,
                EnclosingMethod,
                InnerClasses,
                RuntimeVisibleAnnotations,
                RuntimeVisibleParameterAnnotations,
                RuntimeVisibleTypeAnnotations,
                Signature

-keep public class com.google.vending.licensing.ILicensingService
-keep public class com.android.vending.licensing.ILicensingService
-keep public class com.google.android.vending.licensing.ILicensingService
-dontnote com.android.vending.licensing.ILicensingService
-dontnote com.google.vending.licensing.ILicensingService
-dontnote com.google.android.vending.licensing.ILicensingService

-keepclasseswithmembernames,includedescriptorclasses class * {
    native <methods>;
}

-keepclassmembers enum * {
    public static **[] values();
    public static ** valueOf(java.lang.String);
}

-keepclassmembers class * implements android.os.Parcelable {
    public static final ** CREATOR;
}

-keepclassmembers class **.R$* {
    public static <fields>;
}

-dontwarn android.support.**
-dontwarn androidx.annotation.Keep
-keep class androidx.annotation.Keep
-keep @androidx.annotation.Keep class * {*;}
"#;

/// Options that hold one value; the latest occurrence wins outright
const SINGLE_VALUE_OPTIONS: &[&str] = &[
    "-allowaccessmodification",
    "-dontobfuscate",
    "-dontoptimize",
    "-dontpreverify",
    "-dontshrink",
    "-dontusemixedcaseclassnames",
    "-flattenpackagehierarchy",
    "-optimizationpasses",
    "-optimizations",
    "-renamesourcefileattribute",
    "-repackageclasses",
    "-verbose",
];

/// Contents of a built-in default rule file
pub fn builtin_default(name: &str) -> Option<String> {
    match name {
        PROGUARD_ANDROID => Some(format!("-dontoptimize\n{}", COMMON_DEFAULT_RULES)),
        PROGUARD_ANDROID_OPTIMIZE => Some(format!(
            "-optimizations !code/simplification/arithmetic,!code/simplification/cast,!field/*,!class/merging/*\n\
             -optimizationpasses 5\n\
             -allowaccessmodification\n{}",
            COMMON_DEFAULT_RULES
        )),
        _ => None,
    }
}

/// Capability that produces rule file contents
pub trait RuleSource: Send + Sync {
    fn read(&self, file: &RuleFileRef) -> io::Result<String>;
}

/// Reads project rule files relative to a module directory
#[derive(Debug, Clone)]
pub struct FsRuleSource {
    module_dir: PathBuf,
    default_dir: Option<PathBuf>,
}

impl FsRuleSource {
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
            default_dir: None,
        }
    }

    /// Directory whose files replace the built-in defaults
    pub fn with_default_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.default_dir = dir;
        self
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }
}

impl RuleSource for FsRuleSource {
    fn read(&self, file: &RuleFileRef) -> io::Result<String> {
        match file {
            RuleFileRef::Project(path) => std::fs::read_to_string(self.module_dir.join(path)),
            RuleFileRef::Default(name) => {
                if let Some(ref dir) = self.default_dir {
                    let candidate = dir.join(name);
                    if candidate.is_file() {
                        return std::fs::read_to_string(candidate);
                    }
                }
                builtin_default(name).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, format!("no default rule file '{}'", name))
                })
            }
        }
    }
}

/// Rule files held in memory; defaults fall back to the built-ins
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleSource {
    files: HashMap<String, String>,
}

impl InMemoryRuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files.insert(path.to_string(), contents.to_string());
        self
    }
}

impl RuleSource for InMemoryRuleSource {
    fn read(&self, file: &RuleFileRef) -> io::Result<String> {
        if let Some(contents) = self.files.get(&file.to_string()) {
            return Ok(contents.clone());
        }
        let fallback = match file {
            RuleFileRef::Default(name) => builtin_default(name),
            RuleFileRef::Project(_) => None,
        };
        fallback.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, file.to_string()))
    }
}

/// One merged rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRule {
    pub key: String,
    pub text: String,
    /// Rule file the winning text came from
    pub origin: String,
}

/// Ordered rules after last-write-wins merging
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRules {
    pub files: Vec<String>,
    pub rules: Vec<MergedRule>,
}

impl MergedRules {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&MergedRule> {
        self.rules.iter().find(|r| r.key == key)
    }

    /// Rules rendered as a single configuration file
    pub fn render(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            out.push_str(&rule.text);
            out.push('\n');
        }
        out
    }
}

/// Read and merge `files` in order
pub fn merge_rule_files(
    source: &dyn RuleSource,
    files: &[RuleFileRef],
    field_path: &str,
) -> Result<MergedRules> {
    let mut merged: IndexMap<String, MergedRule> = IndexMap::new();
    for (index, file) in files.iter().enumerate() {
        let contents = source.read(file).map_err(|e| PlanError::RuleFileUnavailable {
            file: file.to_string(),
            reason: e.to_string(),
            field_path: format!("{}[{}]", field_path, index),
        })?;
        let rules = split_rules(&contents);
        trace!("{}: {} rules", file, rules.len());
        for text in rules {
            let key = rule_key(&text);
            let rule = MergedRule {
                key: key.clone(),
                text,
                origin: file.to_string(),
            };
            // IndexMap::insert keeps the original position of an existing key
            merged.insert(key, rule);
        }
    }
    debug!("Merged {} rules from {} files", merged.len(), files.len());
    Ok(MergedRules {
        files: files.iter().map(|f| f.to_string()).collect(),
        rules: merged.into_values().collect(),
    })
}

/// Split a rule file into rules; continuation lines join the rule above
fn split_rules(contents: &str) -> Vec<String> {
    let mut rules: Vec<String> = Vec::new();
    for raw in contents.lines() {
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        }
        .trim_end();
        if line.trim().is_empty() {
            continue;
        }
        match rules.last_mut() {
            Some(current) if !line.trim_start().starts_with('-') => {
                current.push('\n');
                current.push_str(line);
            }
            _ => rules.push(line.trim_start().to_string()),
        }
    }
    rules
}

/// Option name for single-value options, else option plus class specification
fn rule_key(rule: &str) -> String {
    let mut parts = rule.splitn(2, char::is_whitespace);
    let directive = parts.next().unwrap_or_default();
    if SINGLE_VALUE_OPTIONS.contains(&directive) {
        return directive.to_string();
    }
    let spec = parts.next().unwrap_or_default();
    let spec = spec.split('{').next().unwrap_or_default();
    let spec: Vec<&str> = spec.split_whitespace().collect();
    if spec.is_empty() {
        directive.to_string()
    } else {
        format!("{} {}", directive, spec.join(" "))
    }
}
