//! Toolchain Compatibility Layer
//!
//! Reconciles the manifest's compiler settings with the two compilers
//! that build a Flutter Android app (the JVM-hosted Kotlin compiler and
//! the cross-platform toolchain) and produces one invocation descriptor
//! both can consume.

use serde::Serialize;
use tracing::debug;

use droidplan_core::{CompilerProfile, PlanError, Result, ToolchainConfig};
use droidplan_manifest::ToolchainSettings;

use crate::java_version::JavaLevel;
use crate::sdk::{native_language_level, required_api_level};

const SOURCE_FIELD: &str = "android.compileOptions.sourceCompatibility";
const TARGET_FIELD: &str = "android.compileOptions.targetCompatibility";
const JVM_TARGET_FIELD: &str = "android.kotlinOptions.jvmTarget";
const DESUGARING_FIELD: &str = "android.compileOptions.isCoreLibraryDesugaringEnabled";
const LIBRARY_FIELD: &str = "toolchain.libraryLevel";

/// Merged compiler settings for javac and kotlinc
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerInvocation {
    pub source_level: JavaLevel,
    pub target_level: JavaLevel,
    pub jvm_target: JavaLevel,
    /// min of both compilers' highest level
    pub effective_level: JavaLevel,
    /// Library API level the minSdk runtime provides natively
    pub native_level: JavaLevel,
    /// Declared library API level, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_level: Option<JavaLevel>,
    pub desugaring: bool,
    pub javac_args: Vec<String>,
    pub kotlinc_args: Vec<String>,
}

/// Compatibility checks against a pair of compiler profiles
#[derive(Debug, Clone)]
pub struct ToolchainCompatibility {
    jvm: CompilerProfile,
    cross_platform: CompilerProfile,
}

impl Default for ToolchainCompatibility {
    fn default() -> Self {
        Self::from_config(&ToolchainConfig::default())
    }
}

impl ToolchainCompatibility {
    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self {
            jvm: config.jvm.clone(),
            cross_platform: config.cross_platform.clone(),
        }
    }

    /// Highest level both compilers emit
    pub fn effective_level(&self) -> JavaLevel {
        JavaLevel::new(
            self.jvm
                .max_language_level
                .min(self.cross_platform.max_language_level),
        )
    }

    /// Validate `settings` for a module with the given minSdk
    pub fn check(&self, settings: &ToolchainSettings, min_sdk: u32) -> Result<CompilerInvocation> {
        let source = parse_level(&settings.source_compat, SOURCE_FIELD)?;
        let target = parse_level(&settings.target_compat, TARGET_FIELD)?;
        let jvm_target = match settings.jvm_target {
            Some(ref raw) => parse_level(raw, JVM_TARGET_FIELD)?,
            None => target,
        };

        if jvm_target != target {
            return Err(PlanError::JvmTargetMismatch {
                jvm_target: jvm_target.to_string(),
                target_compat: target.to_string(),
                field_path: JVM_TARGET_FIELD.to_string(),
            });
        }

        if source > target {
            return Err(PlanError::IncompatibleToolchain {
                reason: format!("source level {} is above target level {}", source, target),
                field_path: SOURCE_FIELD.to_string(),
            });
        }

        let requested = source.max(target);
        let effective = self.effective_level();
        let native = native_language_level(min_sdk);
        let desugaring = settings.desugaring_enabled;

        if effective < requested && !desugaring {
            return Err(PlanError::IncompatibleToolchain {
                reason: format!(
                    "{} and {} support up to Java {}, but Java {} is requested without desugaring",
                    self.jvm.name, self.cross_platform.name, effective, requested
                ),
                field_path: DESUGARING_FIELD.to_string(),
            });
        }

        // Language features are always desugared by the dexer; only library
        // APIs missing on old devices need core library desugaring.
        let library_level = match settings.library_level {
            Some(ref raw) => Some(parse_level(raw, LIBRARY_FIELD)?),
            None => None,
        };
        if let Some(library) = library_level {
            let needs = required_api_level(library);
            if needs > min_sdk && !desugaring {
                return Err(PlanError::IncompatibleToolchain {
                    reason: format!(
                        "Java {} library APIs need API level {}, minSdk is {}; enable core library desugaring",
                        library, needs, min_sdk
                    ),
                    field_path: DESUGARING_FIELD.to_string(),
                });
            }
        }

        let target_level = target.min(effective);
        let source_level = source.min(target_level);
        debug!(
            "Compiler invocation: source {} target {} (effective {}, native {}, desugaring {})",
            source_level, target_level, effective, native, desugaring
        );

        Ok(CompilerInvocation {
            source_level,
            target_level,
            jvm_target: target_level,
            effective_level: effective,
            native_level: native,
            library_level,
            desugaring,
            javac_args: vec![
                "-source".to_string(),
                source_level.compiler_flag(),
                "-target".to_string(),
                target_level.compiler_flag(),
            ],
            kotlinc_args: vec!["-jvm-target".to_string(), target_level.compiler_flag()],
        })
    }
}

fn parse_level(raw: &str, field: &str) -> Result<JavaLevel> {
    JavaLevel::parse(raw).map_err(|e| PlanError::invalid(field, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(source: &str, target: &str, jvm: Option<&str>, desugaring: bool) -> ToolchainSettings {
        ToolchainSettings {
            source_compat: source.to_string(),
            target_compat: target.to_string(),
            jvm_target: jvm.map(str::to_string),
            desugaring_enabled: desugaring,
            library_level: None,
        }
    }

    #[test]
    fn test_neoflex_settings() {
        let compat = ToolchainCompatibility::default();
        let invocation = compat
            .check(&settings("1.8", "VERSION_1_8", Some("1.8"), true), 23)
            .unwrap();
        assert_eq!(invocation.target_level, JavaLevel::JAVA_8);
        assert_eq!(invocation.effective_level.value(), 17);
        assert_eq!(invocation.javac_args, vec!["-source", "1.8", "-target", "1.8"]);
        assert_eq!(invocation.kotlinc_args, vec!["-jvm-target", "1.8"]);
    }

    #[test]
    fn test_jvm_target_mismatch() {
        let err = ToolchainCompatibility::default()
            .check(&settings("11", "11", Some("1.8"), true), 23)
            .unwrap_err();
        assert_eq!(err.kind(), "JvmTargetMismatchError");
        assert_eq!(err.field_path(), Some(JVM_TARGET_FIELD));
    }

    #[test]
    fn test_jvm_target_follows_target_when_absent() {
        let invocation = ToolchainCompatibility::default()
            .check(&settings("11", "11", None, false), 33)
            .unwrap();
        assert_eq!(invocation.jvm_target, JavaLevel::JAVA_11);
    }

    #[test]
    fn test_language_levels_alone_never_need_desugaring() {
        let compat = ToolchainCompatibility::default();
        for min_sdk in [21, 23, 34] {
            let defaults = compat.check(&ToolchainSettings::default(), min_sdk).unwrap();
            assert_eq!(defaults.target_level, JavaLevel::JAVA_8);
            assert!(!defaults.desugaring);

            let java11 = compat.check(&settings("11", "11", Some("11"), false), min_sdk);
            assert!(java11.is_ok(), "Java 11 at minSdk {}", min_sdk);
        }
    }

    #[test]
    fn test_library_level_needs_desugaring_below_its_api() {
        let compat = ToolchainCompatibility::default();
        let mut java_time = settings("1.8", "1.8", None, false);
        java_time.library_level = Some("8".into());

        let err = compat.check(&java_time, 23).unwrap_err();
        assert_eq!(err.kind(), "IncompatibleToolchainError");
        assert_eq!(err.field_path(), Some(DESUGARING_FIELD));

        let native = compat.check(&java_time, 24).unwrap();
        assert_eq!(native.library_level, Some(JavaLevel::JAVA_8));

        java_time.desugaring_enabled = true;
        assert!(compat.check(&java_time, 21).is_ok());
    }

    #[test]
    fn test_bad_library_level() {
        let mut declared = settings("1.8", "1.8", None, true);
        declared.library_level = Some("eleven".into());
        let err = ToolchainCompatibility::default()
            .check(&declared, 23)
            .unwrap_err();
        assert_eq!(err.field_path(), Some(LIBRARY_FIELD));
    }

    #[test]
    fn test_effective_level_caps_target() {
        let mut config = ToolchainConfig::default();
        config.cross_platform.max_language_level = 11;
        let compat = ToolchainCompatibility::from_config(&config);

        assert!(compat.check(&settings("17", "17", None, false), 34).is_err());

        let invocation = compat.check(&settings("17", "17", None, true), 34).unwrap();
        assert_eq!(invocation.target_level, JavaLevel::JAVA_11);
    }

    #[test]
    fn test_source_above_target() {
        let err = ToolchainCompatibility::default()
            .check(&settings("17", "11", None, true), 34)
            .unwrap_err();
        assert_eq!(err.field_path(), Some(SOURCE_FIELD));
    }
}
