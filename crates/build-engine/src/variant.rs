//! Variant Resolution
//!
//! Turns a build type name into a resolved variant by walking the
//! resolution state machine:
//!
//! Unresolved -> SigningAssigned -> RulesMerged -> Resolved
//!
//! Any failure moves the context to Failed; there is no retry.

use serde::Serialize;
use tracing::{debug, info};

use droidplan_android_toolchain::{CompilerInvocation, ToolchainCompatibility};
use droidplan_core::{PlanError, ResolutionContext, ResolutionState, Result, Warning};
use droidplan_manifest::{Manifest, RuleFileRef, DEBUG_SIGNING_IDENTITY, FLUTTER_PROFILE_BUILD_TYPE};

use crate::rules::{merge_rule_files, MergedRules, RuleSource};
use crate::signing::{assign_signing, SigningAssignment};

/// Build type after `initWith` inheritance and defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveBuildType {
    pub name: String,
    pub debuggable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_config: Option<String>,
    #[serde(skip)]
    pub signing_implicit: bool,
    pub minify_enabled: bool,
    pub shrink_resources: bool,
    pub proguard_files: Vec<RuleFileRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id_suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_name_suffix: Option<String>,
}

impl EffectiveBuildType {
    /// Built-in settings; Flutter's `profile` type is debug-signed but
    /// not debuggable
    fn defaults(manifest: &Manifest, name: &str) -> Self {
        let debug = name == "debug";
        let debug_signed = debug || (name == FLUTTER_PROFILE_BUILD_TYPE && manifest.is_flutter_app());
        Self {
            name: name.to_string(),
            debuggable: debug,
            signing_config: debug_signed.then(|| DEBUG_SIGNING_IDENTITY.to_string()),
            signing_implicit: debug_signed,
            minify_enabled: false,
            shrink_resources: false,
            proguard_files: Vec::new(),
            application_id_suffix: None,
            version_name_suffix: None,
        }
    }

    /// Effective settings of build type `name`
    pub fn resolve(manifest: &Manifest, name: &str) -> Result<Self> {
        if !manifest.variant_names().iter().any(|v| v == name) {
            return Err(PlanError::UnknownVariant(name.to_string()));
        }
        Self::resolve_chain(manifest, name, &mut Vec::new())
    }

    fn resolve_chain(manifest: &Manifest, name: &str, visiting: &mut Vec<String>) -> Result<Self> {
        if visiting.iter().any(|v| v == name) {
            return Err(PlanError::invalid(
                format!("android.buildTypes.{}.initWith", name),
                format!("initWith cycle: {} -> {}", visiting.join(" -> "), name),
            ));
        }
        visiting.push(name.to_string());

        let Some(decl) = manifest.build_types.get(name) else {
            return Ok(Self::defaults(manifest, name));
        };

        let mut effective = match decl.init_with {
            Some(ref base) => {
                if !manifest.variant_names().contains(base) {
                    return Err(PlanError::invalid(
                        format!("android.buildTypes.{}.initWith", name),
                        format!("unknown build type '{}'", base),
                    ));
                }
                let mut inherited = Self::resolve_chain(manifest, base, visiting)?;
                inherited.name = name.to_string();
                inherited
            }
            None => Self::defaults(manifest, name),
        };

        if let Some(ref identity) = decl.signing_config {
            effective.signing_config = Some(identity.clone());
            effective.signing_implicit = false;
        }
        if let Some(debuggable) = decl.debuggable {
            effective.debuggable = debuggable;
        }
        if let Some(minify) = decl.minify_enabled {
            effective.minify_enabled = minify;
        }
        if let Some(shrink) = decl.shrink_resources {
            effective.shrink_resources = shrink;
        }
        effective.proguard_files.extend(decl.proguard_files.iter().cloned());
        if decl.application_id_suffix.is_some() {
            effective.application_id_suffix = decl.application_id_suffix.clone();
        }
        if decl.version_name_suffix.is_some() {
            effective.version_name_suffix = decl.version_name_suffix.clone();
        }
        Ok(effective)
    }
}

/// Variant ready for emission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVariant {
    pub build_type: EffectiveBuildType,
    pub signing: SigningAssignment,
    pub rules: MergedRules,
    pub compiler: CompilerInvocation,
}

impl ResolvedVariant {
    pub fn name(&self) -> &str {
        &self.build_type.name
    }
}

/// Drives one variant through the state machine
pub struct VariantResolver<'a> {
    rules: &'a dyn RuleSource,
    compat: &'a ToolchainCompatibility,
}

impl<'a> VariantResolver<'a> {
    pub fn new(rules: &'a dyn RuleSource, compat: &'a ToolchainCompatibility) -> Self {
        Self { rules, compat }
    }

    /// Resolve `ctx.variant()`; on error the context is left in Failed
    pub fn resolve(
        &self,
        manifest: &Manifest,
        ctx: &mut ResolutionContext,
        has_desugar_library: bool,
    ) -> Result<ResolvedVariant> {
        let result = self.run(manifest, ctx, has_desugar_library);
        if let Err(ref err) = result {
            ctx.fail(err);
        }
        result
    }

    fn run(
        &self,
        manifest: &Manifest,
        ctx: &mut ResolutionContext,
        has_desugar_library: bool,
    ) -> Result<ResolvedVariant> {
        info!("Resolving variant '{}'", ctx.variant());
        let build_type = EffectiveBuildType::resolve(manifest, ctx.variant())?;

        let (signing, unsigned) = assign_signing(manifest, &build_type)?;
        if let Some(warning) = unsigned {
            ctx.warn(warning);
        }
        if !build_type.debuggable && signing.is_debug_identity() {
            ctx.warn(Warning::SigningIdentityMismatch {
                variant: build_type.name.clone(),
                identity: signing.identity_ref().to_string(),
            });
        }
        ctx.advance(ResolutionState::SigningAssigned)?;

        let rules = self.shrink_policy(&build_type)?;
        ctx.advance(ResolutionState::RulesMerged)?;

        let compiler = self
            .compat
            .check(&manifest.toolchain, manifest.min_platform_version)?;
        if compiler.desugaring && !has_desugar_library {
            ctx.warn(Warning::MissingDesugarLibrary);
        }
        ctx.advance(ResolutionState::Resolved)?;

        debug!(
            "Variant '{}' resolved: minify {}, {} rules",
            build_type.name,
            build_type.minify_enabled,
            rules.rules.len()
        );
        Ok(ResolvedVariant {
            build_type,
            signing,
            rules,
            compiler,
        })
    }

    fn shrink_policy(&self, build_type: &EffectiveBuildType) -> Result<MergedRules> {
        if build_type.shrink_resources && !build_type.minify_enabled {
            return Err(PlanError::invalid(
                format!("android.buildTypes.{}.isShrinkResources", build_type.name),
                "resource shrinking requires isMinifyEnabled = true",
            ));
        }
        if !build_type.minify_enabled {
            return Ok(MergedRules::default());
        }
        merge_rule_files(
            self.rules,
            &build_type.proguard_files,
            &format!("android.buildTypes.{}.proguardFiles", build_type.name),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::InMemoryRuleSource;
    use droidplan_manifest::{plugin_ids, BuildTypeDecl, PluginDeclaration};

    fn neoflex() -> Manifest {
        let mut manifest = Manifest::new("com.example.neoflex", 23, 33);
        manifest.compile_toolchain_version = Some(35);
        manifest.toolchain.desugaring_enabled = true;
        manifest.build_types.insert(
            "release".into(),
            BuildTypeDecl {
                signing_config: Some("debug".into()),
                minify_enabled: Some(true),
                proguard_files: vec![
                    RuleFileRef::Default("proguard-android-optimize.txt".into()),
                    RuleFileRef::Project("proguard-rules.pro".into()),
                ],
                ..Default::default()
            },
        );
        manifest
    }

    fn rules() -> InMemoryRuleSource {
        InMemoryRuleSource::new().with_file("proguard-rules.pro", "-keep class io.flutter.** { *; }\n")
    }

    #[test]
    fn test_release_with_debug_identity_warns() {
        let manifest = neoflex();
        let source = rules();
        let compat = ToolchainCompatibility::default();
        let mut ctx = ResolutionContext::new("release");

        let variant = VariantResolver::new(&source, &compat)
            .resolve(&manifest, &mut ctx, true)
            .unwrap();
        assert_eq!(ctx.state(), ResolutionState::Resolved);
        assert_eq!(ctx.warnings().len(), 1);
        assert_eq!(ctx.warnings()[0].kind(), "SigningIdentityMismatchWarning");
        assert!(variant.rules.get("-keep class io.flutter.**").is_some());
        assert!(!variant.signing.implicit);
    }

    #[test]
    fn test_debug_skips_rules() {
        let manifest = neoflex();
        let source = rules();
        let compat = ToolchainCompatibility::default();
        let mut ctx = ResolutionContext::new("debug");

        let variant = VariantResolver::new(&source, &compat)
            .resolve(&manifest, &mut ctx, false)
            .unwrap();
        assert!(variant.rules.is_empty());
        assert_eq!(ctx.warnings()[0], Warning::MissingDesugarLibrary);
    }

    #[test]
    fn test_failure_marks_context() {
        let mut manifest = neoflex();
        manifest.toolchain.target_compat = "11".into();
        manifest.toolchain.jvm_target = Some("1.8".into());
        let source = rules();
        let compat = ToolchainCompatibility::default();
        let mut ctx = ResolutionContext::new("release");

        let err = VariantResolver::new(&source, &compat)
            .resolve(&manifest, &mut ctx, true)
            .unwrap_err();
        assert_eq!(err.kind(), "JvmTargetMismatchError");
        assert_eq!(ctx.state(), ResolutionState::Failed);
    }

    #[test]
    fn test_unknown_variant() {
        let manifest = neoflex();
        assert!(matches!(
            EffectiveBuildType::resolve(&manifest, "profile"),
            Err(PlanError::UnknownVariant(_))
        ));
    }

    #[test]
    fn test_flutter_profile_is_debug_signed_not_debuggable() {
        let mut manifest = neoflex();
        manifest.plugins = vec![
            PluginDeclaration::declared(plugin_ids::ANDROID_APPLICATION),
            PluginDeclaration::declared(plugin_ids::KOTLIN_ANDROID),
            PluginDeclaration::declared(plugin_ids::FLUTTER),
        ];
        let source = rules();
        let compat = ToolchainCompatibility::default();
        let mut ctx = ResolutionContext::new("profile");

        let variant = VariantResolver::new(&source, &compat)
            .resolve(&manifest, &mut ctx, true)
            .unwrap();
        assert!(!variant.build_type.debuggable);
        assert!(variant.signing.is_debug_identity());
        assert!(variant.signing.implicit);
        assert!(variant.rules.is_empty());
        assert_eq!(ctx.warnings()[0].kind(), "SigningIdentityMismatchWarning");
    }

    #[test]
    fn test_declared_type_without_signing_is_unsigned() {
        let mut manifest = neoflex();
        manifest.build_types.insert("staging".into(), BuildTypeDecl::default());
        let source = rules();
        let compat = ToolchainCompatibility::default();
        let mut ctx = ResolutionContext::new("staging");

        let variant = VariantResolver::new(&source, &compat)
            .resolve(&manifest, &mut ctx, true)
            .unwrap();
        assert_eq!(variant.signing.identity, None);
        assert_eq!(ctx.state(), ResolutionState::Resolved);
        assert_eq!(
            ctx.warnings(),
            &[Warning::UnsignedArtifact {
                variant: "staging".into()
            }]
        );
    }

    #[test]
    fn test_init_with_inherits_and_appends() {
        let mut manifest = neoflex();
        manifest.build_types.insert(
            "staging".into(),
            BuildTypeDecl {
                init_with: Some("release".into()),
                application_id_suffix: Some(".staging".into()),
                proguard_files: vec![RuleFileRef::Project("staging-rules.pro".into())],
                ..Default::default()
            },
        );
        let staging = EffectiveBuildType::resolve(&manifest, "staging").unwrap();
        assert!(staging.minify_enabled);
        assert_eq!(staging.signing_config.as_deref(), Some("debug"));
        assert_eq!(staging.proguard_files.len(), 3);
        assert_eq!(staging.name, "staging");
    }

    #[test]
    fn test_init_with_cycle() {
        let mut manifest = neoflex();
        for (name, base) in [("a", "b"), ("b", "a")] {
            manifest.build_types.insert(
                name.into(),
                BuildTypeDecl {
                    init_with: Some(base.into()),
                    ..Default::default()
                },
            );
        }
        let err = EffectiveBuildType::resolve(&manifest, "a").unwrap_err();
        assert_eq!(err.kind(), "InvalidManifestError");
    }

    #[test]
    fn test_shrink_resources_requires_minify() {
        let mut manifest = neoflex();
        manifest.build_types["release"].minify_enabled = Some(false);
        manifest.build_types["release"].shrink_resources = Some(true);
        let source = rules();
        let compat = ToolchainCompatibility::default();
        let mut ctx = ResolutionContext::new("release");

        let err = VariantResolver::new(&source, &compat)
            .resolve(&manifest, &mut ctx, true)
            .unwrap_err();
        assert_eq!(err.field_path(), Some("android.buildTypes.release.isShrinkResources"));
    }
}
