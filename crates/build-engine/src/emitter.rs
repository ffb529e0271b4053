//! Artifact Emitter
//!
//! Builds the artifact descriptor and the full build plan from a
//! resolved variant. Output depends only on its inputs; serialising the
//! same plan twice yields the same bytes.

use serde::{Deserialize, Serialize};

use droidplan_android_toolchain::{CompilerInvocation, NdkVersion};
use droidplan_core::{Result, Warning};
use droidplan_manifest::Manifest;

use crate::dependencies::ResolvedDependencySet;
use crate::plugins::AppliedPlugin;
use crate::rules::MergedRules;
use crate::signing::SigningAssignment;
use crate::variant::{EffectiveBuildType, ResolvedVariant};

/// What gets packaged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDescriptor {
    pub application_id: String,
    pub version_code: u32,
    pub version_name: String,
    pub variant: String,
    pub signing_identity_ref: String,
}

/// Platform levels the plan targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformLevels {
    pub min_sdk: u32,
    pub target_sdk: u32,
    pub compile_sdk: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndk_version: Option<String>,
    /// Published release name of the NDK ("r27")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndk_release: Option<String>,
}

/// Everything a build needs, derived from one manifest and variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPlan {
    pub descriptor: ArtifactDescriptor,
    pub namespace: String,
    pub platform: PlatformLevels,
    pub build_type: EffectiveBuildType,
    pub signing: SigningAssignment,
    pub compiler: CompilerInvocation,
    pub dependencies: ResolvedDependencySet,
    pub rules: MergedRules,
    pub plugins: Vec<AppliedPlugin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flutter_source: Option<String>,
    pub output_file: String,
    pub warnings: Vec<Warning>,
}

impl BuildPlan {
    /// Deterministic pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl ArtifactDescriptor {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Emits descriptors and plans
pub struct ArtifactEmitter;

impl ArtifactEmitter {
    /// Descriptor of a resolved variant; suffixes are applied here
    pub fn descriptor(manifest: &Manifest, variant: &ResolvedVariant) -> ArtifactDescriptor {
        let build_type = &variant.build_type;
        ArtifactDescriptor {
            application_id: format!(
                "{}{}",
                manifest.application_id,
                build_type.application_id_suffix.as_deref().unwrap_or_default()
            ),
            version_code: manifest.version_code,
            version_name: format!(
                "{}{}",
                manifest.version_name,
                build_type.version_name_suffix.as_deref().unwrap_or_default()
            ),
            variant: build_type.name.clone(),
            signing_identity_ref: variant.signing.identity_ref().to_string(),
        }
    }

    /// Full plan of a resolved variant
    pub fn plan(
        manifest: &Manifest,
        variant: ResolvedVariant,
        dependencies: ResolvedDependencySet,
        plugins: Vec<AppliedPlugin>,
        warnings: Vec<Warning>,
    ) -> BuildPlan {
        let descriptor = Self::descriptor(manifest, &variant);
        let output_file = output_file_name(&descriptor.variant);
        BuildPlan {
            descriptor,
            namespace: manifest.effective_namespace().to_string(),
            platform: PlatformLevels {
                min_sdk: manifest.min_platform_version,
                target_sdk: manifest.target_platform_version,
                compile_sdk: manifest.effective_compile_version(),
                ndk_version: manifest.ndk_version.clone(),
                ndk_release: manifest
                    .ndk_version
                    .as_deref()
                    .and_then(|raw| raw.parse::<NdkVersion>().ok())
                    .map(|ndk| ndk.release_name()),
            },
            build_type: variant.build_type,
            signing: variant.signing,
            compiler: variant.compiler,
            dependencies,
            rules: variant.rules,
            plugins,
            flutter_source: manifest.flutter.as_ref().map(|f| f.source.clone()),
            output_file,
            warnings,
        }
    }
}

/// `app-<variant>.apk`
pub fn output_file_name(variant: &str) -> String {
    format!("app-{}.apk", variant)
}
