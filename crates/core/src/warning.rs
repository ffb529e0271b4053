//! Soft warnings
//!
//! Warnings never abort a resolution. They are collected in the
//! [`ResolutionContext`](crate::ResolutionContext) and handed back with
//! the successful result so the caller decides whether to proceed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A configuration smell found during resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    /// A non-debuggable variant is signed with the debug identity
    SigningIdentityMismatch { variant: String, identity: String },
    /// A non-debuggable variant has no signing config; its artifact is unsigned
    UnsignedArtifact { variant: String },
    /// A platform aggregate that no dependency inherits from
    UnusedPlatform { platform: String },
    /// Desugaring is enabled but no desugar library is declared
    MissingDesugarLibrary,
    /// The version constraint depends on repository state
    DynamicVersion { artifact: String, constraint: String },
}

impl Warning {
    /// Stable name of the warning kind
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::SigningIdentityMismatch { .. } => "SigningIdentityMismatchWarning",
            Warning::UnsignedArtifact { .. } => "UnsignedArtifactWarning",
            Warning::UnusedPlatform { .. } => "UnusedPlatformWarning",
            Warning::MissingDesugarLibrary => "MissingDesugarLibraryWarning",
            Warning::DynamicVersion { .. } => "DynamicVersionWarning",
        }
    }

    /// Manifest field the warning points at
    pub fn field_path(&self) -> String {
        match self {
            Warning::SigningIdentityMismatch { variant, .. }
            | Warning::UnsignedArtifact { variant } => {
                format!("android.buildTypes.{}.signingConfig", variant)
            }
            Warning::UnusedPlatform { platform } => format!("dependencies.platform({})", platform),
            Warning::MissingDesugarLibrary => "dependencies.coreLibraryDesugaring".to_string(),
            Warning::DynamicVersion { artifact, .. } => format!("dependencies.{}", artifact),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SigningIdentityMismatch { variant, identity } => write!(
                f,
                "variant '{}' is signed with the '{}' identity",
                variant, identity
            ),
            Warning::UnsignedArtifact { variant } => write!(
                f,
                "variant '{}' has no signing config; the artifact is unsigned",
                variant
            ),
            Warning::UnusedPlatform { platform } => {
                write!(f, "platform '{}' is not inherited by any dependency", platform)
            }
            Warning::MissingDesugarLibrary => write!(
                f,
                "core library desugaring is enabled without a coreLibraryDesugaring dependency"
            ),
            Warning::DynamicVersion {
                artifact,
                constraint,
            } => write!(f, "'{}' uses dynamic version '{}'", artifact, constraint),
        }
    }
}
