//! Signing Identity Assignment
//!
//! Picks the signing identity of a variant by name. Only references are
//! handled here; keystore passwords never enter a build plan. A
//! non-debuggable variant without a signing config produces an unsigned
//! artifact, as the Android Gradle plugin does.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use droidplan_core::{PlanError, Result, Warning};
use droidplan_manifest::{Manifest, DEBUG_SIGNING_IDENTITY};

use crate::variant::EffectiveBuildType;

/// Alias of the key inside the debug keystore
pub const DEBUG_KEY_ALIAS: &str = "androiddebugkey";

/// Keystore location of the implicit debug identity
pub const DEBUG_KEYSTORE: &str = "~/.android/debug.keystore";

/// Identity reference of an unsigned artifact
pub const UNSIGNED: &str = "unsigned";

/// Signing identity chosen for a variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningAssignment {
    /// None when the artifact is left unsigned
    pub identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_alias: Option<String>,
    /// Identity came from the build type's defaults, not the manifest
    pub implicit: bool,
}

impl SigningAssignment {
    pub fn is_debug_identity(&self) -> bool {
        self.identity.as_deref() == Some(DEBUG_SIGNING_IDENTITY)
    }

    /// Reference written into the artifact descriptor
    pub fn identity_ref(&self) -> &str {
        self.identity.as_deref().unwrap_or(UNSIGNED)
    }

    /// Keystore path on this machine; relative paths resolve against `module_dir`
    pub fn keystore_path(&self, module_dir: &Path) -> Option<PathBuf> {
        let store = self.store_file.as_deref()?;
        match store.strip_prefix("~/") {
            Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
            None => Some(module_dir.join(store)),
        }
    }
}

/// Assign the signing identity of `build_type`; the warning is set when
/// the artifact will be unsigned
pub fn assign_signing(
    manifest: &Manifest,
    build_type: &EffectiveBuildType,
) -> Result<(SigningAssignment, Option<Warning>)> {
    let (identity, implicit) = match build_type.signing_config {
        Some(ref name) => (name.clone(), build_type.signing_implicit),
        None if build_type.debuggable => (DEBUG_SIGNING_IDENTITY.to_string(), true),
        None => {
            debug!("Variant '{}' has no signing config, leaving it unsigned", build_type.name);
            let unsigned = SigningAssignment {
                identity: None,
                store_file: None,
                key_alias: None,
                implicit: false,
            };
            let warning = Warning::UnsignedArtifact {
                variant: build_type.name.clone(),
            };
            return Ok((unsigned, Some(warning)));
        }
    };

    if !manifest.has_signing_identity(&identity) {
        return Err(PlanError::UnknownSigningIdentity {
            identity,
            field_path: format!("android.buildTypes.{}.signingConfig", build_type.name),
        });
    }

    let declared = manifest.signing_configs.get(&identity);
    let mut assignment = SigningAssignment {
        store_file: declared.and_then(|d| d.store_file.clone()),
        key_alias: declared.and_then(|d| d.key_alias.clone()),
        identity: Some(identity),
        implicit,
    };
    if assignment.is_debug_identity() {
        assignment.store_file.get_or_insert_with(|| DEBUG_KEYSTORE.to_string());
        assignment.key_alias.get_or_insert_with(|| DEBUG_KEY_ALIAS.to_string());
    }

    debug!(
        "Variant '{}' signed with '{}'{}",
        build_type.name,
        assignment.identity_ref(),
        if assignment.implicit { " (implicit)" } else { "" }
    );
    Ok((assignment, None))
}
