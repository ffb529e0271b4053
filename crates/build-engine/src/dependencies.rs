//! Dependency Resolution
//!
//! Gives every dependency of a variant exactly one version: its own
//! explicit constraint, or the one pinned by its vendor's platform (BOM).

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, trace};

use droidplan_core::{PlanError, Result, Warning};
use droidplan_manifest::{DependencyEntry, DependencyScope};

/// Where a resolved version came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VersionSource {
    Explicit,
    Platform { platform: String },
}

/// Dependency with its final version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDependency {
    pub name: String,
    pub version: String,
    pub scope: DependencyScope,
    pub source: VersionSource,
}

impl ResolvedDependency {
    /// `group:artifact:version`
    pub fn notation(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}

/// Platform aggregate in effect for a vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPlatform {
    pub name: String,
    pub vendor: String,
    pub version: String,
}

/// Every dependency of one variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDependencySet {
    pub platforms: Vec<ResolvedPlatform>,
    pub dependencies: Vec<ResolvedDependency>,
}

impl ResolvedDependencySet {
    pub fn in_scope(&self, scope: DependencyScope) -> impl Iterator<Item = &ResolvedDependency> {
        self.dependencies.iter().filter(move |d| d.scope == scope)
    }

    pub fn has_desugar_library(&self) -> bool {
        self.in_scope(DependencyScope::CoreLibraryDesugaring).next().is_some()
    }
}

struct PlatformPin {
    platform: ResolvedPlatform,
    used: bool,
}

/// Resolves dependency versions for a variant
pub struct DependencyResolver;

impl DependencyResolver {
    /// Resolve the entries that apply to `variant`.
    ///
    /// Returns the resolved set plus warnings about unused platforms and
    /// dynamic constraints.
    pub fn resolve(
        entries: &[DependencyEntry],
        variant: &str,
    ) -> Result<(ResolvedDependencySet, Vec<Warning>)> {
        let applicable: Vec<(usize, &DependencyEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.applies_to(variant))
            .collect();

        let mut pins = Self::platform_pins(&applicable)?;
        let mut warnings = Vec::new();
        let mut seen: HashMap<String, (String, usize)> = HashMap::new();
        let mut resolved: IndexMap<(String, DependencyScope), ResolvedDependency> = IndexMap::new();

        for (index, entry) in applicable.iter().filter(|(_, e)| !e.is_platform()) {
            let field_path = format!("dependencies[{}]", index);
            let name = entry.name.to_string();

            let (version, source) = match entry.version_constraint {
                Some(ref explicit) => (explicit.clone(), VersionSource::Explicit),
                None => {
                    let pin = pins.get_mut(entry.name.vendor()).ok_or_else(|| {
                        PlanError::UnresolvedVersion {
                            artifact: name.clone(),
                            vendor: entry.name.vendor().to_string(),
                            field_path: field_path.clone(),
                        }
                    })?;
                    pin.used = true;
                    (
                        pin.platform.version.clone(),
                        VersionSource::Platform {
                            platform: pin.platform.name.clone(),
                        },
                    )
                }
            };

            if let Some((first, first_index)) = seen.get(&name) {
                if *first != version {
                    return Err(PlanError::ConflictingVersion {
                        artifact: name,
                        first: format!("{} (dependencies[{}])", first, first_index),
                        second: version,
                        field_path,
                    });
                }
            } else {
                seen.insert(name.clone(), (version.clone(), *index));
            }

            if is_dynamic(&version) {
                warnings.push(Warning::DynamicVersion {
                    artifact: name.clone(),
                    constraint: version.clone(),
                });
            }

            trace!("{} -> {} ({:?})", name, version, source);
            resolved
                .entry((name.clone(), entry.scope))
                .or_insert(ResolvedDependency {
                    name,
                    version,
                    scope: entry.scope,
                    source,
                });
        }

        let mut platforms = Vec::with_capacity(pins.len());
        for (_, pin) in pins {
            if !pin.used {
                warnings.push(Warning::UnusedPlatform {
                    platform: pin.platform.name.clone(),
                });
            }
            platforms.push(pin.platform);
        }

        debug!(
            "Resolved {} dependencies against {} platforms for '{}'",
            resolved.len(),
            platforms.len(),
            variant
        );
        Ok((
            ResolvedDependencySet {
                platforms,
                dependencies: resolved.into_values().collect(),
            },
            warnings,
        ))
    }

    /// Vendor -> platform mapping; at most one version per vendor
    fn platform_pins(
        applicable: &[(usize, &DependencyEntry)],
    ) -> Result<IndexMap<String, PlatformPin>> {
        let mut pins: IndexMap<String, PlatformPin> = IndexMap::new();
        for (index, entry) in applicable.iter().filter(|(_, e)| e.is_platform()) {
            let field_path = format!("dependencies[{}]", index);
            let name = entry.name.to_string();
            let vendor = entry.name.vendor().to_string();
            let version = entry.version_constraint.clone().ok_or_else(|| {
                PlanError::UnresolvedVersion {
                    artifact: name.clone(),
                    vendor: vendor.clone(),
                    field_path: field_path.clone(),
                }
            })?;

            if let Some(existing) = pins.get(&vendor) {
                if existing.platform.version != version {
                    return Err(PlanError::ConflictingVersion {
                        artifact: format!("platform for vendor '{}'", vendor),
                        first: format!("{}:{}", existing.platform.name, existing.platform.version),
                        second: format!("{}:{}", name, version),
                        field_path,
                    });
                }
                continue;
            }
            pins.insert(
                vendor.clone(),
                PlatformPin {
                    platform: ResolvedPlatform {
                        name,
                        vendor,
                        version,
                    },
                    used: false,
                },
            );
        }
        Ok(pins)
    }
}

/// `+`, ranges and `latest.*` depend on repository contents
fn is_dynamic(constraint: &str) -> bool {
    constraint.contains('+')
        || constraint.starts_with('[')
        || constraint.starts_with('(')
        || constraint.starts_with("latest.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(notation: &str) -> DependencyEntry {
        DependencyEntry::parse(notation, DependencyScope::Compile).unwrap()
    }

    fn firebase_entries() -> Vec<DependencyEntry> {
        vec![
            DependencyEntry::platform("com.google.firebase:firebase-bom:33.2.0").unwrap(),
            entry("com.google.firebase:firebase-analytics-ktx"),
            entry("com.google.firebase:firebase-auth-ktx"),
            entry("org.jetbrains.kotlin:kotlin-stdlib:2.1.0"),
            DependencyEntry::parse(
                "com.android.tools:desugar_jdk_libs:2.1.4",
                DependencyScope::CoreLibraryDesugaring,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_platform_inheritance() {
        let (set, warnings) = DependencyResolver::resolve(&firebase_entries(), "release").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(set.platforms.len(), 1);
        assert_eq!(set.dependencies.len(), 4);
        assert!(set.dependencies.iter().all(|d| !d.version.is_empty()));

        let auth = &set.dependencies[1];
        assert_eq!(auth.notation(), "com.google.firebase:firebase-auth-ktx:33.2.0");
        assert_eq!(
            auth.source,
            VersionSource::Platform {
                platform: "com.google.firebase:firebase-bom".into()
            }
        );
        assert_eq!(set.dependencies[2].source, VersionSource::Explicit);
        assert!(set.has_desugar_library());
    }

    #[test]
    fn test_explicit_version_wins_over_platform() {
        let mut entries = firebase_entries();
        entries.push(entry("com.google.firebase:firebase-firestore-ktx:25.0.0"));
        let (set, _) = DependencyResolver::resolve(&entries, "debug").unwrap();
        let firestore = set.dependencies.last().unwrap();
        assert_eq!(firestore.version, "25.0.0");
        assert_eq!(firestore.source, VersionSource::Explicit);
    }

    #[test]
    fn test_unresolved_version() {
        let err = DependencyResolver::resolve(&[entry("vendor:lib-a")], "debug").unwrap_err();
        assert_eq!(err.kind(), "UnresolvedVersionError");
        assert_eq!(err.field_path(), Some("dependencies[0]"));
    }

    #[test]
    fn test_conflicting_versions() {
        let entries = vec![entry("vendor:lib-a:1.0"), entry("vendor:lib-a:2.0")];
        let err = DependencyResolver::resolve(&entries, "debug").unwrap_err();
        assert_eq!(err.kind(), "ConflictingVersionError");
        assert_eq!(err.field_path(), Some("dependencies[1]"));
    }

    #[test]
    fn test_conflict_across_scopes() {
        let test_entry = DependencyEntry::parse("vendor:lib-a:2.0", DependencyScope::Test).unwrap();
        let err = DependencyResolver::resolve(&[entry("vendor:lib-a:1.0"), test_entry], "debug")
            .unwrap_err();
        assert!(matches!(err, PlanError::ConflictingVersion { .. }));
    }

    #[test]
    fn test_second_platform_for_vendor() {
        let same = vec![
            DependencyEntry::platform("vendor:bom:1.0").unwrap(),
            DependencyEntry::platform("vendor:bom:1.0").unwrap(),
            entry("vendor:lib-a"),
        ];
        assert!(DependencyResolver::resolve(&same, "debug").is_ok());

        let different = vec![
            DependencyEntry::platform("vendor:bom:1.0").unwrap(),
            DependencyEntry::platform("vendor:bom:2.0").unwrap(),
        ];
        let err = DependencyResolver::resolve(&different, "debug").unwrap_err();
        assert_eq!(err.field_path(), Some("dependencies[1]"));
    }

    #[test]
    fn test_unused_platform_and_dynamic_warnings() {
        let entries = vec![
            DependencyEntry::platform("com.google.firebase:firebase-bom:33.2.0").unwrap(),
            entry("androidx.core:core-ktx:1.+"),
        ];
        let (_, warnings) = DependencyResolver::resolve(&entries, "debug").unwrap();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].kind(), "DynamicVersionWarning");
        assert_eq!(warnings[1].kind(), "UnusedPlatformWarning");
    }

    #[test]
    fn test_variant_filter() {
        let mut debug_only = entry("com.squareup.leakcanary:leakcanary-android");
        debug_only.variant = Some("debug".into());

        // no platform for squareup, but release never sees the entry
        let (set, _) = DependencyResolver::resolve(&[debug_only.clone()], "release").unwrap();
        assert!(set.dependencies.is_empty());
        assert!(DependencyResolver::resolve(&[debug_only], "debug").is_err());
    }
}
