//! Plugin Registry
//!
//! Knows which plugins must come after which, and checks the manifest's
//! plugin sequence against it. Plugins in the `plugins { }` block apply
//! first, in declaration order; explicit `apply(plugin = ...)` calls
//! follow in script order.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, trace};

use droidplan_core::{PlanError, Result};
use droidplan_manifest::plugin_ids::{
    ANDROID_APPLICATION, FLUTTER, GOOGLE_SERVICES, KOTLIN_ANDROID, KOTLIN_ANDROID_LEGACY,
};
use droidplan_manifest::{AppliedVia, PluginDeclaration};

/// Plugin in its applied position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPlugin {
    pub id: String,
    pub applied_via: AppliedVia,
}

/// Ordering constraints between plugins
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    prerequisites: IndexMap<String, Vec<String>>,
    aliases: IndexMap<String, String>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_alias(KOTLIN_ANDROID_LEGACY, KOTLIN_ANDROID);
        registry.register_plugin(KOTLIN_ANDROID, &[ANDROID_APPLICATION]);
        registry.register_plugin(FLUTTER, &[ANDROID_APPLICATION, KOTLIN_ANDROID]);
        registry.register_plugin(GOOGLE_SERVICES, &[ANDROID_APPLICATION]);
        registry
    }
}

impl PluginRegistry {
    /// Registry without any known plugins
    pub fn empty() -> Self {
        Self {
            prerequisites: IndexMap::new(),
            aliases: IndexMap::new(),
        }
    }

    /// Declare that `id` must be applied after every plugin in `after`
    pub fn register_plugin(&mut self, id: &str, after: &[&str]) {
        let id = self.canonical(id);
        let after: Vec<String> = after.iter().map(|p| self.canonical(p)).collect();
        let entry = self.prerequisites.entry(id).or_default();
        for prerequisite in after {
            if !entry.contains(&prerequisite) {
                entry.push(prerequisite);
            }
        }
    }

    /// Treat `alias` as another name for `id`
    pub fn register_alias(&mut self, alias: &str, id: &str) {
        self.aliases.insert(alias.to_string(), id.to_string());
    }

    /// Canonical id of a plugin
    pub fn canonical(&self, id: &str) -> String {
        self.aliases.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    pub fn prerequisites(&self, id: &str) -> &[String] {
        self.prerequisites
            .get(&self.canonical(id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Check `plugins` and return them in application order
    pub fn apply(&self, plugins: &[PluginDeclaration]) -> Result<Vec<AppliedPlugin>> {
        let sequence = plugins
            .iter()
            .enumerate()
            .filter(|(_, p)| p.applied_via == AppliedVia::Declared)
            .chain(
                plugins
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.applied_via == AppliedVia::ExplicitApply),
            );

        let mut applied: Vec<AppliedPlugin> = Vec::with_capacity(plugins.len());
        let mut seen: HashSet<String> = HashSet::new();

        for (index, declaration) in sequence {
            let field_path = format!("plugins[{}]", index);
            let id = self.canonical(&declaration.id);

            if seen.contains(&id) {
                return Err(PlanError::DuplicatePlugin {
                    plugin: declaration.id.clone(),
                    field_path,
                });
            }

            let declared_after = declaration.applied_after.iter().map(|p| self.canonical(p));
            for prerequisite in self.prerequisites(&id).iter().cloned().chain(declared_after) {
                if !seen.contains(&prerequisite) {
                    return Err(PlanError::PluginOrder {
                        plugin: declaration.id.clone(),
                        prerequisite,
                        field_path,
                    });
                }
            }

            trace!("Applying plugin {} ({:?})", id, declaration.applied_via);
            seen.insert(id.clone());
            applied.push(AppliedPlugin {
                id,
                applied_via: declaration.applied_via,
            });
        }

        debug!("Applied {} plugins", applied.len());
        Ok(applied)
    }
}
