//! Build Plan Engine
//!
//! Resolves a manifest and a requested variant into an artifact
//! descriptor and a full build plan:
//! - dependency versions (explicit or inherited from a platform)
//! - signing identity and shrinker rules per variant
//! - compiler settings shared by javac and kotlinc
//! - plugin application order

pub mod batch;
pub mod dependencies;
pub mod emitter;
pub mod plugins;
pub mod resolver;
pub mod rules;
pub mod signing;
pub mod variant;

pub use batch::{resolve_batch, BatchJob, BatchOutcome};
pub use dependencies::{
    DependencyResolver, ResolvedDependency, ResolvedDependencySet, ResolvedPlatform, VersionSource,
};
pub use emitter::{output_file_name, ArtifactDescriptor, ArtifactEmitter, BuildPlan, PlatformLevels};
pub use plugins::{AppliedPlugin, PluginRegistry};
pub use resolver::{Resolution, Resolver};
pub use rules::{FsRuleSource, InMemoryRuleSource, MergedRule, MergedRules, RuleSource};
pub use signing::SigningAssignment;
pub use variant::{EffectiveBuildType, ResolvedVariant, VariantResolver};

use std::sync::Arc;

use droidplan_core::{ResolverConfig, Result};
use droidplan_manifest::Manifest;

/// Resolve `variant` with default settings, reading project rule files
/// from the current directory.
pub fn resolve(manifest: &Manifest, variant: &str) -> Result<ArtifactDescriptor> {
    let resolver = Resolver::new(&ResolverConfig::default(), Arc::new(FsRuleSource::new(".")));
    Ok(resolver.resolve(manifest, variant)?.descriptor)
}
