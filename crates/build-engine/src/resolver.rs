//! Resolver
//!
//! Entry point of build-plan resolution. A resolution is synchronous and
//! single-pass: the first hard error ends it, warnings are collected and
//! handed back with the result.

use std::sync::Arc;

use tracing::{debug, info, info_span};

use droidplan_android_toolchain::{check_api_levels, NdkVersion, ToolchainCompatibility};
use droidplan_core::{EventBus, ResolutionContext, ResolverConfig, Result, Warning};
use droidplan_manifest::Manifest;

use crate::dependencies::DependencyResolver;
use crate::emitter::{ArtifactDescriptor, ArtifactEmitter, BuildPlan};
use crate::plugins::PluginRegistry;
use crate::rules::{FsRuleSource, RuleSource};
use crate::variant::VariantResolver;

/// Successful resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    pub descriptor: ArtifactDescriptor,
    pub plan: BuildPlan,
    pub warnings: Vec<Warning>,
}

/// Resolves manifests into build plans
pub struct Resolver {
    compat: ToolchainCompatibility,
    plugins: PluginRegistry,
    rules: Arc<dyn RuleSource>,
    events: Option<Arc<EventBus>>,
}

impl Resolver {
    /// Create a resolver reading rule files through `rules`
    pub fn new(config: &ResolverConfig, rules: Arc<dyn RuleSource>) -> Self {
        Self {
            compat: ToolchainCompatibility::from_config(&config.toolchains),
            plugins: PluginRegistry::default(),
            rules,
            events: None,
        }
    }

    /// Resolver for a module directory on disk
    pub fn for_module(config: &ResolverConfig, module_dir: impl Into<std::path::PathBuf>) -> Self {
        let source = FsRuleSource::new(module_dir).with_default_dir(config.rules.default_rule_dir.clone());
        Self::new(config, Arc::new(source))
    }

    /// Publish resolution events to `bus`
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Plugin registration hook
    pub fn register_plugin(&mut self, id: &str, after: &[&str]) {
        self.plugins.register_plugin(id, after);
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Resolve `variant` of `manifest`
    pub fn resolve(&self, manifest: &Manifest, variant: &str) -> Result<Resolution> {
        self.resolve_with(manifest, variant, self.rules.as_ref())
    }

    /// Resolve with a rule source other than the resolver's own
    pub fn resolve_with(
        &self,
        manifest: &Manifest,
        variant: &str,
        rules: &dyn RuleSource,
    ) -> Result<Resolution> {
        let mut ctx = ResolutionContext::new(variant);
        if let Some(ref bus) = self.events {
            ctx = ctx.with_events(Arc::clone(bus));
        }
        let span = info_span!("resolve", context_id = %ctx.id(), variant = %variant);
        let _enter = span.enter();

        match self.run(manifest, &mut ctx, rules) {
            Ok(resolution) => Ok(resolution),
            Err(err) => {
                ctx.fail(&err);
                info!("Resolution failed: {} ({})", err, err.kind());
                Err(err)
            }
        }
    }

    fn run(
        &self,
        manifest: &Manifest,
        ctx: &mut ResolutionContext,
        rules: &dyn RuleSource,
    ) -> Result<Resolution> {
        info!(
            "Resolving {} variant '{}'",
            manifest.application_id,
            ctx.variant()
        );
        manifest.validate()?;
        check_api_levels(manifest)?;
        if let Some(ref ndk) = manifest.ndk_version {
            NdkVersion::check(ndk)?;
        }

        let plugins = self.plugins.apply(&manifest.plugins)?;

        let (dependencies, dependency_warnings) =
            DependencyResolver::resolve(&manifest.dependencies, ctx.variant())?;
        for warning in dependency_warnings {
            ctx.warn(warning);
        }

        let variant = VariantResolver::new(rules, &self.compat).resolve(
            manifest,
            ctx,
            dependencies.has_desugar_library(),
        )?;

        let warnings = ctx.warnings().to_vec();
        let plan = ArtifactEmitter::plan(manifest, variant, dependencies, plugins, warnings.clone());
        debug!(
            "Resolved {} -> {} with {} warnings",
            plan.descriptor.variant,
            plan.output_file,
            warnings.len()
        );
        Ok(Resolution {
            descriptor: plan.descriptor.clone(),
            plan,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::InMemoryRuleSource;
    use droidplan_core::{ResolutionEvent, ResolutionState};
    use droidplan_manifest::{DependencyEntry, DependencyScope, PluginDeclaration};

    fn resolver() -> Resolver {
        Resolver::new(&ResolverConfig::default(), Arc::new(InMemoryRuleSource::new()))
    }

    fn manifest() -> Manifest {
        let mut manifest = Manifest::new("com.example.app", 24, 34);
        manifest.add_plugin("com.android.application");
        manifest.add_dependency(
            DependencyEntry::parse("androidx.core:core-ktx:1.13.1", DependencyScope::Compile)
                .unwrap(),
        );
        manifest
    }

    #[test]
    fn test_resolve_debug() {
        let resolution = resolver().resolve(&manifest(), "debug").unwrap();
        assert_eq!(resolution.descriptor.signing_identity_ref, "debug");
        assert_eq!(resolution.plan.output_file, "app-debug.apk");
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_dependency_error_before_variant() {
        let mut manifest = manifest();
        manifest.add_dependency(
            DependencyEntry::parse("vendor:lib-a", DependencyScope::Compile).unwrap(),
        );
        let err = resolver().resolve(&manifest, "debug").unwrap_err();
        assert_eq!(err.kind(), "UnresolvedVersionError");
    }

    #[test]
    fn test_events_published() {
        let bus = Arc::new(EventBus::new());
        let subscription = bus.subscribe();
        let resolver = resolver().with_events(Arc::clone(&bus));

        resolver.resolve(&manifest(), "debug").unwrap();
        let events = subscription.drain();
        assert!(matches!(events.first(), Some(ResolutionEvent::Started { .. })));
        assert!(matches!(events.last(), Some(ResolutionEvent::Completed { .. })));

        let mut bad = manifest();
        bad.plugins.push(PluginDeclaration::explicit("com.android.application"));
        assert!(resolver.resolve(&bad, "debug").is_err());
        let events = subscription.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            ResolutionEvent::StateChanged { to: ResolutionState::Failed, .. }
        )));
    }

    #[test]
    fn test_registered_plugin_order_enforced() {
        let mut resolver = resolver();
        resolver.register_plugin("com.example.crash-reporting", &["com.google.gms.google-services"]);

        let mut manifest = manifest();
        manifest.add_plugin("com.example.crash-reporting");
        let err = resolver.resolve(&manifest, "debug").unwrap_err();
        assert_eq!(err.kind(), "PluginOrderError");
    }
}
