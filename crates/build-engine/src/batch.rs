//! Batch Resolution
//!
//! Resolves many independent manifests concurrently. Each resolution
//! runs on tokio's blocking pool; at most `max_parallel` run at once and
//! outcomes come back in input order.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use droidplan_core::{PlanError, Result};
use droidplan_manifest::Manifest;

use crate::resolver::{Resolution, Resolver};
use crate::rules::RuleSource;

/// One manifest/variant pair to resolve
pub struct BatchJob {
    /// Caller's name for the job (usually the manifest path)
    pub label: String,
    pub manifest: Manifest,
    pub variant: String,
    /// Rule files of this manifest's module; the resolver's own when absent
    pub rules: Option<Arc<dyn RuleSource>>,
}

impl BatchJob {
    pub fn new(label: impl Into<String>, manifest: Manifest, variant: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            manifest,
            variant: variant.into(),
            rules: None,
        }
    }

    pub fn with_rules(mut self, rules: Arc<dyn RuleSource>) -> Self {
        self.rules = Some(rules);
        self
    }
}

/// Result of one job
pub struct BatchOutcome {
    pub label: String,
    pub variant: String,
    pub result: Result<Resolution>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Resolve `jobs` with at most `max_parallel` in flight
pub async fn resolve_batch(
    resolver: Arc<Resolver>,
    jobs: Vec<BatchJob>,
    max_parallel: usize,
) -> Vec<BatchOutcome> {
    let total = jobs.len();
    info!("Resolving {} manifests, {} at a time", total, max_parallel.max(1));

    let outcomes: Vec<BatchOutcome> = stream::iter(jobs)
        .map(|job| {
            let resolver = Arc::clone(&resolver);
            async move {
                let label = job.label.clone();
                let variant = job.variant.clone();
                let result = tokio::task::spawn_blocking(move || match job.rules {
                    Some(ref rules) => resolver.resolve_with(&job.manifest, &job.variant, rules.as_ref()),
                    None => resolver.resolve(&job.manifest, &job.variant),
                })
                .await
                .unwrap_or_else(|e| {
                    warn!("Resolution task for {} did not finish: {}", label, e);
                    Err(PlanError::InvalidState(format!("resolution task failed: {}", e)))
                });
                BatchOutcome {
                    label,
                    variant,
                    result,
                }
            }
        })
        .buffered(max_parallel.max(1))
        .collect()
        .await;

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!("Batch finished: {} ok, {} failed", total - failed, failed);
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::InMemoryRuleSource;
    use droidplan_core::ResolverConfig;
    use droidplan_manifest::{DependencyEntry, DependencyScope};

    fn manifest(app_id: &str) -> Manifest {
        let mut manifest = Manifest::new(app_id, 24, 34);
        manifest.add_plugin("com.android.application");
        manifest
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        let resolver = Arc::new(Resolver::new(
            &ResolverConfig::default(),
            Arc::new(InMemoryRuleSource::new()),
        ));

        let mut broken = manifest("com.example.broken");
        broken.add_dependency(DependencyEntry::parse("vendor:lib-a", DependencyScope::Compile).unwrap());

        let jobs = vec![
            BatchJob::new("a", manifest("com.example.a"), "debug"),
            BatchJob::new("broken", broken, "debug"),
            BatchJob::new("c", manifest("com.example.c"), "debug"),
            BatchJob::new("d", manifest("com.example.d"), "staging"),
        ];
        let outcomes = resolve_batch(resolver, jobs, 2).await;

        let labels: Vec<&str> = outcomes.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "broken", "c", "d"]);
        assert!(outcomes[0].is_ok());
        assert_eq!(
            outcomes[1].result.as_ref().unwrap_err().kind(),
            "UnresolvedVersionError"
        );
        assert_eq!(
            outcomes[2].result.as_ref().unwrap().descriptor.application_id,
            "com.example.c"
        );
        assert!(matches!(outcomes[3].result, Err(PlanError::UnknownVariant(_))));
    }

    #[tokio::test]
    async fn test_zero_parallelism_still_runs() {
        let resolver = Arc::new(Resolver::new(
            &ResolverConfig::default(),
            Arc::new(InMemoryRuleSource::new()),
        ));
        let outcomes =
            resolve_batch(resolver, vec![BatchJob::new("a", manifest("com.example.a"), "debug")], 0)
                .await;
        assert_eq!(outcomes.len(), 1);
    }
}
