//! CLI commands for droidplan
//!
//! Each command discovers its project, resolves what it was asked for and
//! prints the result. Warnings go to stderr; the returned [`Report`] lets
//! the binary pick an exit code.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::info;

use droidplan_core::{PlanError, ResolverConfig, Warning};
use droidplan_engine::{resolve_batch, BatchJob, FsRuleSource, Resolver};
use droidplan_manifest::{ManifestFormat, ManifestWriter};

use crate::project::Project;

/// Outcome counts of a command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    pub warnings: usize,
    pub failures: usize,
}

impl Report {
    fn merge(&mut self, other: Report) {
        self.warnings += other.warnings;
        self.failures += other.failures;
    }
}

fn print_warnings(warnings: &[Warning]) -> Report {
    for warning in warnings {
        eprintln!("warning[{}]: {}", warning.kind(), warning);
    }
    Report {
        warnings: warnings.len(),
        failures: 0,
    }
}

fn describe_error(err: &PlanError) -> String {
    match err.field_path() {
        Some(path) => format!("{} [{} at {}]", err, err.kind(), path),
        None => format!("{} [{}]", err, err.kind()),
    }
}

/// Render a failed command for stderr; resolution errors use their
/// user-facing message
pub fn render_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<PlanError>() {
        Some(plan) if err.chain().count() > 1 => format!("{}: {}", err, plan.user_message()),
        Some(plan) => plan.user_message(),
        None => format!("{:#}", err),
    }
}

/// Print the artifact descriptor of one variant
pub struct ResolveCommand {
    pub path: PathBuf,
    pub variant: Option<String>,
}

impl ResolveCommand {
    /// Execute the resolve command
    pub async fn execute(&self, config: &ResolverConfig) -> Result<Report> {
        let project = Project::discover(&self.path)?;
        let manifest = project.load_manifest().await?;
        let variant = self.variant.as_deref().unwrap_or(&config.default_variant);

        let resolution = project
            .resolver(config)
            .resolve(&manifest, variant)
            .with_context(|| format!("Failed to resolve variant '{}'", variant))?;

        println!("{}", resolution.descriptor.to_json()?);
        Ok(print_warnings(&resolution.warnings))
    }
}

/// Print or write the full build plan of one variant
pub struct PlanCommand {
    pub path: PathBuf,
    pub variant: Option<String>,
    pub output: Option<PathBuf>,
}

impl PlanCommand {
    /// Execute the plan command
    pub async fn execute(&self, config: &ResolverConfig) -> Result<Report> {
        let project = Project::discover(&self.path)?;
        let manifest = project.load_manifest().await?;
        let variant = self.variant.as_deref().unwrap_or(&config.default_variant);

        let resolution = project
            .resolver(config)
            .resolve(&manifest, variant)
            .with_context(|| format!("Failed to resolve variant '{}'", variant))?;
        let json = resolution.plan.to_json()?;

        match &self.output {
            Some(output) => {
                tokio::fs::write(output, format!("{}\n", json))
                    .await
                    .with_context(|| format!("Failed to write plan to {:?}", output))?;
                info!("Build plan written to {:?}", output);
            }
            None => println!("{}", json),
        }
        Ok(print_warnings(&resolution.warnings))
    }
}

/// Resolve every variant a manifest declares
pub struct CheckCommand {
    pub path: PathBuf,
}

impl CheckCommand {
    /// Execute the check command
    pub async fn execute(&self, config: &ResolverConfig) -> Result<Report> {
        let project = Project::discover(&self.path)?;
        let manifest = project.load_manifest().await?;
        let resolver = project.resolver(config);

        println!("{} ({})", manifest.application_id, project.label());
        let mut report = Report::default();
        for variant in manifest.variant_names() {
            match resolver.resolve(&manifest, &variant) {
                Ok(resolution) => {
                    println!(
                        "✓ {}: {} signed with '{}'",
                        variant, resolution.plan.output_file, resolution.descriptor.signing_identity_ref
                    );
                    if let Some(keystore) = resolution.plan.signing.keystore_path(&project.module_dir) {
                        if !keystore.is_file() {
                            println!("  note: keystore {} not found on this machine", keystore.display());
                        }
                    }
                    report.merge(print_warnings(&resolution.warnings));
                }
                Err(err) => {
                    println!("✗ {}: {}", variant, describe_error(&err));
                    report.failures += 1;
                }
            }
        }
        Ok(report)
    }
}

/// Manifest format to convert into
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConvertTarget {
    /// droidplan.toml
    Toml,
    /// build.gradle.kts
    Kts,
}

/// Convert between the TOML manifest and a Gradle Kotlin script
pub struct ConvertCommand {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub to: Option<ConvertTarget>,
}

impl ConvertCommand {
    fn target(&self, project: &Project) -> ConvertTarget {
        if let Some(to) = self.to {
            return to;
        }
        let output_format = self.output.as_deref().and_then(ManifestFormat::from_path);
        let input_format = ManifestFormat::from_path(&project.manifest_path);
        match (output_format, input_format) {
            (Some(ManifestFormat::GradleKts), _) => ConvertTarget::Kts,
            (Some(ManifestFormat::Toml), _) => ConvertTarget::Toml,
            (None, Some(ManifestFormat::Toml)) => ConvertTarget::Kts,
            (None, _) => ConvertTarget::Toml,
        }
    }

    /// Execute the convert command
    pub async fn execute(&self) -> Result<Report> {
        let project = Project::discover(&self.input)?;
        let manifest = project.load_manifest().await?;
        let writer = ManifestWriter::new();

        let rendered = match self.target(&project) {
            ConvertTarget::Toml => writer
                .to_toml(&manifest)
                .context("Failed to render TOML manifest")?,
            ConvertTarget::Kts => writer.to_gradle_kts(&manifest),
        };

        match &self.output {
            Some(output) => {
                tokio::fs::write(output, rendered)
                    .await
                    .with_context(|| format!("Failed to write {:?}", output))?;
                println!("Converted {} -> {}", project.label(), output.display());
            }
            None => print!("{}", rendered),
        }
        Ok(Report::default())
    }
}

/// Resolve many projects concurrently
pub struct BatchCommand {
    pub paths: Vec<PathBuf>,
    pub variant: Option<String>,
    pub jobs: Option<usize>,
}

impl BatchCommand {
    /// Execute the batch command
    pub async fn execute(&self, config: &ResolverConfig) -> Result<Report> {
        let variant = self.variant.as_deref().unwrap_or(&config.default_variant);
        let mut report = Report::default();

        let mut jobs = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let loaded = match Project::discover(path) {
                Ok(project) => project.load_manifest().await.map(|m| (project, m)),
                Err(err) => Err(err),
            };
            match loaded {
                Ok((project, manifest)) => {
                    let rules = Arc::new(project.rule_source(config));
                    jobs.push(BatchJob::new(project.label(), manifest, variant).with_rules(rules));
                }
                Err(err) => {
                    println!("✗ {}: {:#}", path.display(), err);
                    report.failures += 1;
                }
            }
        }

        let resolver = Arc::new(Resolver::new(config, Arc::new(FsRuleSource::new("."))));
        let parallel = self.jobs.unwrap_or_else(|| config.batch.parallelism());
        for outcome in resolve_batch(resolver, jobs, parallel).await {
            match outcome.result {
                Ok(resolution) => {
                    println!(
                        "✓ {} [{}]: {} {} ({})",
                        outcome.label,
                        outcome.variant,
                        resolution.descriptor.application_id,
                        resolution.descriptor.version_name,
                        resolution.descriptor.version_code
                    );
                    report.merge(print_warnings(&resolution.warnings));
                }
                Err(err) => {
                    println!("✗ {} [{}]: {}", outcome.label, outcome.variant, describe_error(&err));
                    report.failures += 1;
                }
            }
        }
        Ok(report)
    }
}

/// Print the effective configuration
pub struct ConfigCommand {
    pub show_path: bool,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, config: &ResolverConfig, source: Option<&PathBuf>) -> Result<Report> {
        if self.show_path {
            match source.cloned().or_else(ResolverConfig::config_file) {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("Cannot determine config path"),
            }
        } else {
            let rendered = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
            print!("{}", rendered);
        }
        Ok(Report::default())
    }
}
