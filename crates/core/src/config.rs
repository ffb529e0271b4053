//! Resolver Configuration
//!
//! Settings that are not part of any manifest:
//! - default variant and strictness
//! - maximum language level of each compiler
//! - where default rule files come from
//! - batch parallelism

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use tracing::{info, debug};

use crate::error::{PlanError, Result};

/// A compiler whose language level bounds the effective target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompilerProfile {
    /// Display name (e.g. "kotlinc")
    pub name: String,
    /// Highest Java language level the compiler can emit
    pub max_language_level: u32,
}

/// Both compilers that must agree on class-file compatibility
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// JVM-hosted compiler
    pub jvm: CompilerProfile,
    /// Cross-platform (Flutter) compiler
    pub cross_platform: CompilerProfile,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            jvm: CompilerProfile {
                name: "kotlinc".to_string(),
                max_language_level: 21,
            },
            cross_platform: CompilerProfile {
                name: "flutter".to_string(),
                max_language_level: 17,
            },
        }
    }
}

/// Rule file settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Directory holding replacements for the built-in default rule files
    pub default_rule_dir: Option<PathBuf>,
}

/// Batch resolution settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum concurrent resolutions (defaults to the CPU count)
    pub max_parallel: Option<usize>,
}

impl BatchConfig {
    /// Effective parallelism, never zero
    pub fn parallelism(&self) -> usize {
        self.max_parallel.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Main resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Configuration version for migrations
    pub version: u32,
    /// Variant resolved when none is requested
    pub default_variant: String,
    /// Treat warnings as failures in the CLI
    pub fail_on_warnings: bool,
    /// Default log filter
    pub log_level: String,
    /// Compiler profiles
    pub toolchains: ToolchainConfig,
    /// Rule file settings
    pub rules: RulesConfig,
    /// Batch settings
    pub batch: BatchConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            version: 1,
            default_variant: "debug".to_string(),
            fail_on_warnings: false,
            log_level: "info".to_string(),
            toolchains: ToolchainConfig::default(),
            rules: RulesConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "droidplan", "droidplan")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load configuration from the default location, falling back to defaults
    pub async fn load() -> Result<Self> {
        match Self::config_file() {
            Some(path) if path.exists() => Self::load_from(&path).await,
            _ => {
                info!("Config file not found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from an explicit file
    pub async fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let contents = tokio::fs::read_to_string(path).await?;
        let config: ResolverConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub async fn save(&self) -> Result<()> {
        let config_file = Self::config_file()
            .ok_or_else(|| PlanError::Config("Cannot determine config path".into()))?;
        self.save_to(&config_file).await
    }

    /// Save configuration to an explicit file
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for profile in [&self.toolchains.jvm, &self.toolchains.cross_platform] {
            if profile.max_language_level < 6 {
                return Err(PlanError::Config(format!(
                    "toolchain '{}' has implausible max_language_level {}",
                    profile.name, profile.max_language_level
                )));
            }
        }
        if self.default_variant.trim().is_empty() {
            return Err(PlanError::Config("default_variant must not be empty".into()));
        }
        Ok(())
    }
}
