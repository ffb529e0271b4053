//! Error types for droidplan
//!
//! Centralized error handling using thiserror. Every configuration error
//! carries the field path of the manifest entry that caused it.

use thiserror::Error;

/// Main error type for build-plan resolution
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("{field_path}: no version for '{artifact}' and no platform declared for vendor '{vendor}'")]
    UnresolvedVersion {
        artifact: String,
        vendor: String,
        field_path: String,
    },

    #[error("{field_path}: '{artifact}' resolves to both {first} and {second}")]
    ConflictingVersion {
        artifact: String,
        first: String,
        second: String,
        field_path: String,
    },

    #[error("{field_path}: {reason}")]
    IncompatibleToolchain { reason: String, field_path: String },

    #[error("{field_path}: jvmTarget {jvm_target} does not match targetCompatibility {target_compat}")]
    JvmTargetMismatch {
        jvm_target: String,
        target_compat: String,
        field_path: String,
    },

    #[error("{field_path}: plugin '{plugin}' must be applied after '{prerequisite}'")]
    PluginOrder {
        plugin: String,
        prerequisite: String,
        field_path: String,
    },

    #[error("{field_path}: plugin '{plugin}' is already applied")]
    DuplicatePlugin { plugin: String, field_path: String },

    #[error("{field_path}: {reason}")]
    InvalidManifest { reason: String, field_path: String },

    #[error("buildTypes: unknown variant '{0}'")]
    UnknownVariant(String),

    #[error("{field_path}: signing config '{identity}' is not declared")]
    UnknownSigningIdentity { identity: String, field_path: String },

    #[error("{field_path}: rule file '{file}' is unavailable: {reason}")]
    RuleFileUnavailable {
        file: String,
        reason: String,
        field_path: String,
    },

    #[error("line {line}: {message}")]
    ManifestSyntax { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias for droidplan operations
pub type Result<T> = std::result::Result<T, PlanError>;

impl PlanError {
    /// Stable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::UnresolvedVersion { .. } => "UnresolvedVersionError",
            PlanError::ConflictingVersion { .. } => "ConflictingVersionError",
            PlanError::IncompatibleToolchain { .. } => "IncompatibleToolchainError",
            PlanError::JvmTargetMismatch { .. } => "JvmTargetMismatchError",
            PlanError::PluginOrder { .. } => "PluginOrderError",
            PlanError::DuplicatePlugin { .. } => "DuplicatePluginError",
            PlanError::InvalidManifest { .. } => "InvalidManifestError",
            PlanError::UnknownVariant(_) => "UnknownVariantError",
            PlanError::UnknownSigningIdentity { .. } => "UnknownSigningIdentityError",
            PlanError::RuleFileUnavailable { .. } => "RuleFileUnavailableError",
            PlanError::ManifestSyntax { .. } => "ManifestSyntaxError",
            PlanError::Io(_) => "IoError",
            PlanError::TomlParse(_) => "TomlParseError",
            PlanError::TomlSerialize(_) => "TomlSerializeError",
            PlanError::Json(_) => "JsonError",
            PlanError::Config(_) => "ConfigError",
            PlanError::InvalidState(_) => "InvalidStateError",
        }
    }

    /// Manifest field that caused the error, if any
    pub fn field_path(&self) -> Option<&str> {
        match self {
            PlanError::UnresolvedVersion { field_path, .. }
            | PlanError::ConflictingVersion { field_path, .. }
            | PlanError::IncompatibleToolchain { field_path, .. }
            | PlanError::JvmTargetMismatch { field_path, .. }
            | PlanError::PluginOrder { field_path, .. }
            | PlanError::DuplicatePlugin { field_path, .. }
            | PlanError::InvalidManifest { field_path, .. }
            | PlanError::UnknownSigningIdentity { field_path, .. }
            | PlanError::RuleFileUnavailable { field_path, .. } => Some(field_path),
            PlanError::UnknownVariant(_) => Some("buildTypes"),
            _ => None,
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Configuration errors need a manifest edit; retrying the same
    /// resolution always fails the same way.
    pub fn is_recoverable(&self) -> bool {
        false
    }

    /// Shorthand for an [`PlanError::InvalidManifest`]
    pub fn invalid(field_path: impl Into<String>, reason: impl Into<String>) -> Self {
        PlanError::InvalidManifest {
            reason: reason.into(),
            field_path: field_path.into(),
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PlanError::Io(e) => format!("File operation failed: {}", e),
            PlanError::ManifestSyntax { line, message } => {
                format!("Manifest syntax error on line {}: {}", line, message)
            }
            PlanError::Config(msg) => format!("Configuration error: {}", msg),
            _ => format!("{}: {}", self.kind(), self),
        }
    }
}
