//! droidplan - build-variant resolver for Flutter/Android app manifests
//!
//! Turns a declarative app manifest (a `droidplan.toml` document or a
//! module's `build.gradle.kts`) and a requested build variant into an
//! artifact descriptor and a deterministic build plan.
//!
//! ## Architecture
//!
//! - `droidplan-core`: errors, warnings, resolution context, configuration
//! - `droidplan-manifest`: manifest model, Gradle Kotlin DSL and TOML readers/writers
//! - `droidplan-android-toolchain`: Java levels, API levels, NDK versions, compiler compatibility
//! - `droidplan-engine`: dependency, signing, rule and plugin resolution, plan emission

#![warn(clippy::all)]

pub mod commands;
pub mod project;

// Re-export main components for library usage
pub use droidplan_android_toolchain as toolchain;
pub use droidplan_core as core;
pub use droidplan_engine as engine;
pub use droidplan_manifest as manifest;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::project::{Project, ProjectKind};
    pub use droidplan_core::{PlanError, ResolverConfig, Warning};
    pub use droidplan_engine::{ArtifactDescriptor, BuildPlan, Resolution, Resolver};
    pub use droidplan_manifest::{Manifest, ManifestParser, ManifestWriter};
}
