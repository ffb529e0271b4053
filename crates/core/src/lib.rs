//! droidplan Core - shared types
//!
//! This crate provides what every stage of build-plan resolution shares:
//! error and warning types, the per-invocation resolution context,
//! resolver configuration and the event bus.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod warning;

pub use config::{BatchConfig, CompilerProfile, ResolverConfig, RulesConfig, ToolchainConfig};
pub use context::{ResolutionContext, ResolutionState};
pub use error::{PlanError, Result};
pub use events::{EventBus, EventSubscription, ResolutionEvent};
pub use warning::Warning;

/// droidplan version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "droidplan";
