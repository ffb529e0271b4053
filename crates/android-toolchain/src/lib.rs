//! Android Toolchain Rules
//!
//! Knowledge about the compilers and platform a build plan targets:
//! - Java language levels
//! - Android API levels
//! - NDK versions
//! - javac/kotlinc compatibility

pub mod compat;
pub mod java_version;
pub mod ndk;
pub mod sdk;

pub use compat::{CompilerInvocation, ToolchainCompatibility};
pub use java_version::{JavaLevel, LevelError};
pub use ndk::{NdkError, NdkVersion};
pub use sdk::{
    check_api_levels, native_language_level, required_api_level, MAX_SUPPORTED_API,
    MIN_SUPPORTED_API, SUPPORTED_API_LEVELS,
};
