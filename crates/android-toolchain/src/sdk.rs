//! Android Platform Levels
//!
//! Supported API range and the Java library level each API level ships
//! without core library desugaring.

use tracing::debug;

use droidplan_core::{PlanError, Result};
use droidplan_manifest::Manifest;

use crate::java_version::JavaLevel;

/// Lowest minSdk the resolver accepts (Flutter's own floor)
pub const MIN_SUPPORTED_API: u32 = 21;

/// Highest compileSdk the resolver knows about
pub const MAX_SUPPORTED_API: u32 = 35;

/// Supported Android API levels
pub const SUPPORTED_API_LEVELS: std::ops::RangeInclusive<u32> = MIN_SUPPORTED_API..=MAX_SUPPORTED_API;

/// Java level whose library APIs are present on `min_sdk` devices
pub fn native_language_level(min_sdk: u32) -> JavaLevel {
    match min_sdk {
        0..=23 => JavaLevel::JAVA_7,
        24..=32 => JavaLevel::JAVA_8,
        33 => JavaLevel::JAVA_11,
        _ => JavaLevel::JAVA_17,
    }
}

/// Lowest API level whose runtime ships the `level` library APIs
pub fn required_api_level(level: JavaLevel) -> u32 {
    match level.value() {
        0..=7 => MIN_SUPPORTED_API,
        8 => 24,
        9..=11 => 33,
        _ => 34,
    }
}

/// Check every API level the manifest names against the supported range
pub fn check_api_levels(manifest: &Manifest) -> Result<()> {
    let levels = [
        ("android.defaultConfig.minSdk", manifest.min_platform_version),
        ("android.defaultConfig.targetSdk", manifest.target_platform_version),
        ("android.compileSdk", manifest.effective_compile_version()),
    ];
    for (field, level) in levels {
        if !SUPPORTED_API_LEVELS.contains(&level) {
            return Err(PlanError::invalid(
                field,
                format!(
                    "API level {} is outside the supported range {}..={}",
                    level, MIN_SUPPORTED_API, MAX_SUPPORTED_API
                ),
            ));
        }
    }
    debug!(
        "API levels ok: min {} target {} compile {}",
        manifest.min_platform_version,
        manifest.target_platform_version,
        manifest.effective_compile_version()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_levels() {
        assert_eq!(native_language_level(23), JavaLevel::JAVA_7);
        assert_eq!(native_language_level(24), JavaLevel::JAVA_8);
        assert_eq!(native_language_level(33), JavaLevel::JAVA_11);
        assert_eq!(native_language_level(35), JavaLevel::JAVA_17);
        assert_eq!(required_api_level(JavaLevel::JAVA_11), 33);
    }

    #[test]
    fn test_check_api_levels() {
        let mut manifest = Manifest::new("com.example.neoflex", 23, 33);
        manifest.compile_toolchain_version = Some(35);
        assert!(check_api_levels(&manifest).is_ok());

        manifest.min_platform_version = 19;
        let err = check_api_levels(&manifest).unwrap_err();
        assert_eq!(err.field_path(), Some("android.defaultConfig.minSdk"));

        manifest.min_platform_version = 23;
        manifest.compile_toolchain_version = Some(40);
        let err = check_api_levels(&manifest).unwrap_err();
        assert_eq!(err.field_path(), Some("android.compileSdk"));
    }
}
