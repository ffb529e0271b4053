//! NDK Version
//!
//! `ndkVersion` must name a full side-by-side NDK release
//! (`major.minor.build`, e.g. "27.0.12077973").

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use droidplan_core::{PlanError, Result};

static NDK_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-(?:beta|rc)\d+)?$").unwrap());

/// Oldest NDK major the Android Gradle plugin still accepts
pub const MIN_NDK_MAJOR: u32 = 21;

/// NDK version errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NdkError {
    #[error("'{0}' is not major.minor.build")]
    Malformed(String),
    #[error("NDK r{0} is no longer supported")]
    Unsupported(u32),
}

/// Parsed NDK release
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct NdkVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u64,
}

impl NdkVersion {
    /// Release name as published ("r27", "r25c"); minors past `z` fall
    /// back to the numeric form
    pub fn release_name(&self) -> String {
        // r25c is 25.2.x
        let letter = match self.minor {
            0 => return format!("r{}", self.major),
            n if n < 26 => char::from_u32(u32::from(b'a') + n),
            _ => None,
        };
        match letter {
            Some(letter) => format!("r{}{}", self.major, letter),
            None => format!("r{}.{}", self.major, self.minor),
        }
    }

    /// Parse and check the manifest's `ndkVersion`
    pub fn check(raw: &str) -> Result<Self> {
        raw.parse::<NdkVersion>()
            .map_err(|e| PlanError::invalid("android.ndkVersion", e.to_string()))
    }
}

impl FromStr for NdkVersion {
    type Err = NdkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let caps = NDK_VERSION
            .captures(s.trim())
            .ok_or_else(|| NdkError::Malformed(s.to_string()))?;
        let num = |i: usize| caps[i].parse::<u64>().map_err(|_| NdkError::Malformed(s.to_string()));
        let version = Self {
            major: num(1)? as u32,
            minor: num(2)? as u32,
            build: num(3)?,
        };
        if version.major < MIN_NDK_MAJOR {
            return Err(NdkError::Unsupported(version.major));
        }
        Ok(version)
    }
}

impl fmt::Display for NdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}
