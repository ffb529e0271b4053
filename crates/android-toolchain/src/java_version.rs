//! Java Language Levels
//!
//! Parses the spellings build scripts use for a Java level ("1.8",
//! "VERSION_1_8", "JavaVersion.VERSION_17", "JVM_11", "21") into one
//! comparable value.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

static LEVEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:JavaVersion|JvmTarget)\.)?(?:VERSION_|JVM_)?(1[._])?(\d{1,2})$").unwrap()
});

/// Java level errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    #[error("unrecognised Java version '{0}'")]
    Unrecognised(String),
    #[error("Java version '{0}' is older than Java 6")]
    TooOld(String),
}

/// Java language level, e.g. 8 for "1.8"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JavaLevel(u32);

impl JavaLevel {
    pub const JAVA_7: JavaLevel = JavaLevel(7);
    pub const JAVA_8: JavaLevel = JavaLevel(8);
    pub const JAVA_11: JavaLevel = JavaLevel(11);
    pub const JAVA_17: JavaLevel = JavaLevel(17);

    pub fn new(level: u32) -> Self {
        Self(level)
    }

    pub fn parse(raw: &str) -> Result<Self, LevelError> {
        let trimmed = raw.trim();
        let captures = LEVEL
            .captures(trimmed)
            .ok_or_else(|| LevelError::Unrecognised(raw.to_string()))?;
        let level: u32 = captures[2]
            .parse()
            .map_err(|_| LevelError::Unrecognised(raw.to_string()))?;
        // only 1.x for x <= 8 uses the legacy spelling
        if captures.get(1).is_some() && level > 8 {
            return Err(LevelError::Unrecognised(raw.to_string()));
        }
        if level < 6 {
            return Err(LevelError::TooOld(raw.to_string()));
        }
        Ok(Self(level))
    }

    /// Numeric feature level
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Spelling javac and kotlinc accept ("1.8", "11")
    pub fn compiler_flag(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for JavaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 <= 8 {
            write!(f, "1.{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serialize for JavaLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spellings_of_java_8() {
        for raw in ["1.8", "8", "VERSION_1_8", "JavaVersion.VERSION_1_8", "JVM_1_8", "JvmTarget.JVM_1_8"] {
            assert_eq!(JavaLevel::parse(raw), Ok(JavaLevel::JAVA_8), "{}", raw);
        }
    }

    #[test]
    fn test_modern_levels() {
        assert_eq!(JavaLevel::parse("11").unwrap(), JavaLevel::JAVA_11);
        assert_eq!(JavaLevel::parse("JavaVersion.VERSION_17").unwrap().value(), 17);
        assert_eq!(JavaLevel::parse("JVM_21").unwrap().to_string(), "21");
        assert_eq!(JavaLevel::JAVA_8.to_string(), "1.8");
    }

    #[test]
    fn test_rejects_nonsense() {
        assert!(matches!(JavaLevel::parse("1.11"), Err(LevelError::Unrecognised(_))));
        assert!(matches!(JavaLevel::parse("eleven"), Err(LevelError::Unrecognised(_))));
        assert!(matches!(JavaLevel::parse("1.4"), Err(LevelError::TooOld(_))));
    }
}
