use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Bug severity. Declaration order is the display/sort order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Sort rank: Critical = 0 through Low = 3.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Severity {
    type Err = Error;

    /// Case-insensitive; accepts the full label or its first letter.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" | "c" => Ok(Severity::Critical),
            "high" | "h" => Ok(Severity::High),
            "medium" | "m" => Ok(Severity::Medium),
            "low" | "l" => Ok(Severity::Low),
            other => Err(Error::Validation(format!(
                "unknown severity: {other} (expected: critical, high, medium, low)"
            ))),
        }
    }
}
