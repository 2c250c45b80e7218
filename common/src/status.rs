use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn marker(self) -> &'static str {
        match self {
            Self::Success => "✅",
            Self::Warning => "⚠️",
            Self::Error => "❌",
        }
    }
}

/// Short, user-facing outcome of an operation. The `message` always starts with
/// the severity marker so it can be rendered as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub severity: Severity,
    pub message: String,
}

impl StatusMessage {
    pub fn new(severity: Severity, text: impl AsRef<str>) -> Self {
        Self {
            severity,
            message: format!("{} {}", severity.marker(), text.as_ref()),
        }
    }

    pub fn success(text: impl AsRef<str>) -> Self {
        Self::new(Severity::Success, text)
    }

    pub fn warning(text: impl AsRef<str>) -> Self {
        Self::new(Severity::Warning, text)
    }

    pub fn error(text: impl AsRef<str>) -> Self {
        Self::new(Severity::Error, text)
    }

    pub fn is_success(&self) -> bool {
        self.severity == Severity::Success
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
