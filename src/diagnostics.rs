//! Non-fatal findings reported alongside successful results.

use std::fmt;

use serde::Serialize;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Machine-readable code (e.g. "pmug::animate::collapsed-frames").
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a warning diagnostic.
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.into(),
            message: message.into(),
            help: None,
        }
    }

    /// Create an informational diagnostic.
    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            code: code.into(),
            message: message.into(),
            help: None,
        }
    }

    /// Add help text to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Emit this diagnostic as a log event.
    pub fn log(&self) {
        match self.severity {
            Severity::Info => tracing::info!(code = %self.code, "{}", self.message),
            Severity::Warning => tracing::warn!(code = %self.code, "{}", self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::warning("pmug::test", "frames collapsed");
        assert_eq!(d.to_string(), "warning[pmug::test]: frames collapsed");
    }

    #[test]
    fn test_with_help() {
        let d = Diagnostic::info("pmug::test", "note").with_help("try a shared palette");
        assert_eq!(d.help.as_deref(), Some("try a shared palette"));
    }

    #[test]
    fn test_serialize_skips_missing_help() {
        let json = serde_json::to_value(Diagnostic::warning("pmug::x", "m")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"severity": "warning", "code": "pmug::x", "message": "m"})
        );
    }
}
