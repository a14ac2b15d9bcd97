//! Run status classification.
//!
//! A run's `status` is a free-form string from the backend. Its severity is
//! derived here and never stored. Precedence: exact `success`, then
//! `error`/`timeout` anywhere in the string, then an HTTP status family
//! (`4xx`/`5xx`), then neutral. Error outranks the HTTP family, so
//! `http_5xx_error` is an error.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Success,
    Error,
    Warning,
    Neutral,
}

impl StatusClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Success => "success",
            StatusClass::Error => "error",
            StatusClass::Warning => "warning",
            StatusClass::Neutral => "default",
        }
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a raw status string, case-insensitively.
pub fn classify(status: &str) -> StatusClass {
    let status = status.to_lowercase();
    if status == "success" {
        StatusClass::Success
    } else if status.contains("error") || status.contains("timeout") {
        StatusClass::Error
    } else if status.contains("4xx") || status.contains("5xx") {
        StatusClass::Warning
    } else {
        StatusClass::Neutral
    }
}

/// Classify a status that may be missing.
pub fn classify_opt(status: Option<&str>) -> StatusClass {
    status.map(classify).unwrap_or(StatusClass::Neutral)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_statuses() {
        assert_eq!(classify("success"), StatusClass::Success);
        assert_eq!(classify("timeout"), StatusClass::Error);
        assert_eq!(classify("dns_error"), StatusClass::Error);
        assert_eq!(classify("connection_error"), StatusClass::Error);
        assert_eq!(classify("error"), StatusClass::Error);
        assert_eq!(classify("http_4xx"), StatusClass::Warning);
        assert_eq!(classify("http_5xx"), StatusClass::Warning);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("SUCCESS"), StatusClass::Success);
        assert_eq!(classify("Http_5XX"), StatusClass::Warning);
        assert_eq!(classify("Connection_Error"), StatusClass::Error);
    }

    #[test]
    fn test_error_outranks_http_family() {
        for status in ["http_5xx_error", "4xx timeout", "ERROR_4XX", "5xx-timeout-4xx"] {
            assert_eq!(classify(status), StatusClass::Error, "{status}");
        }
    }

    #[test]
    fn test_success_must_be_exact() {
        assert_eq!(classify("partial_success"), StatusClass::Neutral);
        assert_eq!(classify("success_error"), StatusClass::Error);
    }

    #[test]
    fn test_unknown_and_missing_are_neutral() {
        assert_eq!(classify(""), StatusClass::Neutral);
        assert_eq!(classify("pending"), StatusClass::Neutral);
        assert_eq!(classify_opt(None), StatusClass::Neutral);
        assert_eq!(StatusClass::Neutral.as_str(), "default");
    }
}
