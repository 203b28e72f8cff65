//! Backend JSON envelopes.
//!
//! Successful responses wrap their payload as `{"data": ...}`. Failures
//! carry `{"error": ...}` where the error is either a plain message or a
//! validation report `{"issues": [{"message", "path"}]}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fallback shown when the backend gave nothing readable.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong, please try again.";

/// Fallback for a structured error that carries no issues.
const STRUCTURED_ERROR_FALLBACK: &str = "An error occurred. Please try again.";

/// Key used in field errors for messages not tied to one field.
pub const GLOBAL_FIELD: &str = "global";

/// Success envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    /// The payload.
    pub data: T,
}

/// One validation issue reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Human-readable description.
    pub message: String,
    /// Path of the offending field; segments may be names or indices.
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
}

impl Issue {
    fn path_segments(&self) -> impl Iterator<Item = String> + '_ {
        self.path.iter().map(|segment| match segment {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// The `error` member of a failure envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiErrorDetail {
    /// A plain message.
    Message(String),
    /// A validation report.
    Issues {
        /// Reported issues.
        issues: Vec<Issue>,
    },
    /// Any other structure.
    Other(serde_json::Value),
}

/// Failure envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Error description, absent when the body was unreadable.
    #[serde(default)]
    pub error: Option<ApiErrorDetail>,
}

impl ApiErrorBody {
    /// Creates a failure envelope carrying a plain message.
    #[must_use]
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            error: Some(ApiErrorDetail::Message(message.into())),
        }
    }

    /// Renders the error as one human-readable line.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.error {
            Some(ApiErrorDetail::Issues { issues }) if !issues.is_empty() => issues
                .iter()
                .map(|issue| {
                    let fields: Vec<String> = issue.path_segments().collect();
                    format!("Error: {} (Field: {})", issue.message, fields.join(", "))
                })
                .collect::<Vec<_>>()
                .join(", "),
            Some(ApiErrorDetail::Message(message)) if !message.trim().is_empty() => {
                message.clone()
            }
            Some(ApiErrorDetail::Issues { .. } | ApiErrorDetail::Other(_)) => {
                STRUCTURED_ERROR_FALLBACK.to_string()
            }
            Some(ApiErrorDetail::Message(_)) | None => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// Maps each issue's top-level field to its message, for form display.
    ///
    /// Errors not tied to a field are reported under [`GLOBAL_FIELD`].
    #[must_use]
    pub fn field_errors(&self) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();
        match &self.error {
            Some(ApiErrorDetail::Issues { issues }) if !issues.is_empty() => {
                for issue in issues {
                    let field = issue
                        .path_segments()
                        .next()
                        .unwrap_or_else(|| GLOBAL_FIELD.to_string());
                    errors.insert(field, issue.message.clone());
                }
            }
            _ => {
                errors.insert(GLOBAL_FIELD.to_string(), self.message());
            }
        }
        errors
    }
}
