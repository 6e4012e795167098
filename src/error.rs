//! Structured error types for task workflow operations.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Caught before anything is sent
    ValidationFailed,
    UserIdentityMissing,
    PermissionDenied,
    InvalidTransition,
    InvalidState,
    Cancelled,

    // Not found errors
    TaskNotFound,
    CommentNotFound,
    AttachmentNotFound,

    // Remote errors
    RemoteRejected,
    PartialUpload,
    Transport,

    InternalError,
}

/// Field keys inspected, in order, when the remote store rejects a request.
pub const REMOTE_ERROR_FIELDS: &[&str] = &["title", "description", "assignee", "user"];

/// Message used when a rejection carries nothing recognisable.
pub const GENERIC_REMOTE_MESSAGE: &str = "The request could not be completed";

/// Per-field validation messages, keyed by form field name.
pub type FormErrors = BTreeMap<String, String>;

/// Structured error returned by every workflow operation.
#[derive(Debug, Error, Serialize)]
#[error("{message}")]
pub struct WorkflowError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "FormErrors::is_empty")]
    pub fields: FormErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl WorkflowError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
            fields: FormErrors::new(),
            status: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    // Convenience constructors

    /// Validation failure for a whole form. The message is the first field error.
    pub fn validation(fields: FormErrors) -> Self {
        let message = fields
            .values()
            .next()
            .cloned()
            .unwrap_or_else(|| "Validation failed".to_string());
        let mut err = Self::new(ErrorCode::ValidationFailed, message);
        err.field = fields.keys().next().cloned();
        err.fields = fields;
        err
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        let mut fields = FormErrors::new();
        fields.insert(field.to_string(), reason.to_string());
        Self::validation(fields)
    }

    pub fn user_identity_missing(operation: &str) -> Self {
        Self::new(
            ErrorCode::UserIdentityMissing,
            "UserIdentityMissing: could not resolve the current user",
        )
        .with_details(operation)
    }

    pub fn permission_denied(action: &str) -> Self {
        Self::new(
            ErrorCode::PermissionDenied,
            format!("You do not have permission to {}", action),
        )
    }

    pub fn invalid_transition(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransition, reason)
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, reason)
    }

    pub fn cancelled(action: &str) -> Self {
        Self::new(ErrorCode::Cancelled, format!("{} cancelled", action))
    }

    pub fn task_not_found(task_id: i64) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn comment_not_found(comment_id: i64) -> Self {
        Self::new(
            ErrorCode::CommentNotFound,
            format!("Comment not found: {}", comment_id),
        )
    }

    pub fn attachment_not_found(attachment_id: i64) -> Self {
        Self::new(
            ErrorCode::AttachmentNotFound,
            format!("Attachment not found: {}", attachment_id),
        )
    }

    /// Build a rejection from the body the remote store returned.
    pub fn remote_rejected(status: u16, body: &Value) -> Self {
        let (field, message) = remote_error_message(body);
        let mut err = Self::new(ErrorCode::RemoteRejected, message).with_status(status);
        err.field = field;
        err
    }

    pub fn partial_upload(failed: &[String], total: usize) -> Self {
        Self::new(
            ErrorCode::PartialUpload,
            format!("{} files failed", failed.len()),
        )
        .with_details(format!(
            "{} of {} uploads failed: {}",
            failed.len(),
            total,
            failed.join(", ")
        ))
    }

    pub fn transport(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::Transport, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let mut out = WorkflowError::transport(&err);
        out.status = status;
        out
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::transport(format!("invalid response body: {}", err))
    }
}

/// Pick the user-facing message out of a field-keyed error payload.
///
/// Known fields win in `REMOTE_ERROR_FIELDS` order, then `detail` and
/// `non_field_errors`, then the generic message.
pub fn remote_error_message(body: &Value) -> (Option<String>, String) {
    for field in REMOTE_ERROR_FIELDS {
        if let Some(msg) = body.get(*field).and_then(first_message) {
            return (Some(field.to_string()), msg);
        }
    }
    for key in ["detail", "non_field_errors", "error", "message"] {
        if let Some(msg) = body.get(key).and_then(first_message) {
            return (None, msg);
        }
    }
    if let Some(msg) = first_message(body) {
        return (None, msg);
    }
    (None, GENERIC_REMOTE_MESSAGE.to_string())
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_message),
        _ => None,
    }
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_error_prefers_known_fields_in_order() {
        let body = json!({
            "user": ["User is inactive."],
            "description": ["This field may not be blank."],
        });
        let (field, msg) = remote_error_message(&body);
        assert_eq!(field.as_deref(), Some("description"));
        assert_eq!(msg, "This field may not be blank.");
    }

    #[test]
    fn test_remote_error_falls_back_to_detail() {
        let body = json!({"detail": "Not found."});
        assert_eq!(remote_error_message(&body), (None, "Not found.".to_string()));
    }

    #[test]
    fn test_remote_error_generic_fallback() {
        let body = json!({"priority": 3});
        let (_, msg) = remote_error_message(&body);
        assert_eq!(msg, GENERIC_REMOTE_MESSAGE);

        let (_, msg) = remote_error_message(&Value::Null);
        assert_eq!(msg, GENERIC_REMOTE_MESSAGE);
    }

    #[test]
    fn test_partial_upload_message() {
        let err = WorkflowError::partial_upload(&["a.pdf".into(), "b.png".into()], 3);
        assert_eq!(err.to_string(), "2 files failed");
        assert!(err.details.unwrap().contains("2 of 3"));
    }

    #[test]
    fn test_validation_uses_first_field() {
        let mut fields = FormErrors::new();
        fields.insert("title".into(), "Title is required".into());
        let err = WorkflowError::validation(fields);
        assert!(err.is(ErrorCode::ValidationFailed));
        assert_eq!(err.field.as_deref(), Some("title"));

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("VALIDATION_FAILED"));
    }
}
