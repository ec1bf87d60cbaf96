// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session error types with a consistent projection for the UI.

use reqwest::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Client error type covering the whole session lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password: {0}")]
    InvalidCredentials(String),

    #[error("Validation failed for {} field(s)", .0.len())]
    ValidationFailed(FieldErrors),

    #[error("Session expired")]
    SessionExpired,

    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Network or server error: {0}")]
    NetworkOrServer(String),

    /// Non-success response that no recovery path handled.
    #[error("HTTP {status}: {body}")]
    Http {
        status: StatusCode,
        body: serde_json::Value,
    },

    #[error("Token storage error: {0}")]
    Storage(String),

    /// A newer session operation started before this one finished.
    #[error("Superseded by a newer session operation")]
    Superseded,

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Serializable error shape stored in `SessionState.error` for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message { code: String, message: String },
    Fields { code: String, fields: FieldErrors },
}

impl ErrorDetail {
    /// Field-level messages, if this is a validation error.
    pub fn fields(&self) -> Option<&FieldErrors> {
        match self {
            ErrorDetail::Fields { fields, .. } => Some(fields),
            ErrorDetail::Message { .. } => None,
        }
    }
}

impl AuthError {
    /// Project this error into the shape the UI renders.
    pub fn detail(&self) -> ErrorDetail {
        let code = match self {
            AuthError::InvalidCredentials(_) => "invalid_credentials",
            AuthError::ValidationFailed(_) => "validation_failed",
            AuthError::SessionExpired => "session_expired",
            AuthError::NotAuthenticated => "not_authenticated",
            AuthError::NetworkOrServer(_) => "network_error",
            AuthError::Http { .. } => "request_failed",
            AuthError::Storage(_) => "storage_error",
            AuthError::Superseded => "superseded",
            AuthError::Config(_) => "config_error",
            AuthError::Internal(_) => "internal_error",
        };

        match self {
            AuthError::ValidationFailed(fields) => ErrorDetail::Fields {
                code: code.to_string(),
                fields: fields.clone(),
            },
            AuthError::InvalidCredentials(msg) => ErrorDetail::Message {
                code: code.to_string(),
                message: msg.clone(),
            },
            other => ErrorDetail::Message {
                code: code.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Transport failures and 5xx responses; the user may simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::NetworkOrServer(_))
    }

    /// Errors that mean the caller no longer has a usable session.
    pub fn is_session_error(&self) -> bool {
        match self {
            AuthError::SessionExpired | AuthError::NotAuthenticated => true,
            AuthError::Http { status, .. } => *status == StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }

    /// Turn a 400 carrying a field map into `ValidationFailed`.
    pub(crate) fn field_level(self) -> Self {
        match self {
            AuthError::Http { status, body } if status == StatusCode::BAD_REQUEST => {
                match parse_field_errors(&body) {
                    Some(fields) => AuthError::ValidationFailed(fields),
                    None => AuthError::Http { status, body },
                }
            }
            other => other,
        }
    }

    /// Build a single-field validation error.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name.to_string(), vec![message.into()]);
        AuthError::ValidationFailed(fields)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::NetworkOrServer(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        AuthError::ValidationFailed(fields)
    }
}

/// Parse a DRF-style error body into per-field messages.
///
/// Accepts `{"field": ["msg", ...]}` and `{"field": "msg"}`. Returns `None`
/// when the body carries no field entries (e.g. a bare `{"detail": ...}`).
pub fn parse_field_errors(body: &serde_json::Value) -> Option<FieldErrors> {
    let map = body.as_object()?;
    let mut fields = FieldErrors::new();

    for (name, value) in map {
        if name == "detail" {
            continue;
        }
        let messages: Vec<String> = match value {
            serde_json::Value::String(s) => vec![s.clone()],
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            other => vec![other.to_string()],
        };
        fields.insert(name.clone(), messages);
    }

    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

/// Extract a human-readable message (`detail`) from an error body.
pub fn detail_message(body: &serde_json::Value) -> Option<String> {
    match body {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("detail")
            .and_then(|d| d.as_str())
            .map(str::to_string),
        _ => None,
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, AuthError>;
