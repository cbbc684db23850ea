//! Error handling for the tenancy layer.
//!
//! Every failure raised while rewriting a payload aborts the current request
//! transformation and is handed back to the dispatcher, which turns it into a
//! client-visible HTTP error through the `IntoResponse` implementation below.
//! Nothing here is fatal to the process.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for tenancy operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Error type produced by role/group lookup strategies.
pub type LookupError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Kinds
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error kinds, stable for programmatic handling by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    MissingHeader,
    ReservedTenantId,
    NamingViolation,
    TenantMismatch,
    DisallowedTaskType,
    TaskTreeTooDeep,
    UnrecognizedPayloadShape,
    InvalidPath,
    AccessDenied,
    LookupFailed,
}

impl ErrorKind {
    /// Stable code used in response bodies and metric labels.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingHeader => "MISSING_HEADER",
            Self::ReservedTenantId => "RESERVED_TENANT_ID",
            Self::NamingViolation => "NAMING_VIOLATION",
            Self::TenantMismatch => "TENANT_MISMATCH",
            Self::DisallowedTaskType => "DISALLOWED_TASK_TYPE",
            Self::TaskTreeTooDeep => "TASK_TREE_TOO_DEEP",
            Self::UnrecognizedPayloadShape => "UNRECOGNIZED_PAYLOAD_SHAPE",
            Self::InvalidPath => "INVALID_PATH",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::LookupFailed => "LOOKUP_FAILED",
        }
    }

    /// HTTP status the dispatcher should answer with.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::MissingHeader | Self::ReservedTenantId | Self::NamingViolation => {
                StatusCode::BAD_REQUEST
            }

            // Foreign objects are reported as forbidden, never as not found.
            Self::TenantMismatch | Self::AccessDenied => StatusCode::FORBIDDEN,

            Self::DisallowedTaskType
            | Self::TaskTreeTooDeep
            | Self::UnrecognizedPayloadShape => StatusCode::UNPROCESSABLE_ENTITY,

            Self::LookupFailed => StatusCode::BAD_GATEWAY,

            Self::InvalidPath => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors raised by the codec, the validator, the access gate and the
/// transformers.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Required header '{header}' not found")]
    MissingHeader { header: &'static str },

    #[error("Illegal tenant id: '{tenant_id}'")]
    ReservedTenantId { tenant_id: String },

    #[error("Value must not contain '{separator}': '{value}'")]
    NamingViolation {
        value: String,
        separator: &'static str,
    },

    #[error("Value at '{path}' must start with prefix of tenant '{tenant_id}': '{value}'")]
    TenantMismatch {
        tenant_id: String,
        path: String,
        value: String,
    },

    #[error("Task type is not allowed: type='{task_type}', name='{name}'")]
    DisallowedTaskType { task_type: String, name: String },

    #[error("Task tree exceeds maximum nesting depth of {max_depth}")]
    TaskTreeTooDeep { max_depth: usize },

    #[error("Unrecognized payload shape: {0}")]
    UnrecognizedPayloadShape(String),

    #[error("Invalid JSON path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("{0}")]
    Lookup(#[source] LookupError),
}

impl ProxyError {
    pub fn unrecognized(message: impl Into<String>) -> Self {
        Self::UnrecognizedPayloadShape(message.into())
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied(message.into())
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingHeader { .. } => ErrorKind::MissingHeader,
            Self::ReservedTenantId { .. } => ErrorKind::ReservedTenantId,
            Self::NamingViolation { .. } => ErrorKind::NamingViolation,
            Self::TenantMismatch { .. } => ErrorKind::TenantMismatch,
            Self::DisallowedTaskType { .. } => ErrorKind::DisallowedTaskType,
            Self::TaskTreeTooDeep { .. } => ErrorKind::TaskTreeTooDeep,
            Self::UnrecognizedPayloadShape(_) => ErrorKind::UnrecognizedPayloadShape,
            Self::InvalidPath { .. } => ErrorKind::InvalidPath,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::Lookup(_) => ErrorKind::LookupFailed,
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        self.kind().http_status()
    }

    /// Message safe to expose to clients.
    ///
    /// Tenant mismatches do not echo the foreign value.
    pub fn user_message(&self) -> String {
        match self {
            Self::TenantMismatch { .. } => "Name must start with tenantId prefix".to_string(),
            Self::Lookup(_) => "Identity lookup failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::UnrecognizedPayloadShape(err.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Integration
// ═══════════════════════════════════════════════════════════════════════════════

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = kind.http_status();

        if status.is_server_error() {
            tracing::error!(error = %self, code = kind.code(), "Request transformation failed");
        } else {
            tracing::warn!(error = %self, code = kind.code(), "Request rejected");
        }

        counter!("proxy_errors_total", "kind" => kind.code()).increment(1);

        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": kind.code(),
                "message": self.user_message(),
            }
        });

        (status, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
