use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result type for core domain operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Subsystem that raised an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDomain {
    Agent,
    Session,
    Bridge,
    Preset,
    Mcp,
    Knowledge,
    Storage,
    Core,
}

impl ErrorDomain {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Session => "session",
            Self::Bridge => "bridge",
            Self::Preset => "preset",
            Self::Mcp => "mcp",
            Self::Knowledge => "knowledge",
            Self::Storage => "storage",
            Self::Core => "core",
        }
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    Validation,
    VersionConflict,
    Conflict,
    Unavailable,
    Timeout,
    Aborted,
    Unauthorized,
    Forbidden,
    OperationFailed,
    Internal,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::Validation => "VALIDATION",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::Conflict => "CONFLICT",
            Self::Unavailable => "UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
            Self::Aborted => "ABORTED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::OperationFailed => "OPERATION_FAILED",
            Self::Internal => "INTERNAL",
        }
    }

    /// Default `(retryable, transient)` flags for this code
    #[must_use]
    pub const fn default_flags(self) -> (bool, bool) {
        match self {
            Self::VersionConflict => (true, false),
            Self::Unavailable | Self::Timeout => (true, true),
            Self::Aborted => (false, true),
            _ => (false, false),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type raised by AgentOS core code.
///
/// Values are immutable once built. Use the named constructors, which bind
/// the code and its default retry flags, then refine with [`CoreError::with_details`]
/// or [`CoreError::with_cause`].
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{domain}/{code}: {message}")]
pub struct CoreError {
    domain: ErrorDomain,
    code: ErrorCode,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    #[serde(default)]
    retryable: bool,
    #[serde(default)]
    transient: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cause: Option<String>,
}

impl CoreError {
    fn build(domain: ErrorDomain, code: ErrorCode, message: impl Into<String>) -> Self {
        let (retryable, transient) = code.default_flags();
        Self {
            domain,
            code,
            message: message.into(),
            details: None,
            retryable,
            transient,
            cause: None,
        }
    }

    pub fn not_found(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::NotFound, message)
    }

    pub fn already_exists(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::AlreadyExists, message)
    }

    pub fn invalid_argument(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::InvalidArgument, message)
    }

    pub fn validation(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::Validation, message)
    }

    /// Optimistic-concurrency rejection. Both versions are recorded in `details`.
    pub fn version_conflict(
        domain: ErrorDomain,
        message: impl Into<String>,
        expected: &str,
        actual: &str,
    ) -> Self {
        Self::build(domain, ErrorCode::VersionConflict, message).with_details(serde_json::json!({
            "expectedVersion": expected,
            "actualVersion": actual,
        }))
    }

    pub fn conflict(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::Conflict, message)
    }

    pub fn unavailable(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::Unavailable, message)
    }

    pub fn timeout(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::Timeout, message)
    }

    pub fn aborted(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::Aborted, message)
    }

    pub fn unauthorized(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::Forbidden, message)
    }

    pub fn operation_failed(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::OperationFailed, message)
    }

    pub fn internal(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self::build(domain, ErrorCode::Internal, message)
    }

    /// Attach structured context. Object details are merged key by key.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = match (self.details.take(), details) {
            (Some(Value::Object(mut current)), Value::Object(extra)) => {
                current.extend(extra);
                Some(Value::Object(current))
            }
            (_, details) => Some(details),
        };
        self
    }

    /// Record the underlying error's message
    #[must_use]
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    #[must_use]
    pub const fn domain(&self) -> ErrorDomain {
        self.domain
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    #[must_use]
    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    #[must_use]
    pub const fn transient(&self) -> bool {
        self.transient
    }

    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    #[must_use]
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }

    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            code: self.code.as_str().to_string(),
            domain: self.domain.as_str().to_string(),
            message: self.message.clone(),
            details: self.details.clone(),
            retryable: self.retryable,
            transient: self.transient,
        }
    }
}

/// Wire shape of a [`CoreError`] for outer surfaces (IPC, CLI output)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorEnvelope {
    pub code: String,
    pub domain: String,
    pub message: String,
    pub details: Option<Value>,
    pub retryable: bool,
    pub transient: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn factories_bind_default_flags() {
        let nf = CoreError::not_found(ErrorDomain::Agent, "missing");
        assert_eq!(nf.code(), ErrorCode::NotFound);
        assert!(!nf.retryable());
        assert!(!nf.transient());

        let unavailable = CoreError::unavailable(ErrorDomain::Bridge, "offline");
        assert!(unavailable.retryable());
        assert!(unavailable.transient());

        let timeout = CoreError::timeout(ErrorDomain::Mcp, "slow");
        assert!(timeout.retryable());
        assert!(timeout.transient());

        let aborted = CoreError::aborted(ErrorDomain::Session, "cancelled");
        assert!(!aborted.retryable());
        assert!(aborted.transient());

        let validation = CoreError::validation(ErrorDomain::Preset, "bad");
        assert!(!validation.retryable());
    }

    #[test]
    fn version_conflict_carries_both_versions() {
        let err = CoreError::version_conflict(ErrorDomain::Agent, "stale", "1", "2");
        assert_eq!(err.code(), ErrorCode::VersionConflict);
        assert!(err.retryable());
        assert_eq!(
            err.details(),
            Some(&json!({"expectedVersion": "1", "actualVersion": "2"}))
        );
    }

    #[test]
    fn with_details_merges_objects() {
        let err = CoreError::version_conflict(ErrorDomain::Agent, "stale", "1", "2")
            .with_details(json!({"id": "a"}));
        let details = err.details().expect("details");
        assert_eq!(details["id"], "a");
        assert_eq!(details["expectedVersion"], "1");
    }

    #[test]
    fn display_includes_domain_and_code() {
        let err = CoreError::internal(ErrorDomain::Storage, "disk full");
        assert_eq!(err.to_string(), "storage/INTERNAL: disk full");
    }

    #[test]
    fn serde_roundtrip_preserves_flags() {
        let err = CoreError::timeout(ErrorDomain::Bridge, "no reply").with_cause("socket closed");
        let raw = serde_json::to_value(&err).unwrap();
        assert_eq!(raw["code"], "TIMEOUT");
        assert_eq!(raw["domain"], "bridge");
        let back: CoreError = serde_json::from_value(raw).unwrap();
        assert_eq!(back, err);
        assert_eq!(back.cause(), Some("socket closed"));
    }

    #[test]
    fn envelope_mirrors_error() {
        let env = CoreError::forbidden(ErrorDomain::Core, "nope").to_envelope();
        assert_eq!(env.code, "FORBIDDEN");
        assert_eq!(env.domain, "core");
        assert!(!env.retryable);
    }
}
