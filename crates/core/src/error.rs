//! Domain error model.

use thiserror::Error;

use crate::id::LineId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. None of these are
/// retryable: every computation is a pure function of its inputs, so retry policy
/// (if any) belongs to the transactional caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing or ambiguous tax/pricing/catalog configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A business policy forbids the operation (discount ceiling, merge rules).
    ///
    /// `lines` lists the offending order lines when the policy is line-scoped.
    #[error("policy violation: {reason}")]
    PolicyViolation { reason: String, lines: Vec<LineId> },

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn policy(reason: impl Into<String>) -> Self {
        Self::PolicyViolation {
            reason: reason.into(),
            lines: Vec::new(),
        }
    }

    pub fn policy_on_lines(reason: impl Into<String>, lines: Vec<LineId>) -> Self {
        Self::PolicyViolation {
            reason: reason.into(),
            lines,
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
