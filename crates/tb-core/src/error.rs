//! Core error types for Taskboard RS
//!
//! One taxonomy for the whole system: validation, precondition/state,
//! authorization, not-found, and store/transport failures. Every action
//! boundary translates a `TbError` into a response; nothing below the
//! boundary swallows one.

use thiserror::Error;

use crate::traits::Id;

/// Core error type for all Taskboard operations
#[derive(Error, Debug)]
pub enum TbError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Action attempted on an entity not in the required state.
    ///
    /// `offending_ids` carries the sub-entities blocking the transition
    /// (e.g. unfinished subtask ids when a card cannot move to review).
    #[error("Precondition failed: {message}")]
    Precondition {
        message: String,
        offending_ids: Vec<Id>,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TbError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        TbError::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        TbError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        TbError::Forbidden {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        TbError::Validation {
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        TbError::Precondition {
            message: message.into(),
            offending_ids: Vec::new(),
        }
    }

    pub fn precondition_with_ids(message: impl Into<String>, offending_ids: Vec<Id>) -> Self {
        TbError::Precondition {
            message: message.into(),
            offending_ids,
        }
    }

    /// HTTP status code mapping
    pub fn status_code(&self) -> u16 {
        match self {
            TbError::NotFound { .. } => 404,
            TbError::Unauthorized { .. } => 401,
            TbError::Forbidden { .. } => 403,
            TbError::Validation { .. } => 400,
            TbError::Precondition { .. } => 400,
            TbError::Store(_) | TbError::Internal(_) | TbError::Config(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            TbError::NotFound { .. } => "not_found",
            TbError::Unauthorized { .. } => "unauthorized",
            TbError::Forbidden { .. } => "forbidden",
            TbError::Validation { .. } => "validation_failed",
            TbError::Precondition { .. } => "precondition_failed",
            TbError::Store(_) => "store_error",
            TbError::Internal(_) => "internal_error",
            TbError::Config(_) => "configuration_error",
        }
    }

    /// Whether the message is safe to show to a client verbatim.
    ///
    /// Store and internal errors are surfaced generically; everything else
    /// carries a human-readable reason.
    pub fn is_client_safe(&self) -> bool {
        !matches!(
            self,
            TbError::Store(_) | TbError::Internal(_) | TbError::Config(_)
        )
    }
}

/// Standard Result type for Taskboard operations
pub type TbResult<T> = Result<T, TbError>;
