// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Engine error taxonomy.
//!
//! Every lifecycle operation validates its preconditions before mutating
//! anything and returns one of these variants synchronously. `Transient`
//! is the only retryable class; it maps from storage timeouts, never from
//! domain rule violations.

use thiserror::Error;

use crate::domain::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad input: negative quantity, negative fee, missing required field.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Collection, agent, material, bank or sale absent (or filtered out).
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller is not the owner, assigned agent or admin for the record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Invariant violation: already validated, open collection exists,
    /// deleting the last line item, reversing a payout, ...
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store timeout or connectivity failure; callers may retry.
    #[error("transient storage failure: {0}")]
    Transient(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => EngineError::NotFound(msg),
            RepositoryError::Timeout(msg) => EngineError::Transient(msg),
            RepositoryError::Storage(msg) => EngineError::Transient(msg),
        }
    }
}
