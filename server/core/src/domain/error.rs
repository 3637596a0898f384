// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use thiserror::Error;

use crate::domain::repository::RepositoryError;

/// Closed error taxonomy surfaced by the validation and service layers.
///
/// Storage failures are carried through the `Storage` variant and are the
/// only kind treated as unexpected; everything else is a business outcome
/// the presentation layer maps to a user-facing message.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    DuplicateKey(String),

    #[error("{0}")]
    InvalidReference(String),

    #[error("{0}")]
    CapacityExceeded(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl DomainError {
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{entity} not found"))
    }
}
