use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Add,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Failures surfaced by a [`crate::ListController`].
///
/// Messages are kept as strings so the last error can be cloned into
/// read-only view state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("failed to load list: {0}")]
    Fetch(String),
    #[error("{kind} failed: {message}")]
    Mutation { kind: MutationKind, message: String },
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("delete already in flight for item {0}")]
    DeleteInFlight(String),
    #[error("list controller is detached")]
    Detached,
}

impl ListError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn fetch(source: &anyhow::Error) -> Self {
        Self::Fetch(format!("{source:#}"))
    }

    pub fn mutation(kind: MutationKind, source: &anyhow::Error) -> Self {
        Self::Mutation {
            kind,
            message: format!("{source:#}"),
        }
    }
}
