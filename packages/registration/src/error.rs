//! Error types for student registration.
//!
//! Validation failures are not errors in this sense: they are collected as
//! [`FieldError`](crate::validation::FieldError) values and handed back to the
//! caller as a batch. The types here cover the storage backends and the
//! surrounding application.

use std::fmt;

use thiserror::Error;

use crate::validation::FieldError;

/// Which persistence path a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    AppendLog,
    Relational,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::AppendLog => "append log",
            Backend::Relational => "relational",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a single storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// A backend write that did not go through.
///
/// Never rolls back the other backend and never invalidates an identifier
/// that was already handed out.
#[derive(Debug, Error)]
#[error("{backend} write failed: {source}")]
pub struct PersistenceError {
    pub backend: Backend,
    #[source]
    pub source: StoreError,
}

impl PersistenceError {
    pub fn new(backend: Backend, source: StoreError) -> Self {
        Self { backend, source }
    }
}

/// The allocator could not hand out an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentifierError {
    #[error("no identifiers left for {year}")]
    Exhausted { year: i32 },
}

/// Crate-level error for the command line.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("submission rejected with {} validation error(s)", errors.len())]
    Rejected { errors: Vec<FieldError> },

    #[error("submission not registered: {0}")]
    Unallocated(#[from] IdentifierError),
}

pub type Result<T> = std::result::Result<T, RegistrationError>;
