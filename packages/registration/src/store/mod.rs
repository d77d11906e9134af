//! Dual-backend persistence of student records.
//!
//! Every registration is written to an append log and to a relational table.
//! The two paths fail independently: a failure on one side is reported but
//! never stops or undoes the write on the other.
//!
//! - [`csv_log`]: line-oriented append log (`students.csv`)
//! - [`postgres`]: `Students` table in PostgreSQL

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Backend, PersistenceError, StoreError};
use crate::models::StudentRecord;

pub mod csv_log;
pub mod postgres;

pub use csv_log::CsvAppendLog;
pub use postgres::{PgStudentStore, UnavailableStore};

/// Durable, human-readable, line-oriented record log.
#[async_trait]
pub trait AppendLog: Send + Sync {
    /// Append one record. Either the whole row lands or nothing does.
    async fn append(&self, record: &StudentRecord) -> Result<(), StoreError>;

    /// Every identifier present in the log, in file order.
    async fn identifiers(&self) -> Result<Vec<String>, StoreError>;
}

/// Schema-enforced table of student records keyed by identifier.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Create the table if it does not exist. Safe to call repeatedly.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    async fn insert(&self, record: &StudentRecord) -> Result<(), StoreError>;

    /// Identifiers carrying the `{year}-` prefix.
    async fn identifiers_for_year(&self, year: i32) -> Result<Vec<String>, StoreError>;
}

/// Result of writing one record to both backends.
#[derive(Debug)]
pub struct WriteOutcome {
    pub log: Result<(), PersistenceError>,
    pub relational: Result<(), PersistenceError>,
}

impl WriteOutcome {
    /// Fold both backend results into a single outcome.
    pub fn outcome(&self) -> PersistenceOutcome {
        match (&self.log, &self.relational) {
            (Ok(()), Ok(())) => PersistenceOutcome::Full,
            (Ok(()), Err(e)) | (Err(e), Ok(())) => PersistenceOutcome::Partial {
                failed: e.backend,
                cause: e.source.to_string(),
            },
            (Err(log), Err(relational)) => PersistenceOutcome::Unpersisted {
                log_cause: log.source.to_string(),
                relational_cause: relational.source.to_string(),
            },
        }
    }
}

/// How durably a registered record was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistenceOutcome {
    /// Both backends accepted the record.
    Full,
    /// One backend accepted the record, the other did not.
    Partial { failed: Backend, cause: String },
    /// Validated and identified, but nothing durable captured it.
    Unpersisted {
        log_cause: String,
        relational_cause: String,
    },
}

impl PersistenceOutcome {
    pub fn is_full(&self) -> bool {
        matches!(self, PersistenceOutcome::Full)
    }

    /// At least one backend holds the record.
    pub fn is_persisted(&self) -> bool {
        !matches!(self, PersistenceOutcome::Unpersisted { .. })
    }

    /// Warning to show next to a successful registration, if any.
    pub fn warning(&self) -> Option<String> {
        match self {
            PersistenceOutcome::Full => None,
            PersistenceOutcome::Partial { failed, cause } => Some(match failed {
                Backend::Relational => {
                    format!("Error saving to database: {cause}. Data saved to CSV only.")
                }
                Backend::AppendLog => {
                    format!("Error saving to CSV: {cause}. Data saved to database only.")
                }
            }),
            PersistenceOutcome::Unpersisted {
                log_cause,
                relational_cause,
            } => Some(format!(
                "Record was not saved. CSV: {log_cause}; database: {relational_cause}"
            )),
        }
    }
}

/// Facade over both backends.
#[derive(Clone)]
pub struct PersistenceStore {
    log: Arc<dyn AppendLog>,
    relational: Arc<dyn RelationalStore>,
}

impl PersistenceStore {
    pub fn new(log: Arc<dyn AppendLog>, relational: Arc<dyn RelationalStore>) -> Self {
        Self { log, relational }
    }

    pub fn log(&self) -> &dyn AppendLog {
        self.log.as_ref()
    }

    pub fn relational(&self) -> &dyn RelationalStore {
        self.relational.as_ref()
    }

    /// Write `record` to the append log, then to the relational table.
    ///
    /// Both writes are always attempted.
    pub async fn write(&self, record: &StudentRecord) -> WriteOutcome {
        let log = self
            .log
            .append(record)
            .await
            .map_err(|e| PersistenceError::new(Backend::AppendLog, e));
        if let Err(e) = &log {
            tracing::warn!(student_id = %record.student_id, backend = %e.backend, error = %e.source, "failed to save record");
        }

        let relational = self
            .relational
            .insert(record)
            .await
            .map_err(|e| PersistenceError::new(Backend::Relational, e));
        if let Err(e) = &relational {
            tracing::warn!(student_id = %record.student_id, backend = %e.backend, error = %e.source, "failed to save record");
        }

        WriteOutcome { log, relational }
    }
}
