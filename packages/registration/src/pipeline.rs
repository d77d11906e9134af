//! Registration orchestration.
//!
//! One submission moves through `AwaitingInput → Validating` and ends in
//! `Rejected` (nothing allocated, nothing written) or `Registered`
//! (identifier allocated, record written to both backends as far as they
//! allow). A valid submission for a year with no identifiers left ends in
//! `Unallocated`. The only state carried between submissions is the
//! identifier counter.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::config::RegistrationConfig;
use crate::db;
use crate::error::IdentifierError;
use crate::identifier::IdentifierAllocator;
use crate::models::{RegistrationForm, StudentId, StudentRecord};
use crate::store::{
    CsvAppendLog, PersistenceOutcome, PersistenceStore, PgStudentStore, RelationalStore,
    UnavailableStore,
};
use crate::validation::{self, FieldError};

/// Source of the current date for age checks and identifier years.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Stage of a single submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AwaitingInput,
    Validating,
    Rejected,
    Unallocated,
    Registered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationResult {
    pub student_id: StudentId,
    pub summary: String,
    pub outcome: PersistenceOutcome,
}

/// Terminal state of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Submission {
    Rejected { errors: Vec<FieldError> },
    Unallocated { error: IdentifierError },
    Registered(RegistrationResult),
}

impl Submission {
    pub fn stage(&self) -> Stage {
        match self {
            Submission::Rejected { .. } => Stage::Rejected,
            Submission::Unallocated { .. } => Stage::Unallocated,
            Submission::Registered(_) => Stage::Registered,
        }
    }

    pub fn registered(&self) -> Option<&RegistrationResult> {
        match self {
            Submission::Registered(result) => Some(result),
            _ => None,
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        match self {
            Submission::Rejected { errors } => errors,
            _ => &[],
        }
    }
}

pub struct RegistrationPipeline {
    allocator: IdentifierAllocator,
    store: PersistenceStore,
    clock: Arc<dyn Clock>,
}

impl RegistrationPipeline {
    pub fn new(
        allocator: IdentifierAllocator,
        store: PersistenceStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            allocator,
            store,
            clock,
        }
    }

    /// Build the backends from configuration, prepare the table and seed the
    /// identifier counter for the current year.
    ///
    /// Never fails: an unusable database leaves the pipeline writing to the
    /// append log only.
    pub async fn open(config: &RegistrationConfig) -> Self {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(config: &RegistrationConfig, clock: Arc<dyn Clock>) -> Self {
        let log = Arc::new(CsvAppendLog::new(&config.csv_path));
        let relational = relational_store(config);

        if let Err(e) = relational.ensure_schema().await {
            tracing::warn!(error = %e, "error initializing database, will save to CSV only");
        }

        let year = clock.today().year();
        let allocator = IdentifierAllocator::seed(relational.as_ref(), log.as_ref(), year).await;

        Self::new(allocator, PersistenceStore::new(log, relational), clock)
    }

    /// Run every field check without allocating or writing anything.
    pub fn validate(&self, form: &RegistrationForm) -> Vec<FieldError> {
        validation::validate(form, self.clock.today())
            .err()
            .unwrap_or_default()
    }

    /// Validate `form` and, if it passes, allocate an identifier and persist
    /// the record.
    pub async fn register(&mut self, form: &RegistrationForm) -> Submission {
        let today = self.clock.today();
        tracing::debug!(stage = ?Stage::AwaitingInput, "submission received");
        tracing::debug!(stage = ?Stage::Validating, "validating submission");

        let valid = match validation::validate(form, today) {
            Ok(valid) => valid,
            Err(errors) => {
                tracing::debug!(stage = ?Stage::Rejected, errors = errors.len(), "submission rejected");
                return Submission::Rejected { errors };
            }
        };

        let student_id = match self.allocator.allocate(today.year()) {
            Ok(id) => id,
            Err(error) => {
                tracing::error!(error = %error, "could not allocate student identifier");
                return Submission::Unallocated { error };
            }
        };
        let record = StudentRecord {
            student_id: student_id.clone(),
            first_name: valid.first_name,
            last_name: valid.last_name,
            gender: valid.gender,
            department: valid.department,
            date_of_birth: valid.date_of_birth,
            email: valid.email,
        };

        let outcome = self.store.write(&record).await.outcome();
        match &outcome {
            PersistenceOutcome::Full => {
                tracing::info!(student_id = %student_id, "student registered");
            }
            PersistenceOutcome::Partial { failed, .. } => {
                tracing::warn!(student_id = %student_id, failed_backend = %failed, "student registered with partial persistence");
            }
            PersistenceOutcome::Unpersisted { .. } => {
                tracing::error!(student_id = %student_id, "student registered but not persisted to any backend");
            }
        }
        tracing::debug!(stage = ?Stage::Registered, student_id = %student_id, "submission registered");

        Submission::Registered(RegistrationResult {
            student_id,
            summary: record.summary(),
            outcome,
        })
    }

    /// The identifier the next successful registration would receive, or
    /// `None` if the current year has none left.
    pub fn next_id(&self) -> Option<StudentId> {
        self.allocator.peek_next(self.clock.today().year())
    }

    pub fn allocator(&self) -> &IdentifierAllocator {
        &self.allocator
    }

    pub fn store(&self) -> &PersistenceStore {
        &self.store
    }
}

fn relational_store(config: &RegistrationConfig) -> Arc<dyn RelationalStore> {
    let Some(database) = &config.database else {
        return Arc::new(UnavailableStore::new("DATABASE_URL not set"));
    };

    match db::create_pool(database) {
        Ok(pool) => Arc::new(PgStudentStore::new(pool)),
        Err(e) => {
            tracing::warn!(error = %e, "invalid database configuration, will save to CSV only");
            Arc::new(UnavailableStore::new(e.to_string()))
        }
    }
}
