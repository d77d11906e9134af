//! Student registration - validate a new student's details, assign a
//! sequential identifier and persist the record.
//!
//! # Example
//!
//! ```
//! use student_registration::validation::{check_email, check_password};
//!
//! assert!(check_email("ada@example.com").is_ok());
//! assert!(check_password("abcd1234").is_ok());
//! assert!(check_password("abcdefgh").is_err());
//! ```
//!
//! # Architecture
//!
//! - [`validation`]: field checks, all run on every submission
//! - [`identifier`]: year-scoped `YYYY-NNNNN` identifier allocation
//! - [`store`]: append-log and relational backends behind one facade
//! - [`pipeline`]: validate → allocate → persist orchestration
//! - [`models`]: form, record and code types
//! - [`config`]: environment-driven configuration
//! - [`cli`]: command-line front end

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod identifier;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod validation;

pub use config::{DatabaseConfig, RegistrationConfig};
pub use error::{
    Backend, IdentifierError, PersistenceError, RegistrationError, Result, StoreError,
};
pub use identifier::{IdentifierAllocator, SeedSource};
pub use models::{Department, Gender, RegistrationForm, StudentId, StudentRecord};
pub use pipeline::{
    Clock, FixedClock, RegistrationPipeline, RegistrationResult, Stage, Submission, SystemClock,
};
pub use store::{AppendLog, PersistenceOutcome, PersistenceStore, RelationalStore, WriteOutcome};
pub use validation::{Field, FieldError, ValidationErrorKind};
