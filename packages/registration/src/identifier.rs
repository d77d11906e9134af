//! Sequential, year-scoped student identifiers.
//!
//! The allocator owns its counter. It is seeded once from persisted records
//! and then handed to the pipeline; there is no shared global state.
//!
//! Allocation is not synchronised. Concurrent registrants would need a lock
//! around [`IdentifierAllocator::allocate`] and the append-log write, with the
//! table's primary key as the last line of defence against duplicates.

use serde::Serialize;

use crate::error::IdentifierError;
use crate::models::StudentId;
use crate::store::{AppendLog, RelationalStore};

/// Largest sequence number handed out within one year.
///
/// Nine digits keep `{year}-{sequence}` inside the 15-character key column.
pub const MAX_SEQUENCE: u32 = 999_999_999;

/// Where the seed value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    Relational,
    AppendLog,
    /// Both backends failed; the counter starts at zero for the year.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierAllocator {
    year: i32,
    counter: u32,
    source: SeedSource,
}

impl IdentifierAllocator {
    /// Start from an explicit counter value.
    pub fn new(year: i32, counter: u32) -> Self {
        Self {
            year,
            counter,
            source: SeedSource::None,
        }
    }

    /// Seed from the highest `{year}-NNNNN` suffix already persisted.
    ///
    /// The relational store is asked first. The append log is only scanned
    /// when the relational store cannot be read. If neither can be read the
    /// counter starts at zero, which may reissue identifiers after a
    /// transient outage.
    pub async fn seed(
        relational: &dyn RelationalStore,
        log: &dyn AppendLog,
        year: i32,
    ) -> Self {
        let (ids, source) = match relational.identifiers_for_year(year).await {
            Ok(ids) => (ids, SeedSource::Relational),
            Err(db_err) => {
                tracing::warn!(error = %db_err, "could not load counter from database, trying append log");
                match log.identifiers().await {
                    Ok(ids) => (ids, SeedSource::AppendLog),
                    Err(log_err) => {
                        tracing::warn!(error = %log_err, "could not load counter from append log, starting at zero");
                        (Vec::new(), SeedSource::None)
                    }
                }
            }
        };

        let counter = max_sequence(&ids, year);
        tracing::info!(year, counter, source = ?source, "identifier counter seeded");

        Self {
            year,
            counter,
            source,
        }
    }

    /// Hand out the next identifier for `year`.
    ///
    /// A later year than the current one restarts the counter. Fails without
    /// touching the counter once the year's sequence space is used up.
    pub fn allocate(&mut self, year: i32) -> Result<StudentId, IdentifierError> {
        if year > self.year {
            tracing::info!(previous = self.year, year, "year rolled over, restarting counter");
            self.year = year;
            self.counter = 0;
        }
        let next = next_sequence(self.counter)
            .ok_or(IdentifierError::Exhausted { year: self.year })?;
        self.counter = next;
        Ok(StudentId::new(self.year, next))
    }

    /// The identifier the next [`allocate`](Self::allocate) call would return,
    /// or `None` if it would fail.
    pub fn peek_next(&self, year: i32) -> Option<StudentId> {
        if year > self.year {
            Some(StudentId::new(year, 1))
        } else {
            next_sequence(self.counter).map(|next| StudentId::new(self.year, next))
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn source(&self) -> SeedSource {
        self.source
    }
}

fn next_sequence(counter: u32) -> Option<u32> {
    counter.checked_add(1).filter(|next| *next <= MAX_SEQUENCE)
}

/// Highest numeric suffix among `ids` that belong to `year`, or zero.
///
/// Suffixes above [`MAX_SEQUENCE`] were not issued by this allocator and are
/// ignored.
pub fn max_sequence<S: AsRef<str>>(ids: &[S], year: i32) -> u32 {
    ids.iter()
        .filter_map(|id| StudentId::parse(id.as_ref()))
        .filter(|id| id.year() == Some(year))
        .filter_map(|id| id.sequence())
        .filter(|sequence| {
            let in_range = *sequence <= MAX_SEQUENCE;
            if !in_range {
                tracing::warn!(year, sequence, "ignoring out-of-range identifier");
            }
            in_range
        })
        .max()
        .unwrap_or(0)
}
