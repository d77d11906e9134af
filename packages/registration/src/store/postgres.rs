use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::StudentRecord;
use crate::store::RelationalStore;

/// PostgreSQL error code for `duplicate_table`.
const DUPLICATE_TABLE: &str = "42P07";

const CREATE_STUDENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS Students (
        StudentID VARCHAR(15) PRIMARY KEY,
        FirstName VARCHAR(50) NOT NULL,
        LastName VARCHAR(50) NOT NULL,
        Gender VARCHAR(1) NOT NULL,
        Department VARCHAR(50) NOT NULL,
        DateOfBirth DATE NOT NULL,
        Email VARCHAR(100) NOT NULL
    )
"#;

/// `Students` table in PostgreSQL.
#[derive(Debug)]
pub struct PgStudentStore {
    pool: PgPool,
    schema_ready: AtomicBool,
}

impl PgStudentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: AtomicBool::new(false),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RelationalStore for PgStudentStore {
    #[tracing::instrument(skip(self))]
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        match sqlx::query(CREATE_STUDENTS_TABLE).execute(&self.pool).await {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(DUPLICATE_TABLE) => {
                tracing::debug!("students table already exists");
            }
            Err(e) => return Err(e.into()),
        }

        self.schema_ready.store(true, Ordering::Release);
        Ok(())
    }

    #[tracing::instrument(skip(self, record), fields(student_id = %record.student_id))]
    async fn insert(&self, record: &StudentRecord) -> Result<(), StoreError> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO Students (StudentID, FirstName, LastName, Gender, Department, DateOfBirth, Email)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.student_id.as_str())
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(record.gender.code())
        .bind(record.department.code())
        .bind(record.date_of_birth)
        .bind(&record.email)
        .execute(&self.pool)
        .await?;

        tracing::debug!("record inserted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn identifiers_for_year(&self, year: i32) -> Result<Vec<String>, StoreError> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"SELECT StudentID FROM Students WHERE StudentID LIKE $1 ORDER BY StudentID"#,
        )
        .bind(format!("{year}-%"))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

/// Relational backend used when no database is configured.
///
/// Every call fails, which leaves the application saving to the append log
/// only.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> StoreError {
        StoreError::Unavailable(self.reason.clone())
    }
}

#[async_trait]
impl RelationalStore for UnavailableStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Err(self.error())
    }

    async fn insert(&self, _record: &StudentRecord) -> Result<(), StoreError> {
        Err(self.error())
    }

    async fn identifiers_for_year(&self, _year: i32) -> Result<Vec<String>, StoreError> {
        Err(self.error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = UnavailableStore::new("DATABASE_URL not set");

        let err = store.ensure_schema().await.unwrap_err();
        assert_eq!(err.to_string(), "backend unavailable: DATABASE_URL not set");
        assert!(store.identifiers_for_year(2025).await.is_err());
    }
}
