use std::path::PathBuf;
use std::time::Duration;

/// Default location of the append log.
pub const DEFAULT_CSV_PATH: &str = "students.csv";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConfig {
    pub csv_path: PathBuf,
    /// `None` runs without the relational backend.
    pub database: Option<DatabaseConfig>,
}

impl RegistrationConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let csv_path = lookup("STUDENTS_CSV_PATH")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CSV_PATH.into())
            .into();

        let database = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .map(|url| {
                let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_MAX_CONNECTIONS);

                let acquire_timeout_secs: u64 = lookup("DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS);

                DatabaseConfig::new(url)
                    .with_max_connections(max_connections)
                    .with_acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            });

        Self { csv_path, database }
    }

    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            database: None,
        }
    }

    pub fn with_database(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }

    /// Replace the database URL, keeping any pool settings already set.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.database = Some(match self.database.take() {
            Some(database) => DatabaseConfig { url, ..database },
            None => DatabaseConfig::new(url),
        });
        self
    }
}
