use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;
use crate::models::{StudentRecord, CSV_HEADER};
use crate::store::AppendLog;

/// Append log backed by a comma-separated text file.
///
/// Fields are not quoted or escaped.
#[derive(Debug, Clone)]
pub struct CsvAppendLog {
    path: PathBuf,
}

impl CsvAppendLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AppendLog for CsvAppendLog {
    #[tracing::instrument(skip(self, record), fields(path = %self.path.display(), student_id = %record.student_id))]
    async fn append(&self, record: &StudentRecord) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let original_len = file.metadata().await?.len();

        let mut content = String::new();
        if original_len == 0 {
            content.push_str(CSV_HEADER);
            content.push('\n');
        }
        content.push_str(&record.csv_line());
        content.push('\n');

        write_or_truncate(&mut file, content.as_bytes(), original_len).await?;

        tracing::debug!("record appended");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn identifiers(&self) -> Result<Vec<String>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        // Rows written in another charset must not hide the identifiers.
        let content = String::from_utf8_lossy(&bytes);

        let ids = content
            .lines()
            .skip(1)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| line.split(',').next())
            .map(String::from)
            .collect();

        Ok(ids)
    }
}

/// The file operations an append needs.
#[async_trait]
trait LogFile: Send {
    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;
    async fn sync_data(&mut self) -> std::io::Result<()>;
    async fn set_len(&mut self, len: u64) -> std::io::Result<()>;
}

#[async_trait]
impl LogFile for File {
    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        AsyncWriteExt::write_all(self, buf).await?;
        // Surfaces errors from the background write.
        AsyncWriteExt::flush(self).await
    }

    async fn sync_data(&mut self) -> std::io::Result<()> {
        File::sync_data(self).await
    }

    async fn set_len(&mut self, len: u64) -> std::io::Result<()> {
        File::set_len(self, len).await
    }
}

/// Write `content` in one go. On failure the file is cut back to
/// `original_len` so no partial row remains.
async fn write_or_truncate<F: LogFile>(
    file: &mut F,
    content: &[u8],
    original_len: u64,
) -> std::io::Result<()> {
    let written = async {
        file.write_all(content).await?;
        file.sync_data().await
    }
    .await;

    if let Err(e) = written {
        if let Err(truncate_err) = file.set_len(original_len).await {
            tracing::error!(error = %truncate_err, "failed to truncate append log after write error");
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{Department, Gender, StudentId};

    fn record(sequence: u32) -> StudentRecord {
        StudentRecord {
            student_id: StudentId::new(2025, sequence),
            first_name: "Alan".to_string(),
            last_name: "Turing".to_string(),
            gender: Gender::Male,
            department: Department::Mechanical,
            date_of_birth: NaiveDate::from_ymd_opt(1999, 6, 23).unwrap(),
            email: "alan@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvAppendLog::new(dir.path().join("students.csv"));

        log.append(&record(1)).await.unwrap();
        log.append(&record(2)).await.unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            content,
            "StudentID,FirstName,LastName,Gender,Department,DateOfBirth,Email\n\
             2025-00001,Alan,Turing,M,Mechanical,1999-06-23,alan@example.com\n\
             2025-00002,Alan,Turing,M,Mechanical,1999-06-23,alan@example.com\n"
        );
    }

    #[tokio::test]
    async fn test_append_to_existing_file_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.csv");
        std::fs::write(
            &path,
            format!("{CSV_HEADER}\n2024-00009,Old,Record,F,Civil,2000-01-01,old@example.com\n"),
        )
        .unwrap();

        let log = CsvAppendLog::new(&path);
        log.append(&record(1)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches(CSV_HEADER).count(), 1);
        assert_eq!(content.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_identifiers_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvAppendLog::new(dir.path().join("absent.csv"));

        assert!(log.identifiers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identifiers_skip_header_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.csv");
        std::fs::write(
            &path,
            format!(
                "{CSV_HEADER}\n2025-00001,A,B,M,Civil,2000-01-01,a@b.com\n\n  \n2025-00002,C,D,F,CSE,2001-01-01,c@d.com\n"
            ),
        )
        .unwrap();

        let ids = CsvAppendLog::new(&path).identifiers().await.unwrap();
        assert_eq!(ids, vec!["2025-00001", "2025-00002"]);
    }

    #[tokio::test]
    async fn test_identifiers_survive_non_utf8_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.csv");
        let mut content =
            format!("{CSV_HEADER}\n2025-00001,A,B,M,Civil,2000-01-01,a@b.com\n").into_bytes();
        content.extend_from_slice(b"2025-00002,Jos\xE9,C,M,Civil,2000-01-01,j@b.com\n");
        std::fs::write(&path, content).unwrap();

        let ids = CsvAppendLog::new(&path).identifiers().await.unwrap();
        assert_eq!(ids, vec!["2025-00001", "2025-00002"]);
    }

    /// In-memory file that accepts `capacity` bytes, then fails mid-write.
    struct ShortFile {
        data: Vec<u8>,
        capacity: usize,
        fail_sync: bool,
    }

    impl ShortFile {
        fn with_content(content: &[u8], capacity: usize) -> Self {
            Self {
                data: content.to_vec(),
                capacity,
                fail_sync: false,
            }
        }
    }

    #[async_trait]
    impl LogFile for ShortFile {
        async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
            let room = self.capacity.saturating_sub(self.data.len());
            self.data.extend_from_slice(&buf[..buf.len().min(room)]);
            if buf.len() > room {
                return Err(std::io::Error::other("disk full"));
            }
            Ok(())
        }

        async fn sync_data(&mut self) -> std::io::Result<()> {
            if self.fail_sync {
                return Err(std::io::Error::other("sync failed"));
            }
            Ok(())
        }

        async fn set_len(&mut self, len: u64) -> std::io::Result<()> {
            self.data.truncate(len as usize);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_write_truncates_partial_row() {
        let existing = format!("{CSV_HEADER}\n2025-00001,A,B,M,Civil,2000-01-01,a@b.com\n");
        let mut file = ShortFile::with_content(existing.as_bytes(), existing.len() + 10);
        let row = format!("{}\n", record(2).csv_line());

        let err = write_or_truncate(&mut file, row.as_bytes(), existing.len() as u64)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "disk full");
        assert_eq!(file.data, existing.as_bytes());
    }

    #[tokio::test]
    async fn test_failed_sync_truncates_written_row() {
        let mut file = ShortFile::with_content(b"", usize::MAX);
        file.fail_sync = true;

        let result = write_or_truncate(&mut file, b"header\nrow\n", 0).await;

        assert!(result.is_err());
        assert!(file.data.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_append_to_full_device_reports_error() {
        let log = CsvAppendLog::new("/dev/full");

        let err = log.append(&record(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[tokio::test]
    async fn test_append_to_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvAppendLog::new(dir.path().join("missing-dir").join("students.csv"));

        let err = log.append(&record(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
