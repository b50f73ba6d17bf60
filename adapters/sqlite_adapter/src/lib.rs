use coversheet_core::domain::{IdentifierList, ResultRow};
use coversheet_core::error::CoversheetError;
use coversheet_core::ports::{Result, StudentRepository};
use coversheet_core::utils::{format_class_label, normalize_exam_date};
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Identifiers bound per statement; SQLite caps host parameters per statement
const IDENTIFIERS_PER_QUERY: usize = 500;

/// SQLite implementation of the StudentRepository trait
pub struct SqliteStudentRepository {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStudentRepository {
    /// Creates a new SqliteStudentRepository with the given database path
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Bounds how long a query waits on a locked database
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    fn location(&self) -> String {
        self.db_path.to_string_lossy().into_owned()
    }
}

/// Join query with one positional placeholder per identifier
fn best_results_query(identifier_count: usize) -> String {
    let placeholders = (1..=identifier_count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
        SELECT
            student_list.name,
            student_list.iatc_id,
            student_list.nat_id,
            CAST(student_list.class AS TEXT),
            exam_list.exam_long,
            CAST(exam_results.score AS REAL),
            exam_results.result,
            CAST(exam_results.date AS TEXT)
        FROM exam_results
        JOIN student_list ON exam_results.nat_id = student_list.nat_id
        JOIN exam_list ON exam_results.exam = exam_list.exam
        WHERE student_list.iatc_id IN ({}) AND exam_results.score_index = 1
        ORDER BY exam_list.srt_exam ASC, student_list.iatc_id ASC
        "#,
        placeholders
    )
}

// NULL header fields and scores stay `None`; the report builder decides
fn map_row(row: &Row) -> rusqlite::Result<ResultRow> {
    let class_label: Option<String> = row.get(3)?;
    let date: Option<String> = row.get(7)?;
    Ok(ResultRow {
        name: row.get(0)?,
        external_id: row.get(1)?,
        national_id: row.get(2)?,
        class_label: class_label.as_deref().map(format_class_label),
        subject: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        score: row.get(5)?,
        result: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        date: normalize_exam_date(date.as_deref().unwrap_or_default()),
    })
}

/// Requested identifiers without repeats, in request order
fn distinct_identifiers(identifiers: &IdentifierList) -> Vec<i64> {
    let mut seen = HashSet::new();
    identifiers
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

impl StudentRepository for SqliteStudentRepository {
    fn fetch_results(&self, identifiers: &IdentifierList) -> Result<Vec<ResultRow>> {
        // Connection is dropped, and so closed, when this call returns
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| CoversheetError::data_access(format!("opening {}", self.location()), e))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| CoversheetError::data_access("setting busy timeout", e))?;

        // Every row of one student lands in the same chunk, so per-student
        // subject order survives the split
        let ids = distinct_identifiers(identifiers);
        let mut rows = Vec::new();
        for chunk in ids.chunks(IDENTIFIERS_PER_QUERY) {
            let sql = best_results_query(chunk.len());
            let mut stmt = conn
                .prepare_cached(&sql)
                .map_err(|e| CoversheetError::data_access("preparing best-result query", e))?;
            let fetched = stmt
                .query_map(params_from_iter(chunk.iter()), map_row)
                .map_err(|e| CoversheetError::data_access("running best-result query", e))?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
                .map_err(|e| CoversheetError::data_access("reading best-result rows", e))?;
            rows.extend(fetched);
        }

        debug!(
            db = %self.location(),
            identifiers = ids.len(),
            rows = rows.len(),
            "sqlite fetch complete"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_binds_one_placeholder_per_identifier() {
        let sql = best_results_query(3);
        assert!(sql.contains("IN (?1, ?2, ?3)"));
        assert!(sql.contains("exam_results.score_index = 1"));
    }

    #[test]
    fn repeated_identifiers_are_queried_once() {
        let ids = IdentifierList::new(vec![7, 3, 7, 3, 9]).unwrap();
        assert_eq!(distinct_identifiers(&ids), vec![7, 3, 9]);
    }

    #[test]
    fn missing_database_is_data_access_error() {
        let repo = SqliteStudentRepository::new("/nonexistent/dir/coversheets.sqlite3");
        let ids = IdentifierList::new(vec![151596]).unwrap();
        let err = repo.fetch_results(&ids).unwrap_err();
        assert_eq!(err.kind(), "data_access");
    }
}
