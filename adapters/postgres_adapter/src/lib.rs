use coversheet_core::domain::{IdentifierList, ResultRow};
use coversheet_core::error::CoversheetError;
use coversheet_core::ports::{Result, StudentRepository};
use coversheet_core::utils::{format_class_label, normalize_exam_date};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Connection, Row};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// Identifiers are bound as one BIGINT[] parameter; every column is cast so the
// row decoding does not depend on how the store declares them.
const BEST_RESULTS_QUERY: &str = r#"
    SELECT
        student_list.name::TEXT AS name,
        student_list.iatc_id::BIGINT AS iatc_id,
        student_list.nat_id::TEXT AS nat_id,
        student_list.class::TEXT AS class_label,
        exam_list.exam_long::TEXT AS subject,
        exam_results.score::DOUBLE PRECISION AS score,
        exam_results.result::TEXT AS result,
        exam_results.date::TEXT AS exam_date
    FROM exam_results
    JOIN student_list ON exam_results.nat_id = student_list.nat_id
    JOIN exam_list ON exam_results.exam = exam_list.exam
    WHERE student_list.iatc_id::BIGINT = ANY($1) AND exam_results.score_index = 1
    ORDER BY exam_list.srt_exam ASC, student_list.iatc_id ASC
"#;

/// Connection settings for the exam results database
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Upper bound for connect plus query
    pub timeout: Duration,
}

impl DatabaseConfig {
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
            .application_name("coversheet")
    }

    fn location(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// PostgreSQL implementation of the StudentRepository trait
pub struct PostgresStudentRepository {
    config: DatabaseConfig,
}

impl PostgresStudentRepository {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    async fn query(&self, identifiers: Vec<i64>) -> Result<Vec<ResultRow>> {
        let location = self.config.location();
        let mut conn = PgConnection::connect_with(&self.config.connect_options())
            .await
            .map_err(|e| CoversheetError::data_access(format!("connecting to {}", location), e))?;

        let fetched = sqlx::query(BEST_RESULTS_QUERY)
            .bind(identifiers)
            .fetch_all(&mut conn)
            .await;

        // Close before inspecting the query result so failures still release the connection
        if let Err(e) = conn.close().await {
            warn!(db = %location, "closing database connection failed: {}", e);
        }

        let rows = fetched
            .map_err(|e| CoversheetError::data_access("running best-result query", e))?;
        rows.iter()
            .map(map_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| CoversheetError::data_access("decoding best-result rows", e))
    }
}

fn map_row(row: &PgRow) -> std::result::Result<ResultRow, sqlx::Error> {
    let class_label: Option<String> = row.try_get("class_label")?;
    let date: Option<String> = row.try_get("exam_date")?;
    Ok(ResultRow {
        name: row.try_get("name")?,
        external_id: row.try_get("iatc_id")?,
        national_id: row.try_get("nat_id")?,
        class_label: class_label.as_deref().map(format_class_label),
        subject: row.try_get::<Option<String>, _>("subject")?.unwrap_or_default(),
        score: row.try_get("score")?,
        result: row.try_get::<Option<String>, _>("result")?.unwrap_or_default(),
        date: normalize_exam_date(date.as_deref().unwrap_or_default()),
    })
}

impl StudentRepository for PostgresStudentRepository {
    fn fetch_results(&self, identifiers: &IdentifierList) -> Result<Vec<ResultRow>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CoversheetError::data_access("starting database runtime", e))?;

        let timeout = self.config.timeout;
        let ids = identifiers.as_slice().to_vec();
        let rows = runtime.block_on(async {
            match tokio::time::timeout(timeout, self.query(ids)).await {
                Ok(result) => result,
                Err(elapsed) => Err(CoversheetError::data_access(
                    format!("database call exceeded {}s", timeout.as_secs_f32()),
                    elapsed,
                )),
            }
        })?;

        debug!(db = %self.config.location(), rows = rows.len(), "postgres fetch complete");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Instant;

    fn config(port: u16, timeout: Duration) -> DatabaseConfig {
        DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port,
            database: "exams".to_string(),
            user: "reader".to_string(),
            password: "s3cret".to_string(),
            timeout,
        }
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", config(DEFAULT_PORT, DEFAULT_TIMEOUT));
        assert!(rendered.contains("127.0.0.1"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn query_uses_bound_identifier_array() {
        assert!(BEST_RESULTS_QUERY.contains("= ANY($1)"));
        assert!(BEST_RESULTS_QUERY.contains("exam_results.score_index = 1"));
        assert!(BEST_RESULTS_QUERY.contains("ORDER BY exam_list.srt_exam ASC"));
    }

    #[test]
    fn unreachable_database_is_data_access_error() {
        let repo = PostgresStudentRepository::new(config(1, Duration::from_secs(5)));
        let ids = IdentifierList::new(vec![151596]).unwrap();
        let err = repo.fetch_results(&ids).unwrap_err();
        assert_eq!(err.kind(), "data_access");
    }

    #[test]
    fn silent_server_hits_the_timeout() {
        // The kernel completes the handshake but nothing ever answers the startup message
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();

        let repo = PostgresStudentRepository::new(config(port, Duration::from_millis(200)));
        let ids = IdentifierList::new(vec![151596]).unwrap();
        let started = Instant::now();
        let err = repo.fetch_results(&ids).unwrap_err();

        assert_eq!(err.kind(), "data_access");
        assert!(err.to_string().contains("exceeded"), "{}", err);
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(listener);
    }
}
