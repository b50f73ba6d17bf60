use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures a coversheet batch can surface to its caller
#[derive(Debug, Error)]
pub enum CoversheetError {
    /// Caller input rejected before any query runs
    #[error("invalid input: {0}")]
    Validation(String),

    /// Connection, query or timeout failure; the whole batch is lost
    #[error("data access failed: {context}: {source}")]
    DataAccess {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Requested identifiers with no best-result rows
    #[error("no exam results found for student(s) {}", join_ids(.identifiers))]
    NotFound { identifiers: Vec<i64> },

    /// Rows for one identifier disagree on header fields
    #[error("malformed report for student {external_id}: {reason}")]
    MalformedReport { external_id: i64, reason: String },

    /// A document library failed to produce bytes
    #[error("rendering {context} failed: {source}")]
    Render {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Name collision, empty document or a zip writer failure
    #[error("archive error: {context}")]
    Archive {
        context: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl CoversheetError {
    pub fn data_access(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::DataAccess {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn render(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Render {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn archive(context: impl Into<String>) -> Self {
        Self::Archive {
            context: context.into(),
            source: None,
        }
    }

    pub fn archive_io(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Archive {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::DataAccess { .. } => "data_access",
            Self::NotFound { .. } => "not_found",
            Self::MalformedReport { .. } => "malformed_report",
            Self::Render { .. } => "render",
            Self::Archive { .. } => "archive",
        }
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
