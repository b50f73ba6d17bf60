use crate::domain::{IdentifierList, NamedDocument, ResultRow, StudentReport};
use crate::error::CoversheetError;

pub type Result<T> = std::result::Result<T, CoversheetError>;

pub trait StudentRepository {
    // Fetches best-result rows for the requested students, ordered by subject display order
    fn fetch_results(&self, identifiers: &IdentifierList) -> Result<Vec<ResultRow>>;
}

/// Trait for turning one student report into a document
/// This is a port (interface) that defines how the core communicates with format adapters
pub trait DocumentRenderer {
    fn render(&self, report: &StudentReport) -> Result<Vec<u8>>;

    /// File extension without the dot, e.g. `pdf`
    fn extension(&self) -> &str;
}

/// Trait for bundling rendered documents into one archive
pub trait ArchiveWriter {
    fn assemble(&self, documents: &[NamedDocument]) -> Result<Vec<u8>>;
}
