use crate::domain::{
    GenerationReport, IdentifierList, NamedDocument, ResultTable, SkippedStudent, StudentReport,
};
use crate::error::CoversheetError;
use crate::ports::{ArchiveWriter, DocumentRenderer, Result, StudentRepository};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Download name offered for the bundled coversheets
pub const ARCHIVE_FILE_NAME: &str = "coversheets.zip";
pub const ARCHIVE_MIME_TYPE: &str = "application/zip";

/// What to do when a requested identifier has no exam results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingStudentPolicy {
    /// Leave the student out and report it in `GenerationReport::skipped`
    #[default]
    Skip,
    /// Fail the whole batch with `NotFound`
    Abort,
}

impl FromStr for MissingStudentPolicy {
    type Err = CoversheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(MissingStudentPolicy::Skip),
            "abort" => Ok(MissingStudentPolicy::Abort),
            other => Err(CoversheetError::Validation(format!(
                "unknown missing-student policy '{}', expected skip or abort",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationOptions {
    pub missing_policy: MissingStudentPolicy,
}

/// Application service for turning identifiers into an archive of coversheets
pub struct CoversheetService {
    repository: Box<dyn StudentRepository>,
    renderer: Box<dyn DocumentRenderer>,
    archive_writer: Box<dyn ArchiveWriter>,
    options: GenerationOptions,
}

impl CoversheetService {
    /// Creates a new CoversheetService with the given dependencies
    pub fn new(
        repository: Box<dyn StudentRepository>,
        renderer: Box<dyn DocumentRenderer>,
        archive_writer: Box<dyn ArchiveWriter>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            repository,
            renderer,
            archive_writer,
            options,
        }
    }

    /// Runs one read-only query for every requested student
    pub fn fetch(&self, identifiers: &IdentifierList) -> Result<ResultTable> {
        let rows = self.repository.fetch_results(identifiers)?;
        debug!(rows = rows.len(), "fetched best-result rows");
        Ok(ResultTable::new(rows))
    }

    /// Renders one report and names it `{external_id}.{ext}`
    pub fn render_document(&self, report: &StudentReport) -> Result<NamedDocument> {
        let bytes = self.renderer.render(report)?;
        let name = format!(
            "{}.{}",
            report.header().external_id,
            self.renderer.extension()
        );
        debug!(document = %name, bytes = bytes.len(), "rendered coversheet");
        Ok(NamedDocument { name, bytes })
    }

    /// Executes the whole batch: fetch once, render per identifier in request
    /// order, then bundle everything into one archive.
    pub fn generate(&self, identifiers: &IdentifierList) -> Result<GenerationReport> {
        info!(
            students = identifiers.len(),
            format = self.renderer.extension(),
            "generating coversheets"
        );

        let table = self.fetch(identifiers)?;
        let missing = table.missing(identifiers);
        if !missing.is_empty() && self.options.missing_policy == MissingStudentPolicy::Abort {
            return Err(CoversheetError::NotFound {
                identifiers: missing,
            });
        }

        let mut documents = Vec::with_capacity(identifiers.len());
        let mut skipped: Vec<SkippedStudent> = Vec::new();

        for &external_id in identifiers.iter() {
            if skipped.iter().any(|s| s.external_id == external_id) {
                continue;
            }
            let rows = table.rows_for(external_id);
            match StudentReport::from_rows(external_id, &rows) {
                Ok(report) => documents.push(self.render_document(&report)?),
                Err(error @ CoversheetError::NotFound { .. })
                | Err(error @ CoversheetError::MalformedReport { .. }) => {
                    warn!(
                        student = external_id,
                        kind = error.kind(),
                        "skipping coversheet: {}",
                        error
                    );
                    skipped.push(SkippedStudent { external_id, error });
                }
                Err(other) => return Err(other),
            }
        }

        if documents.is_empty() {
            if !missing.is_empty() {
                return Err(CoversheetError::NotFound {
                    identifiers: missing,
                });
            }
            return Err(skipped
                .into_iter()
                .next()
                .map(|s| s.error)
                .unwrap_or_else(|| CoversheetError::archive("no documents to archive")));
        }

        let archive = self.archive_writer.assemble(&documents)?;
        let entries = documents.into_iter().map(|d| d.name).collect::<Vec<_>>();
        info!(
            documents = entries.len(),
            skipped = skipped.len(),
            bytes = archive.len(),
            "coversheet archive ready"
        );

        Ok(GenerationReport {
            archive,
            entries,
            skipped,
        })
    }
}
