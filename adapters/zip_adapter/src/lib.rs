use coversheet_core::domain::NamedDocument;
use coversheet_core::error::CoversheetError;
use coversheet_core::ports::{ArchiveWriter, Result};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// In-memory zip implementation of the ArchiveWriter trait
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveWriter;

impl ZipArchiveWriter {
    pub fn new() -> Self {
        Self
    }

    fn options() -> FileOptions {
        // Fixed timestamp and permissions keep repeated runs byte-identical
        FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644)
    }
}

fn check_documents(documents: &[NamedDocument]) -> Result<()> {
    let mut names = HashSet::new();
    for doc in documents {
        if doc.name.trim().is_empty() {
            return Err(CoversheetError::archive("document name is empty"));
        }
        if doc.bytes.is_empty() {
            return Err(CoversheetError::archive(format!(
                "document {} is empty",
                doc.name
            )));
        }
        if !names.insert(doc.name.as_str()) {
            return Err(CoversheetError::archive(format!(
                "duplicate archive entry {}",
                doc.name
            )));
        }
    }
    Ok(())
}

impl ArchiveWriter for ZipArchiveWriter {
    fn assemble(&self, documents: &[NamedDocument]) -> Result<Vec<u8>> {
        check_documents(documents)?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = Self::options();
        for doc in documents {
            zip.start_file(doc.name.as_str(), opts).map_err(|e| {
                CoversheetError::archive_io(format!("failed to start entry {}", doc.name), e)
            })?;
            zip.write_all(&doc.bytes).map_err(|e| {
                CoversheetError::archive_io(format!("failed to write entry {}", doc.name), e)
            })?;
        }
        let cursor = zip
            .finish()
            .map_err(|e| CoversheetError::archive_io("failed to finalize zip archive", e))?;

        let bytes = cursor.into_inner();
        debug!(entries = documents.len(), bytes = bytes.len(), "zip archive assembled");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, bytes: &[u8]) -> NamedDocument {
        NamedDocument {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = check_documents(&[doc("1.pdf", b"a"), doc("1.pdf", b"b")]).unwrap_err();
        assert_eq!(err.kind(), "archive");
        assert!(err.to_string().contains("duplicate archive entry 1.pdf"));
    }

    #[test]
    fn rejects_empty_documents() {
        let err = check_documents(&[doc("1.pdf", b"a"), doc("2.pdf", b"")]).unwrap_err();
        assert!(err.to_string().contains("2.pdf is empty"));
    }
}
