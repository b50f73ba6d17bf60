use crate::error::CoversheetError;
use crate::ports::Result;
use std::collections::HashSet;

/// One best-result row as returned by the directory/catalog/results join.
/// Header fields and the score are `None` where the store holds NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub name: Option<String>,
    pub external_id: i64,
    pub national_id: Option<String>,
    pub class_label: Option<String>,
    pub subject: String,
    pub score: Option<f64>,
    pub result: String,
    pub date: String,
}

/// Validated, non-empty list of positive student identifiers in request order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierList(Vec<i64>);

impl IdentifierList {
    pub fn new(ids: Vec<i64>) -> Result<Self> {
        if ids.is_empty() {
            return Err(CoversheetError::Validation(
                "at least one student identifier is required".to_string(),
            ));
        }
        if let Some(bad) = ids.iter().find(|id| **id <= 0) {
            return Err(CoversheetError::Validation(format!(
                "student identifier must be a positive integer, got {}",
                bad
            )));
        }
        Ok(Self(ids))
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &i64> {
        self.0.iter()
    }
}

/// Multi-student result set owned by one request
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows belonging to one student, in fetch order
    pub fn rows_for(&self, external_id: i64) -> Vec<&ResultRow> {
        self.rows
            .iter()
            .filter(|row| row.external_id == external_id)
            .collect()
    }

    /// Requested identifiers that matched no row, in request order without repeats
    pub fn missing(&self, identifiers: &IdentifierList) -> Vec<i64> {
        let present: HashSet<i64> = self.rows.iter().map(|row| row.external_id).collect();
        let mut seen = HashSet::new();
        identifiers
            .iter()
            .copied()
            .filter(|id| !present.contains(id) && seen.insert(*id))
            .collect()
    }
}

/// Fields printed in the coversheet title block
#[derive(Debug, Clone, PartialEq)]
pub struct ReportHeader {
    pub name: String,
    pub external_id: i64,
    pub national_id: String,
    pub class_label: String,
}

/// One line of the coversheet table
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub subject: String,
    /// `None` when no score is recorded; rendered as an empty cell
    pub score: Option<f64>,
    pub result: String,
    pub date: String,
}

/// Per-student slice of the result table with a consistent header
#[derive(Debug, Clone, PartialEq)]
pub struct StudentReport {
    header: ReportHeader,
    entries: Vec<ReportEntry>,
}

impl StudentReport {
    /// Builds the report for `external_id` from its rows.
    ///
    /// Zero rows is a `NotFound`; a missing or blank header field, conflicting
    /// header values or a subject that appears twice (two directory rows for
    /// one identifier) is a `MalformedReport`.
    pub fn from_rows(external_id: i64, rows: &[&ResultRow]) -> Result<Self> {
        let first = rows.first().ok_or_else(|| CoversheetError::NotFound {
            identifiers: vec![external_id],
        })?;

        let header = ReportHeader {
            name: required(external_id, "name", first.name.as_deref())?,
            external_id,
            national_id: required(external_id, "national id", first.national_id.as_deref())?,
            class_label: required(external_id, "class", first.class_label.as_deref())?,
        };

        let mut subjects = HashSet::new();
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            if row.external_id != external_id {
                return Err(malformed(
                    external_id,
                    format!("row for identifier {} mixed into report", row.external_id),
                ));
            }
            let name = required(external_id, "name", row.name.as_deref())?;
            if name != header.name {
                return Err(malformed(
                    external_id,
                    format!("conflicting names '{}' and '{}'", header.name, name),
                ));
            }
            let national_id = required(external_id, "national id", row.national_id.as_deref())?;
            if national_id != header.national_id {
                return Err(malformed(
                    external_id,
                    format!(
                        "conflicting national ids '{}' and '{}'",
                        header.national_id, national_id
                    ),
                ));
            }
            let class_label = required(external_id, "class", row.class_label.as_deref())?;
            if class_label != header.class_label {
                return Err(malformed(
                    external_id,
                    format!(
                        "conflicting classes '{}' and '{}'",
                        header.class_label, class_label
                    ),
                ));
            }
            if !subjects.insert(row.subject.as_str()) {
                return Err(malformed(
                    external_id,
                    format!("subject '{}' has more than one best result", row.subject),
                ));
            }
            entries.push(ReportEntry {
                subject: row.subject.clone(),
                score: row.score,
                result: row.result.clone(),
                date: row.date.clone(),
            });
        }

        Ok(Self { header, entries })
    }

    pub fn header(&self) -> &ReportHeader {
        &self.header
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }
}

/// Header values must be present and non-blank
fn required(external_id: i64, field: &str, value: Option<&str>) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(malformed(external_id, format!("{} is missing", field))),
    }
}

fn malformed(external_id: i64, reason: String) -> CoversheetError {
    CoversheetError::MalformedReport {
        external_id,
        reason,
    }
}

/// A rendered document ready to be archived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A student left out of the archive and why
#[derive(Debug)]
pub struct SkippedStudent {
    pub external_id: i64,
    pub error: CoversheetError,
}

/// Everything one `generate` call produced
#[derive(Debug)]
pub struct GenerationReport {
    pub archive: Vec<u8>,
    pub entries: Vec<String>,
    pub skipped: Vec<SkippedStudent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, subject: &str) -> ResultRow {
        ResultRow {
            name: Some("Ali Hassan".to_string()),
            external_id: id,
            national_id: Some("784-1999-1234567-1".to_string()),
            class_label: Some("12".to_string()),
            subject: subject.to_string(),
            score: Some(88.0),
            result: "Pass".to_string(),
            date: "2024-05-01".to_string(),
        }
    }

    #[test]
    fn identifier_list_rejects_empty_and_non_positive() {
        assert!(matches!(
            IdentifierList::new(vec![]),
            Err(CoversheetError::Validation(_))
        ));
        assert!(matches!(
            IdentifierList::new(vec![151596, 0]),
            Err(CoversheetError::Validation(_))
        ));
        assert_eq!(IdentifierList::new(vec![151596]).unwrap().len(), 1);
    }

    #[test]
    fn missing_reports_unmatched_ids_once_in_request_order() {
        let table = ResultTable::new(vec![row(151596, "Math")]);
        let ids = IdentifierList::new(vec![3, 151596, 2, 3]).unwrap();
        assert_eq!(table.missing(&ids), vec![3, 2]);
    }

    #[test]
    fn report_preserves_row_order() {
        let rows = vec![row(1, "Physics"), row(1, "Algebra")];
        let refs: Vec<&ResultRow> = rows.iter().collect();
        let report = StudentReport::from_rows(1, &refs).unwrap();
        let subjects: Vec<&str> = report.entries().iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Physics", "Algebra"]);
        assert_eq!(report.header().name, "Ali Hassan");
    }

    #[test]
    fn report_from_no_rows_is_not_found() {
        let err = StudentReport::from_rows(42, &[]).unwrap_err();
        assert!(matches!(err, CoversheetError::NotFound { ref identifiers } if identifiers == &vec![42]));
    }

    #[test]
    fn report_with_conflicting_header_is_malformed() {
        let a = row(1, "Math");
        let mut b = row(1, "English");
        b.national_id = Some("784-2000-7654321-2".to_string());
        let err = StudentReport::from_rows(1, &[&a, &b]).unwrap_err();
        assert!(matches!(err, CoversheetError::MalformedReport { external_id: 1, .. }));
    }

    #[test]
    fn report_with_repeated_subject_is_malformed() {
        let a = row(1, "Math");
        let b = row(1, "Math");
        let err = StudentReport::from_rows(1, &[&a, &b]).unwrap_err();
        assert_eq!(err.kind(), "malformed_report");
    }

    #[test]
    fn report_with_null_or_blank_header_field_is_malformed() {
        let mut unnamed = row(1, "Math");
        unnamed.name = None;
        let err = StudentReport::from_rows(1, &[&unnamed]).unwrap_err();
        assert!(matches!(
            err,
            CoversheetError::MalformedReport { external_id: 1, ref reason } if reason == "name is missing"
        ));

        let mut blank = row(2, "Math");
        blank.national_id = Some("  ".to_string());
        assert_eq!(
            StudentReport::from_rows(2, &[&blank]).unwrap_err().kind(),
            "malformed_report"
        );

        // A later row losing its class is just as broken as the first one
        let first = row(3, "Math");
        let mut second = row(3, "English");
        second.class_label = None;
        assert_eq!(
            StudentReport::from_rows(3, &[&first, &second]).unwrap_err().kind(),
            "malformed_report"
        );
    }

    #[test]
    fn report_keeps_a_missing_score_as_none() {
        let mut unscored = row(1, "Math");
        unscored.score = None;
        let report = StudentReport::from_rows(1, &[&unscored]).unwrap();
        assert_eq!(report.entries()[0].score, None);
    }
}
