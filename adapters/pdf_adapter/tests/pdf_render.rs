use coversheet_core::domain::{ResultRow, StudentReport};
use coversheet_core::ports::DocumentRenderer;
use coversheet_core::style::{ColumnWidthPolicy, RenderStyle};
use lopdf::content::Content;
use lopdf::Document;
use pdf_adapter::PdfRenderer;

fn report(subjects: &[&str]) -> StudentReport {
    let rows: Vec<ResultRow> = subjects
        .iter()
        .enumerate()
        .map(|(i, subject)| ResultRow {
            name: Some("Ali Hassan".to_string()),
            external_id: 151596,
            national_id: Some("784-1999-1234567-1".to_string()),
            class_label: Some("12".to_string()),
            subject: subject.to_string(),
            score: Some(70.0 + i as f64 + 0.5),
            result: "Pass".to_string(),
            date: "2024-05-01".to_string(),
        })
        .collect();
    let refs: Vec<&ResultRow> = rows.iter().collect();
    StudentReport::from_rows(151596, &refs).expect("report")
}

/// Every string shown with `Tj`, page by page
fn shown_text(bytes: &[u8]) -> Vec<Vec<String>> {
    let doc = Document::load_mem(bytes).expect("parse pdf");
    doc.get_pages()
        .values()
        .map(|page_id| {
            let data = doc.get_page_content(*page_id).expect("page content");
            let content = Content::decode(&data).expect("decode content");
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .map(|op| {
                    let raw = op.operands[0].as_str().expect("string operand");
                    String::from_utf8_lossy(raw).into_owned()
                })
                .collect()
        })
        .collect()
}

#[test]
fn renders_header_block_and_one_row_per_entry() {
    let renderer = PdfRenderer::default();
    let bytes = renderer
        .render(&report(&["Mathematics", "English Language"]))
        .expect("render");
    assert!(bytes.starts_with(b"%PDF-1.5"));

    let pages = shown_text(&bytes);
    assert_eq!(pages.len(), 1);
    let text = &pages[0];
    assert_eq!(text[0], "Coversheet for Ali Hassan");
    assert!(text.contains(&"Student Name: Ali Hassan".to_string()));
    assert!(text.contains(&"IATC ID: 151596".to_string()));
    assert!(text.contains(&"National ID: 784-1999-1234567-1".to_string()));
    assert!(text.contains(&"Class: 12".to_string()));

    // 5 header lines, 4 headings, 4 cells per entry
    assert_eq!(text.len(), 5 + 4 + 2 * 4);
    let subject_pos = text.iter().position(|t| t == "Mathematics").unwrap();
    assert_eq!(text[subject_pos + 1], "70.5");
    assert_eq!(text[subject_pos + 2], "Pass");
    assert_eq!(text[subject_pos + 3], "2024-05-01");
    assert!(subject_pos < text.iter().position(|t| t == "English Language").unwrap());
}

#[test]
fn long_tables_continue_on_new_pages_with_headings() {
    let subjects: Vec<String> = (0..60).map(|i| format!("Module {:02}", i)).collect();
    let refs: Vec<&str> = subjects.iter().map(|s| s.as_str()).collect();
    let bytes = PdfRenderer::default().render(&report(&refs)).expect("render");

    let pages = shown_text(&bytes);
    assert!(pages.len() > 1);
    for page in &pages {
        assert_eq!(page.iter().filter(|t| *t == "Subject").count(), 1);
    }
    let rendered_rows = pages
        .iter()
        .flatten()
        .filter(|t| t.starts_with("Module "))
        .count();
    assert_eq!(rendered_rows, 60);
}

#[test]
fn unscored_entry_leaves_the_score_cell_empty() {
    let rows = vec![ResultRow {
        name: Some("Ali Hassan".to_string()),
        external_id: 151596,
        national_id: Some("784-1999-1234567-1".to_string()),
        class_label: Some("12".to_string()),
        subject: "Mathematics".to_string(),
        score: None,
        result: "Absent".to_string(),
        date: "2024-05-01".to_string(),
    }];
    let refs: Vec<&ResultRow> = rows.iter().collect();
    let report = StudentReport::from_rows(151596, &refs).expect("report");

    let pages = shown_text(&PdfRenderer::default().render(&report).expect("render"));
    let text = &pages[0];
    let subject_pos = text.iter().position(|t| t == "Mathematics").unwrap();
    assert_eq!(text[subject_pos + 1], "");
    assert_eq!(text[subject_pos + 2], "Absent");
}

#[test]
fn large_fonts_spread_rows_over_more_pages() {
    let subjects: Vec<String> = (0..30).map(|i| format!("Module {:02}", i)).collect();
    let refs: Vec<&str> = subjects.iter().map(|s| s.as_str()).collect();
    let report = report(&refs);

    let regular = shown_text(&PdfRenderer::default().render(&report).expect("render"));
    let large = PdfRenderer::new(RenderStyle {
        font_size: 24.0,
        ..RenderStyle::default()
    });
    let enlarged = shown_text(&large.render(&report).expect("render"));

    assert_eq!(regular.len(), 1);
    assert!(enlarged.len() > regular.len());
    let rendered_rows = enlarged
        .iter()
        .flatten()
        .filter(|t| t.starts_with("Module "))
        .count();
    assert_eq!(rendered_rows, 30);
}

#[test]
fn output_is_deterministic() {
    let renderer = PdfRenderer::new(RenderStyle {
        column_width_policy: ColumnWidthPolicy::Auto,
        ..RenderStyle::default()
    });
    let report = report(&["Mathematics"]);
    assert_eq!(
        renderer.render(&report).unwrap(),
        renderer.render(&report).unwrap()
    );
}

#[test]
fn extension_is_pdf() {
    assert_eq!(PdfRenderer::default().extension(), "pdf");
}
