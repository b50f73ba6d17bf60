use coversheet_core::domain::StudentReport;
use coversheet_core::error::CoversheetError;
use coversheet_core::ports::{DocumentRenderer, Result};
use coversheet_core::style::{
    BorderStyle, ColumnWidthPolicy, RenderStyle, Rgb, HEADER_LABELS, TABLE_HEADERS,
};
use coversheet_core::utils::format_score;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

// A4 portrait in points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 28.35;
const MIN_ROW_HEIGHT: f32 = 20.0;
const CELL_PADDING: f32 = 4.0;
const FIXED_COLUMN_WIDTH: f32 = 113.4;
const MIN_COLUMN_WIDTH: f32 = 40.0;

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

/// PDF renderer drawing the coversheet directly into page content streams
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer {
    style: RenderStyle,
}

impl PdfRenderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    fn title_size(&self) -> f32 {
        self.style.font_size + 2.0
    }

    /// Table rows and header lines get twice the font size, never less than 20pt
    fn row_height(&self) -> f32 {
        (self.style.font_size * 2.0).max(MIN_ROW_HEIGHT)
    }

    fn border_width(&self) -> Option<f32> {
        match self.style.border_style {
            BorderStyle::None => None,
            BorderStyle::Thin => Some(0.5),
            BorderStyle::Medium => Some(1.0),
            BorderStyle::Thick => Some(1.5),
        }
    }

    fn column_widths(&self, rows: &[[String; 4]]) -> [f32; 4] {
        match self.style.column_width_policy {
            ColumnWidthPolicy::Fixed => [FIXED_COLUMN_WIDTH; 4],
            ColumnWidthPolicy::Auto => {
                let mut widths = [MIN_COLUMN_WIDTH; 4];
                for (i, header) in TABLE_HEADERS.iter().enumerate() {
                    widths[i] = widths[i]
                        .max(text_width(header, self.style.font_size, true) + 2.0 * CELL_PADDING);
                }
                for row in rows {
                    for (i, cell) in row.iter().enumerate() {
                        widths[i] = widths[i]
                            .max(text_width(cell, self.style.font_size, false) + 2.0 * CELL_PADDING);
                    }
                }
                let available = PAGE_WIDTH - 2.0 * MARGIN;
                let total: f32 = widths.iter().sum();
                if total > available {
                    let scale = available / total;
                    widths.iter_mut().for_each(|w| *w *= scale);
                }
                widths
            }
        }
    }

    /// Lays the report out into one operation list per page
    fn layout(&self, report: &StudentReport) -> Vec<Vec<Operation>> {
        let header = report.header();
        let size = self.style.font_size;
        let rows: Vec<[String; 4]> = report
            .entries()
            .iter()
            .map(|e| {
                [
                    e.subject.clone(),
                    e.score.map(format_score).unwrap_or_default(),
                    e.result.clone(),
                    e.date.clone(),
                ]
            })
            .collect();
        let widths = self.column_widths(&rows);
        let row_height = self.row_height();

        let mut pages = Vec::new();
        let mut ops = Vec::new();
        let mut y = PAGE_HEIGHT - MARGIN - row_height;

        let title = format!("Coversheet for {}", header.name);
        let title_x = ((PAGE_WIDTH - text_width(&title, self.title_size(), true)) / 2.0).max(MARGIN);
        push_text(&mut ops, BOLD_FONT, self.title_size(), title_x, y, &title);
        y -= row_height;

        let values = [
            header.name.clone(),
            header.external_id.to_string(),
            header.national_id.clone(),
            header.class_label.clone(),
        ];
        for (label, value) in HEADER_LABELS.iter().zip(values.iter()) {
            let line = format!("{}: {}", label, value);
            push_text(&mut ops, REGULAR_FONT, size, MARGIN, y, &line);
            y -= row_height;
        }
        y -= row_height / 2.0;

        self.push_table_header(&mut ops, &widths, y);
        y -= row_height;

        for row in &rows {
            if y - row_height < MARGIN {
                pages.push(std::mem::take(&mut ops));
                y = PAGE_HEIGHT - MARGIN - row_height;
                self.push_table_header(&mut ops, &widths, y);
                y -= row_height;
            }
            let mut x = MARGIN;
            for (cell, width) in row.iter().zip(widths.iter()) {
                self.push_cell_border(&mut ops, x, y, *width);
                self.push_cell_text(&mut ops, REGULAR_FONT, x, y, *width, x + CELL_PADDING, cell);
                x += width;
            }
            y -= row_height;
        }
        pages.push(ops);
        pages
    }

    fn push_table_header(&self, ops: &mut Vec<Operation>, widths: &[f32; 4], y: f32) {
        let size = self.style.font_size;
        let (r, g, b) = rgb_components(self.style.fill_color);
        let total: f32 = widths.iter().sum();
        ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
        ops.push(Operation::new(
            "re",
            vec![MARGIN.into(), y.into(), total.into(), self.row_height().into()],
        ));
        ops.push(Operation::new("f", vec![]));
        ops.push(Operation::new("rg", vec![0.into(), 0.into(), 0.into()]));

        let mut x = MARGIN;
        for (heading, width) in TABLE_HEADERS.iter().zip(widths.iter()) {
            self.push_cell_border(ops, x, y, *width);
            let centered = x + ((width - text_width(heading, size, true)) / 2.0).max(CELL_PADDING);
            self.push_cell_text(ops, BOLD_FONT, x, y, *width, centered, heading);
            x += width;
        }
    }

    /// Shows `text` inside the cell at (`x`, `y`), clipped to the cell box
    #[allow(clippy::too_many_arguments)]
    fn push_cell_text(
        &self,
        ops: &mut Vec<Operation>,
        font: &str,
        x: f32,
        y: f32,
        width: f32,
        text_x: f32,
        text: &str,
    ) {
        let size = self.style.font_size;
        let row_height = self.row_height();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "re",
            vec![x.into(), y.into(), width.into(), row_height.into()],
        ));
        ops.push(Operation::new("W", vec![]));
        ops.push(Operation::new("n", vec![]));
        push_text(ops, font, size, text_x, text_baseline(y, size, row_height), text);
        ops.push(Operation::new("Q", vec![]));
    }

    fn push_cell_border(&self, ops: &mut Vec<Operation>, x: f32, y: f32, width: f32) {
        let Some(line_width) = self.border_width() else {
            return;
        };
        ops.push(Operation::new("RG", vec![0.into(), 0.into(), 0.into()]));
        ops.push(Operation::new("w", vec![line_width.into()]));
        ops.push(Operation::new(
            "re",
            vec![x.into(), y.into(), width.into(), self.row_height().into()],
        ));
        ops.push(Operation::new("S", vec![]));
    }

    fn build_document(&self, report: &StudentReport) -> Result<Document> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR_FONT => regular_id,
                BOLD_FONT => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for operations in self.layout(report) {
            let content = Content { operations };
            let encoded = content
                .encode()
                .map_err(|e| CoversheetError::render("pdf page content", e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();
        Ok(doc)
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, report: &StudentReport) -> Result<Vec<u8>> {
        let mut doc = self.build_document(report)?;
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| CoversheetError::render("pdf document", e.to_string()))?;
        debug!(
            student = report.header().external_id,
            bytes = buffer.len(),
            "pdf coversheet written"
        );
        Ok(buffer)
    }

    fn extension(&self) -> &str {
        "pdf"
    }
}

fn push_text(ops: &mut Vec<Operation>, font: &str, size: f32, x: f32, y: f32, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::string_literal(encode_win_ansi(text))],
    ));
    ops.push(Operation::new("ET", vec![]));
}

/// Baseline that vertically centers a line of text in a table row at `y`
fn text_baseline(y: f32, size: f32, row_height: f32) -> f32 {
    y + (row_height - size) / 2.0 + size * 0.2
}

fn rgb_components(color: Rgb) -> (f32, f32, f32) {
    let (r, g, b) = color.channels();
    (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
}

/// Approximate Helvetica advance width; standard fonts carry no metrics here,
/// so an average glyph width is used.
fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let average = if bold { 0.58 } else { 0.52 };
    text.chars().count() as f32 * size * average
}

/// Encodes text for the standard WinAnsi font encoding. Characters the
/// encoding cannot represent become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (c as u32) < 0x80 || ((c as u32) >= 0xA0 && (c as u32) <= 0xFF) => c as u8,
            _ => b'?',
        })
        .collect()
}
