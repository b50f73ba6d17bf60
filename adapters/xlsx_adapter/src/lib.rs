//! Spreadsheet coversheet renderer
//!
//! One worksheet per document, named after the student identifier:
//!
//! ```text
//! A1  Coversheet for <name>
//! A2  Student Name | B2 <name>
//! A3  IATC ID      | B3 <external id>
//! A4  National ID  | B4 <national id>
//! A5  Class        | B5 <class>
//! A7  Subject | Score | Result | Date      <- filled, bordered
//! A8  one row per report entry ...
//! ```

use coversheet_core::domain::StudentReport;
use coversheet_core::error::CoversheetError;
use coversheet_core::ports::{DocumentRenderer, Result};
use coversheet_core::style::{
    BorderStyle, ColumnWidthPolicy, RenderStyle, HEADER_LABELS, TABLE_HEADERS,
};
use rust_xlsxwriter::{
    Color, DocProperties, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet,
    XlsxError,
};
use tracing::debug;

/// Zero-based row of the title line
pub const TITLE_ROW: u32 = 0;
/// Zero-based row of the first header field
pub const HEADER_FIRST_ROW: u32 = 1;
/// Zero-based row of the table headings; entries follow directly below
pub const TABLE_HEADER_ROW: u32 = 6;

const FIXED_COLUMN_WIDTH: f64 = 20.0;

struct Formats {
    title: Format,
    label: Format,
    heading: Format,
    cell: Format,
    score: Format,
}

/// Spreadsheet renderer backed by rust_xlsxwriter
#[derive(Debug, Clone, Default)]
pub struct XlsxRenderer {
    style: RenderStyle,
    protection_password: Option<String>,
}

impl XlsxRenderer {
    pub fn new(style: RenderStyle) -> Self {
        Self {
            style,
            protection_password: None,
        }
    }

    /// Locks every worksheet against edits with the given password
    pub fn protect_with_password(mut self, password: impl Into<String>) -> Self {
        self.protection_password = Some(password.into());
        self
    }

    fn border(&self) -> FormatBorder {
        match self.style.border_style {
            BorderStyle::None => FormatBorder::None,
            BorderStyle::Thin => FormatBorder::Thin,
            BorderStyle::Medium => FormatBorder::Medium,
            BorderStyle::Thick => FormatBorder::Thick,
        }
    }

    fn create_formats(&self) -> Formats {
        let size = f64::from(self.style.font_size);
        let border = self.border();
        Formats {
            title: Format::new().set_bold().set_font_size(size + 2.0),
            label: Format::new().set_bold().set_font_size(size),
            heading: Format::new()
                .set_bold()
                .set_font_size(size)
                .set_align(FormatAlign::Center)
                .set_background_color(Color::RGB(self.style.fill_color.0))
                .set_border(border),
            cell: Format::new().set_font_size(size).set_border(border),
            score: Format::new().set_font_size(size).set_border(border),
        }
    }

    fn write_sheet(
        &self,
        worksheet: &mut Worksheet,
        report: &StudentReport,
        formats: &Formats,
    ) -> std::result::Result<(), XlsxError> {
        let header = report.header();
        worksheet.set_name(header.external_id.to_string())?;

        worksheet.write_string_with_format(
            TITLE_ROW,
            0,
            format!("Coversheet for {}", header.name),
            &formats.title,
        )?;

        let mut row = HEADER_FIRST_ROW;
        for label in HEADER_LABELS {
            worksheet.write_string_with_format(row, 0, label, &formats.label)?;
            row += 1;
        }
        worksheet.write_string(HEADER_FIRST_ROW, 1, &header.name)?;
        worksheet.write_number(HEADER_FIRST_ROW + 1, 1, header.external_id as f64)?;
        worksheet.write_string(HEADER_FIRST_ROW + 2, 1, &header.national_id)?;
        worksheet.write_string(HEADER_FIRST_ROW + 3, 1, &header.class_label)?;

        for (col, heading) in TABLE_HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(
                TABLE_HEADER_ROW,
                col as u16,
                *heading,
                &formats.heading,
            )?;
        }

        let mut row = TABLE_HEADER_ROW + 1;
        for entry in report.entries() {
            worksheet.write_string_with_format(row, 0, &entry.subject, &formats.cell)?;
            match entry.score {
                Some(score) => worksheet.write_number_with_format(row, 1, score, &formats.score)?,
                None => worksheet.write_blank(row, 1, &formats.score)?,
            };
            worksheet.write_string_with_format(row, 2, &entry.result, &formats.cell)?;
            worksheet.write_string_with_format(row, 3, &entry.date, &formats.cell)?;
            row += 1;
        }

        match self.style.column_width_policy {
            ColumnWidthPolicy::Fixed => {
                for col in 0..TABLE_HEADERS.len() as u16 {
                    worksheet.set_column_width(col, FIXED_COLUMN_WIDTH)?;
                }
            }
            ColumnWidthPolicy::Auto => {
                worksheet.autofit();
            }
        }

        if let Some(password) = &self.protection_password {
            worksheet.protect_with_password(password);
        }
        Ok(())
    }

    fn build(&self, report: &StudentReport) -> std::result::Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();

        // Pinned so identical reports produce identical bytes
        let created = ExcelDateTime::from_ymd(2000, 1, 1)?;
        let properties = DocProperties::new()
            .set_title("Coversheet")
            .set_creation_datetime(&created);
        workbook.set_properties(&properties);

        let formats = self.create_formats();
        let worksheet = workbook.add_worksheet();
        self.write_sheet(worksheet, report, &formats)?;

        workbook.save_to_buffer()
    }
}

impl DocumentRenderer for XlsxRenderer {
    fn render(&self, report: &StudentReport) -> Result<Vec<u8>> {
        let buffer = self
            .build(report)
            .map_err(|e| CoversheetError::render("xlsx workbook", e.to_string()))?;
        debug!(
            student = report.header().external_id,
            bytes = buffer.len(),
            protected = self.protection_password.is_some(),
            "xlsx coversheet written"
        );
        Ok(buffer)
    }

    fn extension(&self) -> &str {
        "xlsx"
    }
}
