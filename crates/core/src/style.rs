use crate::error::CoversheetError;
use crate::ports::Result;
use std::str::FromStr;

/// Column headings of the coversheet table, left to right
pub const TABLE_HEADERS: [&str; 4] = ["Subject", "Score", "Result", "Date"];

/// Labels of the title block lines, top to bottom
pub const HEADER_LABELS: [&str; 4] = ["Student Name", "IATC ID", "National ID", "Class"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pdf,
    Spreadsheet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Spreadsheet => "xlsx",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = CoversheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "xlsx" | "spreadsheet" => Ok(OutputFormat::Spreadsheet),
            other => Err(CoversheetError::Validation(format!(
                "unknown output format '{}', expected pdf or xlsx",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderStyle {
    None,
    Thin,
    Medium,
    Thick,
}

impl FromStr for BorderStyle {
    type Err = CoversheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(BorderStyle::None),
            "thin" => Ok(BorderStyle::Thin),
            "medium" => Ok(BorderStyle::Medium),
            "thick" => Ok(BorderStyle::Thick),
            other => Err(CoversheetError::Validation(format!(
                "unknown border style '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnWidthPolicy {
    Fixed,
    /// Widen each column to its longest cell
    Auto,
}

impl FromStr for ColumnWidthPolicy {
    type Err = CoversheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(ColumnWidthPolicy::Fixed),
            "auto" => Ok(ColumnWidthPolicy::Auto),
            other => Err(CoversheetError::Validation(format!(
                "unknown column width policy '{}'",
                other
            ))),
        }
    }
}

/// RGB color packed as 0xRRGGBB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u32);

impl Rgb {
    pub fn channels(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

impl FromStr for Rgb {
    type Err = CoversheetError;

    /// Accepts `RRGGBB` or `#RRGGBB`
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoversheetError::Validation(format!(
                "fill color must be six hex digits, got '{}'",
                s
            )));
        }
        u32::from_str_radix(hex, 16)
            .map(Rgb)
            .map_err(|_| CoversheetError::Validation(format!("invalid fill color '{}'", s)))
    }
}

/// Smallest body font size accepted, in points
pub const MIN_FONT_SIZE: f32 = 6.0;
/// Largest body font size accepted, in points
pub const MAX_FONT_SIZE: f32 = 36.0;

/// Checks a body font size against the supported range
pub fn validate_font_size(size: f32) -> Result<f32> {
    if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size) {
        return Err(CoversheetError::Validation(format!(
            "font size must be between {} and {} points, got {}",
            MIN_FONT_SIZE, MAX_FONT_SIZE, size
        )));
    }
    Ok(size)
}

/// Presentation parameters shared by every document format
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    /// Fill of the table header row
    pub fill_color: Rgb,
    pub border_style: BorderStyle,
    pub column_width_policy: ColumnWidthPolicy,
    /// Body font size in points; the title is two points larger
    pub font_size: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            fill_color: Rgb(0xD9E1F2),
            border_style: BorderStyle::Thin,
            column_width_policy: ColumnWidthPolicy::Fixed,
            font_size: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors_with_or_without_hash() {
        assert_eq!("#FF8000".parse::<Rgb>().unwrap(), Rgb(0xFF8000));
        assert_eq!("d9e1f2".parse::<Rgb>().unwrap().channels(), (0xD9, 0xE1, 0xF2));
        assert!("12345".parse::<Rgb>().is_err());
        assert!("GGGGGG".parse::<Rgb>().is_err());
    }

    #[test]
    fn rejects_signed_hex_colors() {
        assert!("+FFFFF".parse::<Rgb>().is_err());
        assert!("#+FFFFF".parse::<Rgb>().is_err());
        assert!("-00001".parse::<Rgb>().is_err());
    }

    #[test]
    fn font_size_must_stay_in_range() {
        assert_eq!(validate_font_size(10.0).unwrap(), 10.0);
        assert_eq!(validate_font_size(MAX_FONT_SIZE).unwrap(), MAX_FONT_SIZE);
        assert_eq!(validate_font_size(72.0).unwrap_err().kind(), "validation");
        assert!(validate_font_size(0.0).is_err());
        assert!(validate_font_size(f32::NAN).is_err());
    }

    #[test]
    fn output_format_extensions() {
        assert_eq!("PDF".parse::<OutputFormat>().unwrap().extension(), "pdf");
        assert_eq!("xlsx".parse::<OutputFormat>().unwrap().extension(), "xlsx");
        assert!("docx".parse::<OutputFormat>().is_err());
    }
}
