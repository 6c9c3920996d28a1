//! Shared value, style, layout and option models plus the crate error type.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::conf::{
    derive_default_draw_options, derive_default_read_options, derive_default_sheet_layout,
};

////////////////////////////////////////////////////////////////////////////////
// #region WorkbookKind

/// Workbook container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumExcelType {
    /// Excel 97-2003 binary workbook (`.xls`).
    Xls,
    /// Office Open XML workbook (`.xlsx`).
    Xlsx,
}

impl EnumExcelType {
    /// Derive the workbook type from a path extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|val| val.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xls" => Ok(Self::Xls),
            "xlsx" => Ok(Self::Xlsx),
            _ => Err(XlsxObjectError::InvalidExtension(path.to_path_buf())),
        }
    }

    /// Canonical file extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// Normalized cell value used by both the reading and the drawing pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Date/time value.
    DateTime(NaiveDateTime),
    /// Excel error code (`#DIV/0!` is `0x07`, `#N/A` is `0x2A`, ...).
    Error(u8),
}

impl EnumCellValue {
    /// Whether the cell carries no usable content.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(val) => val.is_empty(),
            _ => false,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellStyle

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnumHorizontalAlign {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterAcross,
    Distributed,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnumVerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

/// Cell fill pattern, in Excel's pattern order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnumFillPattern {
    None,
    #[default]
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    DarkHorizontal,
    DarkVertical,
    DarkDown,
    DarkUp,
    DarkGrid,
    DarkTrellis,
    LightHorizontal,
    LightVertical,
    LightDown,
    LightUp,
    LightGrid,
    LightTrellis,
    Gray125,
    Gray0625,
}

/// Style declared on a header or data cell.
///
/// Every field is optional so styles can be layered with [`SpecCellStyle::merge`];
/// unset alignment falls back to general/top and unset fill pattern to solid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecCellStyle {
    /// Row height in points.
    pub height: Option<f64>,
    /// Font color (`#RRGGBB`, `red`, `255,0,0`).
    pub text_color: Option<String>,
    /// Fill background color.
    pub background_color: Option<String>,
    /// Fill foreground color.
    pub foreground_color: Option<String>,
    /// Horizontal alignment.
    pub text_align: Option<EnumHorizontalAlign>,
    /// Vertical alignment.
    pub vertical_align: Option<EnumVerticalAlign>,
    /// Fill pattern, used only when a fill color is set.
    pub fill_pattern: Option<EnumFillPattern>,
    /// Font weight; `>= 700` is bold.
    pub font_weight: Option<u16>,
    /// Font family name.
    pub font_family: Option<String>,
    /// Font size in points; non-positive values are ignored.
    pub font_size: Option<f64>,
    /// Italic font.
    pub italic: Option<bool>,
    /// Number format code.
    pub num_format: Option<String>,
}

impl SpecCellStyle {
    /// Return a new style by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellStyle) -> SpecCellStyle {
        self.merge(&patch)
    }

    /// Merge two styles with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellStyle) -> SpecCellStyle {
        SpecCellStyle {
            height: other.height.or(self.height),
            text_color: other.text_color.clone().or_else(|| self.text_color.clone()),
            background_color: other
                .background_color
                .clone()
                .or_else(|| self.background_color.clone()),
            foreground_color: other
                .foreground_color
                .clone()
                .or_else(|| self.foreground_color.clone()),
            text_align: other.text_align.or(self.text_align),
            vertical_align: other.vertical_align.or(self.vertical_align),
            fill_pattern: other.fill_pattern.or(self.fill_pattern),
            font_weight: other.font_weight.or(self.font_weight),
            font_family: other.font_family.clone().or_else(|| self.font_family.clone()),
            font_size: other.font_size.or(self.font_size),
            italic: other.italic.or(self.italic),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }

    /// Whether any font-level property is set.
    pub fn has_font(&self) -> bool {
        self.font_weight.is_some_and(|val| val > 0)
            || self.font_family.as_deref().is_some_and(|val| !val.is_empty())
            || self.font_size.is_some_and(|val| val > 0.0)
            || self.italic.unwrap_or(false)
            || self.text_color.as_deref().is_some_and(|val| !val.is_empty())
    }
}

/// Header cell style plus the width of the column it heads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecHeaderStyle {
    /// Header cell style.
    pub style: SpecCellStyle,
    /// Column width in character units (clamped to 255).
    pub column_width: Option<usize>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetLayout

/// Row layout of a record table inside a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecSheetLayout {
    /// Zero-based header row.
    pub header_row_index: usize,
    /// Zero-based first data row.
    pub start_index: usize,
    /// Zero-based last data row (inclusive). `None`, `0` or a row past the
    /// sheet end read up to the last row.
    pub end_index: Option<usize>,
}

impl Default for SpecSheetLayout {
    fn default() -> Self {
        derive_default_sheet_layout()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// How unconvertible cells are handled while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCoercionMode {
    /// Keep the field default and record a warning.
    #[default]
    Lenient,
    /// Abort the read with [`XlsxObjectError::CellCoercion`].
    Strict,
}

/// Reader options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecReadOptions {
    /// Coercion failure policy.
    pub coercion: EnumCoercionMode,
    /// Omit rows that are missing or blank in every bound column.
    pub if_skip_empty_rows: bool,
}

/// Drawing writer options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDrawOptions {
    /// Freeze panes below the header row of newly created sheets.
    pub if_freeze_header: bool,
    /// Number format for date/time cells whose style has none.
    pub date_num_format: String,
    /// Continue after the last drawn row when drawing into an existing sheet.
    /// Off by default: each draw starts at the layout start index and
    /// overwrites rows drawn earlier.
    pub if_keep_sheet_cursor: bool,
}

impl Default for SpecReadOptions {
    fn default() -> Self {
        derive_default_read_options()
    }
}

impl Default for SpecDrawOptions {
    fn default() -> Self {
        derive_default_draw_options()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Reports

/// Per-call report of [`crate::reader::XlsxObjectReader`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecReadReport {
    /// Sheet that was read.
    pub sheet_name: String,
    /// Number of records produced.
    pub rows_read: usize,
    /// Cells successfully coerced into fields.
    pub cells_converted: usize,
    /// Non-blank cells left at the field default.
    pub cells_defaulted: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

/// Per-call report of [`crate::writer::XlsxDrawingWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecDrawReport {
    /// Actual sheet name in the workbook.
    pub sheet_name: String,
    /// First drawn data row (inclusive).
    pub row_start: usize,
    /// Last drawn data row (exclusive).
    pub row_end_exclusive: usize,
    /// Number of drawn columns.
    pub n_columns: usize,
    /// Whether this call created the sheet and drew its header.
    pub if_header_drawn: bool,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecReadReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

impl SpecDrawReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Errors raised while mapping records to or from a workbook.
#[derive(Debug, thiserror::Error)]
pub enum XlsxObjectError {
    /// Workbook path was empty.
    #[error("Workbook path cannot be empty.")]
    EmptyPath,
    /// Path extension is neither `.xls` nor `.xlsx`.
    #[error("File extension is invalid (expected .xls or .xlsx): {}", .0.display())]
    InvalidExtension(PathBuf),
    /// Output format cannot be produced by the writer backend.
    #[error("Writing {0:?} workbooks is not supported; use .xlsx.")]
    UnsupportedOutput(EnumExcelType),
    /// Underlying IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Workbook could not be opened or decoded.
    #[error("Workbook read error: {0}")]
    Workbook(#[from] calamine::Error),
    /// Workbook could not be encoded or saved.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    /// Shared string table could not be parsed.
    #[error("Rich text error: {0}")]
    RichText(String),
    /// Sheet index beyond the workbook sheet count.
    #[error("Sheet index {0} is out of range.")]
    SheetIndexOutOfRange(usize),
    /// Header row has no cells.
    #[error("Header row {} is missing.", .0 + 1)]
    HeaderRowMissing(usize),
    /// Same normalized header text appears twice in the header row.
    #[error(
        "Duplicate column name \"{name}\" at column {} and column {} in row {}.",
        .col_first + 1,
        .col_second + 1,
        .row + 1
    )]
    DuplicateColumn {
        /// Normalized header text.
        name: String,
        /// First zero-based column.
        col_first: usize,
        /// Second zero-based column.
        col_second: usize,
        /// Zero-based header row.
        row: usize,
    },
    /// Bound column cannot be located in the header row.
    #[error("Cannot find the field \"{0}\" in the excel table.")]
    InvalidColumn(String),
    /// Drawn column has no index.
    #[error("Column index is missing for field \"{0}\".")]
    ColumnIndexMissing(String),
    /// Two drawn columns share the same index.
    #[error("Duplicate column index {0}.")]
    DuplicateColumnIndex(usize),
    /// Cell could not be coerced into the bound field (strict mode).
    #[error("Cannot convert cell at row {} column {} into field \"{field}\".", .row + 1, .col + 1)]
    CellCoercion {
        /// Zero-based row.
        row: usize,
        /// Zero-based column.
        col: usize,
        /// Field name.
        field: String,
    },
    /// Drawing would exceed the Excel row limit.
    #[error("Row {0} exceeds the Excel row limit.")]
    RowLimitExceeded(usize),
    /// Drawing would exceed the Excel column limit.
    #[error("Column {0} exceeds the Excel column limit.")]
    ColumnLimitExceeded(usize),
    /// Writer was already closed.
    #[error("Cannot draw after close().")]
    Closed,
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, XlsxObjectError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excel_type_from_path_is_case_insensitive() {
        assert_eq!(
            EnumExcelType::from_path(Path::new("a/b/input.XLS")).unwrap(),
            EnumExcelType::Xls
        );
        assert_eq!(
            EnumExcelType::from_path(Path::new("out.xlsx")).unwrap(),
            EnumExcelType::Xlsx
        );
        assert!(matches!(
            EnumExcelType::from_path(Path::new("out.csv")),
            Err(XlsxObjectError::InvalidExtension(_))
        ));
        assert!(matches!(
            EnumExcelType::from_path(Path::new("noext")),
            Err(XlsxObjectError::InvalidExtension(_))
        ));
    }

    #[test]
    fn test_cell_style_merge_prefers_right_side() {
        let base = SpecCellStyle {
            text_color: Some("red".to_string()),
            font_size: Some(11.0),
            ..Default::default()
        };
        let merged = base.with_(SpecCellStyle {
            font_size: Some(14.0),
            italic: Some(true),
            ..Default::default()
        });

        assert_eq!(merged.text_color.as_deref(), Some("red"));
        assert_eq!(merged.font_size, Some(14.0));
        assert_eq!(merged.italic, Some(true));
    }

    #[test]
    fn test_has_font_ignores_non_positive_size() {
        let style = SpecCellStyle {
            font_size: Some(-1.0),
            ..Default::default()
        };
        assert!(!style.has_font());
        assert!(
            SpecCellStyle {
                font_weight: Some(700),
                ..Default::default()
            }
            .has_font()
        );
    }

    #[test]
    fn test_error_messages_are_one_based() {
        let err = XlsxObjectError::DuplicateColumn {
            name: "name".to_string(),
            col_first: 0,
            col_second: 2,
            row: 0,
        };
        assert_eq!(
            err.to_string(),
            "Duplicate column name \"name\" at column 1 and column 3 in row 1."
        );
        assert_eq!(
            XlsxObjectError::InvalidColumn("From".to_string()).to_string(),
            "Cannot find the field \"From\" in the excel table."
        );
    }
}
