//! Spreadsheet constants and default preset factories.

use crate::spec::{
    EnumCoercionMode, EnumFillPattern, EnumHorizontalAlign, EnumVerticalAlign, SpecCellStyle,
    SpecDrawOptions, SpecReadOptions, SpecSheetLayout,
};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Excel column width upper bound, in character units.
pub const N_WIDTH_EXCEL_COLUMN_MAX: usize = 255;
/// Font weight at and above which text is rendered bold.
pub const N_FONT_WEIGHT_BOLD: u16 = 700;
/// Font weight reported for non-bold rich text runs.
pub const N_FONT_WEIGHT_NORMAL: u16 = 400;

/// Default number format applied to date/time cells without an explicit format.
pub const C_DATE_NUM_FORMAT_DEFAULT: &str = "yyyy-mm-dd hh:mm:ss";

/// Path of the shared string table inside an OOXML package.
pub const C_XLSX_SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
/// Path of the workbook part inside an OOXML package.
pub const C_XLSX_WORKBOOK_PATH: &str = "xl/workbook.xml";
/// Path of the workbook relationships part inside an OOXML package.
pub const C_XLSX_WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";

/// Build the default sheet layout: header on row 0, data from row 1 to the end.
pub fn derive_default_sheet_layout() -> SpecSheetLayout {
    SpecSheetLayout {
        header_row_index: 0,
        start_index: 1,
        end_index: None,
    }
}

/// Build the base style every declared cell style is layered onto.
pub fn derive_default_cell_style() -> SpecCellStyle {
    SpecCellStyle {
        text_align: Some(EnumHorizontalAlign::General),
        vertical_align: Some(EnumVerticalAlign::Top),
        fill_pattern: Some(EnumFillPattern::Solid),
        ..Default::default()
    }
}

/// Build default read options: lenient coercion, blank rows kept.
pub fn derive_default_read_options() -> SpecReadOptions {
    SpecReadOptions {
        coercion: EnumCoercionMode::Lenient,
        if_skip_empty_rows: false,
    }
}

/// Build default draw options.
pub fn derive_default_draw_options() -> SpecDrawOptions {
    SpecDrawOptions {
        if_freeze_header: false,
        date_num_format: C_DATE_NUM_FORMAT_DEFAULT.to_string(),
        if_keep_sheet_cursor: false,
    }
}
