//! `rowbind_xlsx` v1:
//! Typed records to and from Excel worksheets.
//!
//! Module map:
//! - `conf`      : constants and default presets
//! - `spec`      : value/style/layout/option/report models and errors
//! - `record`    : declarative field-to-column binding
//! - `convert`   : typed cell coercion
//! - `color`     : color string parsing
//! - `rich_text` : rich text cells as HTML
//! - `util`      : pure helper functions
//! - `reader`    : object factory (`.xls` / `.xlsx` rows into records)
//! - `writer`    : drawing factory (records into styled `.xlsx` rows)
pub mod color;
pub mod conf;
pub mod convert;
pub mod reader;
pub mod record;
pub mod rich_text;
pub mod spec;
pub mod util;
pub mod writer;

pub use color::parse_color;
pub use conf::{
    C_DATE_NUM_FORMAT_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    N_WIDTH_EXCEL_COLUMN_MAX, TUP_EXCEL_ILLEGAL,
};
pub use convert::{
    FromCellValue, IntoCellValue, convert_datetime_to_excel_serial,
    convert_excel_serial_to_datetime,
};
pub use reader::XlsxObjectReader;
pub use record::{SheetRecord, SpecColumn};
pub use rich_text::{
    RichTextIndex, SpecRichFont, SpecRichRun, render_plain_text_html, render_rich_text_html,
};
pub use spec::{
    EnumCellValue, EnumCoercionMode, EnumExcelType, EnumFillPattern, EnumHorizontalAlign,
    EnumVerticalAlign, Result, SpecCellStyle, SpecDrawOptions, SpecDrawReport, SpecHeaderStyle,
    SpecReadOptions, SpecReadReport, SpecSheetLayout, XlsxObjectError,
};
pub use util::sanitize_sheet_name;
pub use writer::XlsxDrawingWriter;
