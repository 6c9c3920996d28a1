//! Object factory: worksheet rows into typed records.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use calamine::{CellErrorType, Data, Range, Reader, Sheets, Xls, Xlsx};

use crate::convert::FromCellValue;
use crate::record::{SheetRecord, SpecColumn};
use crate::rich_text::{RichTextIndex, render_plain_text_html};
use crate::spec::{
    EnumCellValue, EnumCoercionMode, EnumExcelType, Result, SpecReadOptions, SpecReadReport,
    XlsxObjectError,
};
use crate::util::{derive_end_row, derive_header_columns, resolve_column_index};

/// Reader of typed records from an `.xls` or `.xlsx` workbook.
///
/// The whole workbook is loaded into memory when the reader is created.
pub struct XlsxObjectReader {
    path_excel: Option<PathBuf>,
    excel_type: EnumExcelType,
    v_bytes: Arc<[u8]>,
    workbook: Sheets<Cursor<Arc<[u8]>>>,
    options: SpecReadOptions,
    rich_text: Option<RichTextIndex>,
    l_reports: Vec<SpecReadReport>,
}

impl XlsxObjectReader {
    /// Open a workbook file; the type follows the path extension.
    pub fn open(path_excel: impl AsRef<Path>) -> Result<Self> {
        let path_excel = path_excel.as_ref();
        if path_excel.as_os_str().is_empty() {
            return Err(XlsxObjectError::EmptyPath);
        }
        let excel_type = EnumExcelType::from_path(path_excel)?;
        let v_bytes = std::fs::read(path_excel)?;
        log::debug!(
            "Opened {} workbook {} ({} bytes)",
            excel_type.extension(),
            path_excel.display(),
            v_bytes.len()
        );

        let mut reader = Self::from_bytes(v_bytes, excel_type)?;
        reader.path_excel = Some(path_excel.to_path_buf());
        Ok(reader)
    }

    /// Load a workbook of the given type from any byte source.
    pub fn from_reader<R: Read>(mut source: R, excel_type: EnumExcelType) -> Result<Self> {
        let mut v_bytes = Vec::new();
        source.read_to_end(&mut v_bytes)?;
        Self::from_bytes(v_bytes, excel_type)
    }

    /// Load a workbook of the given type from its raw bytes.
    pub fn from_bytes(v_bytes: Vec<u8>, excel_type: EnumExcelType) -> Result<Self> {
        let v_bytes: Arc<[u8]> = Arc::from(v_bytes);
        let cursor = Cursor::new(Arc::clone(&v_bytes));
        let workbook = match excel_type {
            EnumExcelType::Xls => Sheets::Xls(Xls::new(cursor).map_err(calamine::Error::from)?),
            EnumExcelType::Xlsx => Sheets::Xlsx(Xlsx::new(cursor).map_err(calamine::Error::from)?),
        };

        Ok(Self {
            path_excel: None,
            excel_type,
            v_bytes,
            workbook,
            options: SpecReadOptions::default(),
            rich_text: None,
            l_reports: Vec::new(),
        })
    }

    pub fn with_options(mut self, options: SpecReadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn excel_path(&self) -> Option<&Path> {
        self.path_excel.as_deref()
    }

    pub fn excel_type(&self) -> EnumExcelType {
        self.excel_type
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// Return immutable snapshot of per-call read reports.
    pub fn report(&self) -> Vec<SpecReadReport> {
        self.l_reports.clone()
    }

    /// Read the sheet at zero-based `sheet_index` into records.
    pub fn sheet_to_objects<T: SheetRecord + Default>(&mut self, sheet_index: usize) -> Result<Vec<T>> {
        let l_sheet_names = self.sheet_names();
        let Some(sheet_name) = l_sheet_names.get(sheet_index) else {
            return Err(XlsxObjectError::SheetIndexOutOfRange(sheet_index));
        };
        self.read_sheet(sheet_name)
    }

    /// Read the sheet called `sheet_name` into records.
    ///
    /// A workbook without that sheet yields no records.
    pub fn sheet_to_objects_by_name<T: SheetRecord + Default>(
        &mut self,
        sheet_name: &str,
    ) -> Result<Vec<T>> {
        if !self.sheet_names().iter().any(|val| val == sheet_name) {
            let mut report = SpecReadReport {
                sheet_name: sheet_name.to_string(),
                ..Default::default()
            };
            report.warn(format!("Sheet \"{sheet_name}\" not found."));
            log::debug!("Sheet {sheet_name} not found; no records read");
            self.l_reports.push(report);
            return Ok(Vec::new());
        }
        self.read_sheet(sheet_name)
    }

    fn read_sheet<T: SheetRecord + Default>(&mut self, sheet_name: &str) -> Result<Vec<T>> {
        let range = self.workbook.worksheet_range(sheet_name)?;
        let layout = T::layout();
        let l_columns = T::columns();
        let mut report = SpecReadReport {
            sheet_name: sheet_name.to_string(),
            ..Default::default()
        };

        let (Some((n_row_first, n_col_first)), Some((n_row_last, n_col_last))) =
            (range.start(), range.end())
        else {
            return Err(XlsxObjectError::HeaderRowMissing(layout.header_row_index));
        };
        let n_row_header = layout.header_row_index;
        if n_row_header < n_row_first as usize || n_row_header > n_row_last as usize {
            return Err(XlsxObjectError::HeaderRowMissing(n_row_header));
        }

        let l_header_cells: Vec<(usize, EnumCellValue)> = (n_col_first as usize
            ..=n_col_last as usize)
            .map(|col_idx| (col_idx, derive_cell_value(&range, n_row_header, col_idx)))
            .collect();
        let dict_header_columns = derive_header_columns(
            l_header_cells.iter().map(|(col_idx, value)| (*col_idx, value)),
            n_row_header,
        )?;
        let l_bindings: Vec<(usize, &SpecColumn<T>)> = l_columns
            .iter()
            .map(|column| Ok((resolve_column_index(column, &dict_header_columns)?, column)))
            .collect::<Result<_>>()?;

        if l_columns.iter().any(|column| column.if_rich_text) {
            self.ensure_rich_text()?;
        }
        let rich_text = self.rich_text.as_ref();

        let n_row_end = derive_end_row(&layout, n_row_last as usize);
        let mut l_records = Vec::new();
        for row_idx in layout.start_index..=n_row_end {
            let mut record = T::default();
            let mut if_any_value = false;
            for (col_idx, column) in &l_bindings {
                let mut value = derive_cell_value(&range, row_idx, *col_idx);
                if value.is_blank() {
                    continue;
                }
                if_any_value = true;
                if column.if_rich_text {
                    let c_text = String::from_cell_value(&value).unwrap_or_default();
                    let tup_pos = (u32::try_from(row_idx), u32::try_from(*col_idx));
                    let c_html = match (rich_text, tup_pos) {
                        (Some(index), (Ok(row_num), Ok(col_num))) => {
                            index.to_html(sheet_name, row_num, col_num, &c_text)
                        }
                        _ => render_plain_text_html(&c_text),
                    };
                    value = EnumCellValue::String(c_html);
                }

                if column.set(&mut record, &value) {
                    report.cells_converted += 1;
                    continue;
                }
                match self.options.coercion {
                    EnumCoercionMode::Strict => {
                        return Err(XlsxObjectError::CellCoercion {
                            row: row_idx,
                            col: *col_idx,
                            field: column.field_name.to_string(),
                        });
                    }
                    EnumCoercionMode::Lenient => {
                        report.cells_defaulted += 1;
                        report.warn(format!(
                            "Cell at row {} column {} kept the default of field \"{}\": {value:?}",
                            row_idx + 1,
                            col_idx + 1,
                            column.field_name
                        ));
                    }
                }
            }
            if !if_any_value && self.options.if_skip_empty_rows {
                continue;
            }
            l_records.push(record);
        }

        report.rows_read = l_records.len();
        for msg in &report.warnings {
            log::warn!("{sheet_name}: {msg}");
        }
        log::debug!(
            "Read {} records from sheet {sheet_name} ({} cells converted, {} defaulted)",
            report.rows_read,
            report.cells_converted,
            report.cells_defaulted
        );
        self.l_reports.push(report);
        Ok(l_records)
    }

    fn ensure_rich_text(&mut self) -> Result<()> {
        if self.rich_text.is_some() {
            return Ok(());
        }
        let index = match self.excel_type {
            EnumExcelType::Xlsx => RichTextIndex::from_xlsx_bytes(&self.v_bytes)?,
            EnumExcelType::Xls => RichTextIndex::default(),
        };
        log::debug!("Indexed {} shared strings for rich text", index.len());
        self.rich_text = Some(index);
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region CellConversion

fn derive_cell_value(range: &Range<Data>, row_idx: usize, col_idx: usize) -> EnumCellValue {
    let (Ok(row_num), Ok(col_num)) = (u32::try_from(row_idx), u32::try_from(col_idx)) else {
        return EnumCellValue::None;
    };
    match range.get_value((row_num, col_num)) {
        Some(data) => convert_data_to_cell_value(data),
        None => EnumCellValue::None,
    }
}

/// Normalize one decoded cell.
fn convert_data_to_cell_value(data: &Data) -> EnumCellValue {
    match data {
        Data::Empty => EnumCellValue::None,
        Data::String(val) => EnumCellValue::String(val.clone()),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::Int(val) => EnumCellValue::Number(*val as f64),
        Data::Bool(val) => EnumCellValue::Boolean(*val),
        Data::DateTime(val) => match val.as_datetime() {
            Some(dt) => EnumCellValue::DateTime(dt),
            None => EnumCellValue::Number(val.as_f64()),
        },
        Data::DateTimeIso(val) | Data::DurationIso(val) => EnumCellValue::String(val.clone()),
        Data::Error(err) => EnumCellValue::Error(derive_error_code(err)),
    }
}

/// BIFF code of a cell error.
fn derive_error_code(err: &CellErrorType) -> u8 {
    match err {
        CellErrorType::Null => 0x00,
        CellErrorType::Div0 => 0x07,
        CellErrorType::Value => 0x0F,
        CellErrorType::Ref => 0x17,
        CellErrorType::Name => 0x1D,
        CellErrorType::Num => 0x24,
        CellErrorType::NA => 0x2A,
        CellErrorType::GettingData => 0x2B,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
