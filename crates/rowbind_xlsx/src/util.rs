//! Stateless helpers shared by the object reader and the drawing writer.

use std::collections::BTreeMap;

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_WIDTH_EXCEL_COLUMN_MAX,
    TUP_EXCEL_ILLEGAL,
};
use crate::convert::format_number_text;
use crate::record::SpecColumn;
use crate::spec::{EnumCellValue, Result, SpecSheetLayout, XlsxObjectError};

////////////////////////////////////////////////////////////////////////////////
// #region HeaderResolution

/// Normalize header text for matching: trim, tabs and line feeds to spaces,
/// carriage returns dropped, lowercase.
pub fn normalize_header_text(text: &str) -> String {
    text.trim()
        .replace('\t', " ")
        .replace('\r', "")
        .replace('\n', " ")
        .to_lowercase()
}

/// Header text of one header cell, if it has any.
pub fn derive_header_text(value: &EnumCellValue) -> Option<String> {
    let c_text = match value {
        EnumCellValue::String(val) => val.clone(),
        EnumCellValue::Number(val) => format_number_text(*val),
        EnumCellValue::Boolean(val) => if *val { "TRUE" } else { "FALSE" }.to_string(),
        EnumCellValue::None | EnumCellValue::DateTime(_) | EnumCellValue::Error(_) => {
            return None;
        }
    };
    let c_normalized = normalize_header_text(&c_text);
    if c_normalized.is_empty() {
        None
    } else {
        Some(c_normalized)
    }
}

/// Map normalized header text to its column.
///
/// `cells` yields `(column, value)` for the header row `row_idx`. Blank
/// headers are skipped; repeated headers fail with
/// [`XlsxObjectError::DuplicateColumn`].
pub fn derive_header_columns<'a, I>(cells: I, row_idx: usize) -> Result<BTreeMap<String, usize>>
where
    I: IntoIterator<Item = (usize, &'a EnumCellValue)>,
{
    let mut dict_col_by_name = BTreeMap::new();
    for (col_idx, value) in cells {
        let Some(c_name) = derive_header_text(value) else {
            continue;
        };
        if let Some(col_first) = dict_col_by_name.get(&c_name) {
            return Err(XlsxObjectError::DuplicateColumn {
                name: c_name,
                col_first: *col_first,
                col_second: col_idx,
                row: row_idx,
            });
        }
        dict_col_by_name.insert(c_name, col_idx);
    }
    Ok(dict_col_by_name)
}

/// Resolve the sheet column of one bound field.
///
/// Order: explicit index present in the header, explicit name, then the field
/// name when neither index nor name is declared.
pub fn resolve_column_index<T>(
    column: &SpecColumn<T>,
    header_columns: &BTreeMap<String, usize>,
) -> Result<usize> {
    if let Some(n_idx) = column.index
        && header_columns.values().any(|val| *val == n_idx)
    {
        return Ok(n_idx);
    }

    let c_name = column.name.as_deref().filter(|val| !val.is_empty());
    if let Some(name) = c_name
        && let Some(n_idx) = header_columns.get(&normalize_header_text(name))
    {
        return Ok(*n_idx);
    }

    if c_name.is_none()
        && column.index.is_none()
        && let Some(n_idx) = header_columns.get(&normalize_header_text(column.field_name))
    {
        return Ok(*n_idx);
    }

    Err(XlsxObjectError::InvalidColumn(
        column.display_name().to_string(),
    ))
}

/// Last data row to read (inclusive).
pub fn derive_end_row(layout: &SpecSheetLayout, last_row: usize) -> usize {
    match layout.end_index {
        Some(n_end) if n_end >= 1 && n_end <= last_row => n_end,
        _ => last_row,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Clamp a declared column width to Excel's maximum.
pub fn clamp_column_width(width: usize) -> usize {
    usize::min(width, N_WIDTH_EXCEL_COLUMN_MAX)
}

pub fn cast_row_num(value: usize) -> Result<u32> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(XlsxObjectError::RowLimitExceeded(value));
    }
    u32::try_from(value).map_err(|_| XlsxObjectError::RowLimitExceeded(value))
}

pub fn cast_col_num(value: usize) -> Result<u16> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(XlsxObjectError::ColumnLimitExceeded(value));
    }
    u16::try_from(value).map_err(|_| XlsxObjectError::ColumnLimitExceeded(value))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
