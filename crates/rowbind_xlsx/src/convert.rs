//! Typed cell coercion in both directions.
//!
//! Reading never fails hard here: a `None` from [`FromCellValue`] means the
//! cell is not convertible and the bound field keeps its default value.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use url::Url;
use uuid::Uuid;

use crate::spec::EnumCellValue;

/// Conversion from a normalized cell value into a field type.
pub trait FromCellValue: Sized {
    /// Convert `value`, returning `None` when it cannot represent `Self`.
    fn from_cell_value(value: &EnumCellValue) -> Option<Self>;
}

/// Conversion from a field value into a normalized cell value.
pub trait IntoCellValue {
    /// Render `self` as a cell value.
    fn to_cell_value(&self) -> EnumCellValue;
}

////////////////////////////////////////////////////////////////////////////////
// #region ExcelSerialDates

fn derive_excel_epoch(serial: f64) -> Option<NaiveDateTime> {
    // Serials below 60 precede Excel's phantom 1900-02-29.
    let date = if serial < 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    date.and_hms_opt(0, 0, 0)
}

/// Convert an Excel 1900-system serial number to a date/time.
pub fn convert_excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = derive_excel_epoch(serial)?;
    let n_millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(n_millis))
}

/// Convert a date/time to an Excel 1900-system serial number.
pub fn convert_datetime_to_excel_serial(value: &NaiveDateTime) -> f64 {
    let epoch_modern = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let n_days = (*value - epoch_modern).num_milliseconds() as f64 / 86_400_000.0;
    if n_days < 61.0 { n_days - 1.0 } else { n_days }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DisplayText

/// Render a number the way a spreadsheet displays it: integers without `.0`.
pub fn format_number_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Display text of an Excel error code.
pub fn derive_error_text(code: u8) -> &'static str {
    match code {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERROR!",
    }
}

fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    let value = text.trim();
    for c_fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, c_fmt) {
            return Some(dt);
        }
    }
    for c_fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, c_fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn convert_cell_to_f64(value: &EnumCellValue) -> Option<f64> {
    match value {
        EnumCellValue::Number(val) => Some(*val),
        EnumCellValue::String(val) => val.trim().parse::<f64>().ok(),
        EnumCellValue::DateTime(val) => Some(convert_datetime_to_excel_serial(val)),
        EnumCellValue::None | EnumCellValue::Boolean(_) | EnumCellValue::Error(_) => None,
    }
}

fn convert_cell_to_text(value: &EnumCellValue) -> Option<&str> {
    match value {
        EnumCellValue::String(val) if !val.is_empty() => Some(val.as_str()),
        _ => None,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Numbers

macro_rules! impl_cell_value_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromCellValue for $ty {
                fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
                    convert_cell_to_f64(value).map(|val| val as $ty)
                }
            }

            impl IntoCellValue for $ty {
                fn to_cell_value(&self) -> EnumCellValue {
                    EnumCellValue::Number(*self as f64)
                }
            }
        )*
    };
}

impl_cell_value_number!(i8, i16, i32, i64, isize, u16, u32, u64, usize, f32, f64);

impl FromCellValue for u8 {
    fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
        match value {
            EnumCellValue::Error(code) => Some(*code),
            _ => convert_cell_to_f64(value).map(|val| val as u8),
        }
    }
}

impl IntoCellValue for u8 {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::Number(f64::from(*self))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ScalarTypes

impl FromCellValue for bool {
    fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
        match value {
            EnumCellValue::Boolean(val) => Some(*val),
            EnumCellValue::Number(val) => Some(*val != 0.0),
            EnumCellValue::String(val) => match val.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl IntoCellValue for bool {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::Boolean(*self)
    }
}

impl FromCellValue for String {
    fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
        match value {
            EnumCellValue::None => None,
            EnumCellValue::String(val) => Some(val.clone()),
            EnumCellValue::Number(val) => Some(format_number_text(*val)),
            EnumCellValue::Boolean(val) => Some(if *val { "TRUE" } else { "FALSE" }.to_string()),
            EnumCellValue::DateTime(val) => Some(val.format("%Y-%m-%d %H:%M:%S").to_string()),
            EnumCellValue::Error(code) => Some(derive_error_text(*code).to_string()),
        }
    }
}

impl IntoCellValue for String {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::String(self.clone())
    }
}

impl IntoCellValue for str {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::String(self.to_string())
    }
}

impl FromCellValue for char {
    fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
        convert_cell_to_text(value).and_then(|val| val.chars().next())
    }
}

impl IntoCellValue for char {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::String(self.to_string())
    }
}

impl FromCellValue for Vec<char> {
    fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
        convert_cell_to_text(value).map(|val| val.chars().collect())
    }
}

impl IntoCellValue for Vec<char> {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::String(self.iter().collect())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DatesAndIdentifiers

impl FromCellValue for NaiveDateTime {
    fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
        match value {
            EnumCellValue::DateTime(val) => Some(*val),
            EnumCellValue::Number(val) => convert_excel_serial_to_datetime(*val),
            EnumCellValue::String(val) => parse_datetime_text(val),
            _ => None,
        }
    }
}

impl IntoCellValue for NaiveDateTime {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::DateTime(*self)
    }
}

impl FromCellValue for NaiveDate {
    fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
        NaiveDateTime::from_cell_value(value).map(|val| val.date())
    }
}

impl IntoCellValue for NaiveDate {
    fn to_cell_value(&self) -> EnumCellValue {
        match self.and_hms_opt(0, 0, 0) {
            Some(val) => EnumCellValue::DateTime(val),
            None => EnumCellValue::None,
        }
    }
}

impl FromCellValue for Uuid {
    /// Unparsable text yields the nil UUID rather than a failure.
    fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
        convert_cell_to_text(value).map(|val| Uuid::parse_str(val.trim()).unwrap_or(Uuid::nil()))
    }
}

impl IntoCellValue for Uuid {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::String(self.hyphenated().to_string())
    }
}

impl FromCellValue for Url {
    fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
        convert_cell_to_text(value).and_then(|val| Url::parse(val.trim()).ok())
    }
}

impl IntoCellValue for Url {
    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::String(self.as_str().to_string())
    }
}

impl FromCellValue for EnumCellValue {
    fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl IntoCellValue for EnumCellValue {
    fn to_cell_value(&self) -> EnumCellValue {
        self.clone()
    }
}

impl<T: FromCellValue> FromCellValue for Option<T> {
    fn from_cell_value(value: &EnumCellValue) -> Option<Self> {
        if value.is_blank() {
            return Some(None);
        }
        T::from_cell_value(value).map(Some)
    }
}

impl<T: IntoCellValue> IntoCellValue for Option<T> {
    fn to_cell_value(&self) -> EnumCellValue {
        match self {
            Some(val) => val.to_cell_value(),
            None => EnumCellValue::None,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
