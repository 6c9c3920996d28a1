//! Declarative binding between record fields and sheet columns.

use std::fmt;

use crate::spec::{EnumCellValue, SpecCellStyle, SpecHeaderStyle, SpecSheetLayout};

/// A record type that maps to rows of a sheet.
///
/// ```ignore
/// #[derive(Default)]
/// struct Location {
///     id: u32,
///     name: String,
/// }
///
/// impl SheetRecord for Location {
///     fn columns() -> Vec<SpecColumn<Self>> {
///         vec![
///             record_column!(Location, id).with_index(0),
///             record_column!(Location, name).with_index(1).with_name("Name"),
///         ]
///     }
/// }
/// ```
pub trait SheetRecord: Sized {
    /// Header/data row layout; header on row 0 and data from row 1 by default.
    fn layout() -> SpecSheetLayout {
        SpecSheetLayout::default()
    }

    /// Column bindings in declaration order.
    fn columns() -> Vec<SpecColumn<Self>>;
}

/// Reads a field as a cell value.
pub type FnCellGet<T> = fn(&T) -> EnumCellValue;
/// Writes a cell value into a field; returns `false` when not convertible.
pub type FnCellSet<T> = fn(&mut T, &EnumCellValue) -> bool;

/// Binding of one record field to one sheet column.
pub struct SpecColumn<T> {
    /// Record field name, used as header fallback.
    pub field_name: &'static str,
    /// Zero-based column index.
    pub index: Option<usize>,
    /// Header text.
    pub name: Option<String>,
    /// Read the cell as rich text HTML.
    pub if_rich_text: bool,
    /// Exclude this column when drawing.
    pub if_drawing_ignore: bool,
    /// Header cell style and column width.
    pub style_header: Option<SpecHeaderStyle>,
    /// Data cell style.
    pub style_cell: Option<SpecCellStyle>,
    /// Data cell style on odd rows.
    pub style_alternate: Option<SpecCellStyle>,
    fn_get: FnCellGet<T>,
    fn_set: FnCellSet<T>,
}

impl<T> SpecColumn<T> {
    /// Bind `field_name` through explicit accessors.
    pub fn new(field_name: &'static str, fn_get: FnCellGet<T>, fn_set: FnCellSet<T>) -> Self {
        Self {
            field_name,
            index: None,
            name: None,
            if_rich_text: false,
            if_drawing_ignore: false,
            style_header: None,
            style_cell: None,
            style_alternate: None,
            fn_get,
            fn_set,
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_rich_text(mut self) -> Self {
        self.if_rich_text = true;
        self
    }

    pub fn with_drawing_ignore(mut self) -> Self {
        self.if_drawing_ignore = true;
        self
    }

    pub fn with_header_style(mut self, style: SpecHeaderStyle) -> Self {
        self.style_header = Some(style);
        self
    }

    pub fn with_cell_style(mut self, style: SpecCellStyle) -> Self {
        self.style_cell = Some(style);
        self
    }

    pub fn with_alternate_style(mut self, style: SpecCellStyle) -> Self {
        self.style_alternate = Some(style);
        self
    }

    /// Header text: explicit name when non-empty, field name otherwise.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.field_name,
        }
    }

    /// Read the bound field.
    pub fn get(&self, record: &T) -> EnumCellValue {
        (self.fn_get)(record)
    }

    /// Store `value` into the bound field; `false` when not convertible.
    pub fn set(&self, record: &mut T, value: &EnumCellValue) -> bool {
        (self.fn_set)(record, value)
    }
}

impl<T> fmt::Debug for SpecColumn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecColumn")
            .field("field_name", &self.field_name)
            .field("index", &self.index)
            .field("name", &self.name)
            .field("if_rich_text", &self.if_rich_text)
            .field("if_drawing_ignore", &self.if_drawing_ignore)
            .finish_non_exhaustive()
    }
}

/// Bind a record field to a column through [`crate::FromCellValue`] and
/// [`crate::IntoCellValue`].
#[macro_export]
macro_rules! record_column {
    ($ty:ty, $field:ident) => {
        $crate::SpecColumn::<$ty>::new(
            stringify!($field),
            |record: &$ty| $crate::IntoCellValue::to_cell_value(&record.$field),
            |record: &mut $ty, value: &$crate::EnumCellValue| {
                match $crate::FromCellValue::from_cell_value(value) {
                    Some(val) => {
                        record.$field = val;
                        true
                    }
                    None => false,
                }
            },
        )
    };
}
