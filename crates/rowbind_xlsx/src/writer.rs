//! Drawing factory: typed records into styled worksheet rows.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatPattern, Workbook, Worksheet};

use crate::color::parse_color;
use crate::conf::{N_FONT_WEIGHT_BOLD, derive_default_cell_style};
use crate::record::{SheetRecord, SpecColumn};
use crate::spec::{
    EnumCellValue, EnumExcelType, EnumFillPattern, EnumHorizontalAlign, EnumVerticalAlign, Result,
    SpecCellStyle, SpecDrawOptions, SpecDrawReport, XlsxObjectError,
};
use crate::util::{cast_col_num, cast_row_num, clamp_column_width, sanitize_sheet_name};

/// Drawn sheet, keyed in the writer by its lowercased name.
#[derive(Debug, Clone)]
struct SpecSheetCursor {
    sheet_name: String,
    n_row_next: usize,
}

/// Stateful workbook writer.
///
/// Sheets are buffered in memory until [`Self::close`] (or drop) saves them.
pub struct XlsxDrawingWriter {
    path_excel: Option<PathBuf>,
    workbook: Workbook,
    options: SpecDrawOptions,
    dict_sheet_cursors: BTreeMap<String, SpecSheetCursor>,
    l_reports: Vec<SpecDrawReport>,
    if_closed: bool,
}

impl XlsxDrawingWriter {
    /// Create a writer bound to an `.xlsx` output path.
    ///
    /// Missing parent directories are created up front.
    pub fn new(path_excel: impl AsRef<Path>) -> Result<Self> {
        let path_excel = path_excel.as_ref();
        if path_excel.as_os_str().is_empty() {
            return Err(XlsxObjectError::EmptyPath);
        }
        let excel_type = EnumExcelType::from_path(path_excel)?;
        if excel_type != EnumExcelType::Xlsx {
            return Err(XlsxObjectError::UnsupportedOutput(excel_type));
        }
        if let Some(dir_parent) = path_excel.parent()
            && !dir_parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir_parent)?;
        }

        log::debug!("Drawing workbook {}", path_excel.display());
        Ok(Self::build(Some(path_excel.to_path_buf())))
    }

    /// Create a writer with no output path; use [`Self::save_to_buffer`].
    pub fn in_memory() -> Self {
        Self::build(None)
    }

    fn build(path_excel: Option<PathBuf>) -> Self {
        Self {
            path_excel,
            workbook: Workbook::new(),
            options: SpecDrawOptions::default(),
            dict_sheet_cursors: BTreeMap::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    pub fn with_options(mut self, options: SpecDrawOptions) -> Self {
        self.options = options;
        self
    }

    pub fn excel_path(&self) -> Option<&Path> {
        self.path_excel.as_deref()
    }

    pub fn excel_type(&self) -> EnumExcelType {
        EnumExcelType::Xlsx
    }

    /// Return immutable snapshot of per-call draw reports.
    pub fn report(&self) -> Vec<SpecDrawReport> {
        self.l_reports.clone()
    }

    /// Draw `records` into `sheet_name`.
    ///
    /// A new sheet gets the header row; an existing one only receives rows.
    /// Sheet names match case-insensitively, as in Excel, and an existing
    /// sheet keeps the name it was created with. Rows start at the layout
    /// start index, or after the last drawn row when
    /// [`SpecDrawOptions::if_keep_sheet_cursor`] is set.
    pub fn draw<T: SheetRecord>(&mut self, sheet_name: &str, records: &[T]) -> Result<()> {
        if self.if_closed {
            return Err(XlsxObjectError::Closed);
        }

        let layout = T::layout();
        let c_sheet_name = sanitize_sheet_name(sheet_name, "_");
        let c_sheet_key = c_sheet_name.to_lowercase();
        let cursor = self.dict_sheet_cursors.get(&c_sheet_key).cloned();
        let c_sheet_name = match &cursor {
            Some(val) => val.sheet_name.clone(),
            None => c_sheet_name,
        };
        let mut report = SpecDrawReport {
            sheet_name: c_sheet_name.clone(),
            ..Default::default()
        };
        let l_drawings = derive_column_drawings(T::columns(), &self.options, &mut report)?;
        report.n_columns = l_drawings.len();

        let n_row_start = match &cursor {
            Some(val) if self.options.if_keep_sheet_cursor => val.n_row_next,
            _ => layout.start_index,
        };
        let n_row_end = n_row_start + records.len();
        if !records.is_empty() {
            cast_row_num(n_row_end - 1)?;
        }

        let worksheet = match &cursor {
            Some(_) => self.workbook.worksheet_from_name(&c_sheet_name)?,
            None => {
                let worksheet = self.workbook.add_worksheet().set_name(&c_sheet_name)?;
                draw_header(worksheet, &l_drawings, layout.header_row_index, &self.options)?;
                report.if_header_drawn = true;
                worksheet
            }
        };

        for (n_offset, record) in records.iter().enumerate() {
            let row_idx = n_row_start + n_offset;
            let row_num = cast_row_num(row_idx)?;
            let mut height_row = None;
            for drawing in &l_drawings {
                let fmt_draw = drawing.derive_format(row_idx);
                let value = drawing.column.get(record);
                write_cell_with_format(worksheet, row_num, drawing.col_num, &value, fmt_draw)?;
                height_row = height_row.or(fmt_draw.height);
            }
            if let Some(val) = height_row {
                worksheet.set_row_height(row_num, val)?;
            }
        }

        let n_row_next = usize::max(n_row_end, cursor.map_or(0, |val| val.n_row_next));
        self.dict_sheet_cursors.insert(
            c_sheet_key,
            SpecSheetCursor {
                sheet_name: c_sheet_name.clone(),
                n_row_next,
            },
        );

        report.row_start = n_row_start;
        report.row_end_exclusive = n_row_end;
        for msg in &report.warnings {
            log::warn!("{c_sheet_name}: {msg}");
        }
        log::debug!(
            "Drew {} records into sheet {c_sheet_name} (rows {n_row_start}..{n_row_end})",
            records.len()
        );
        self.l_reports.push(report);
        Ok(())
    }

    /// Save the workbook to its output path. Idempotent; a memory-only writer
    /// only stops accepting draws.
    pub fn close(&mut self) -> Result<()> {
        if self.if_closed {
            return Ok(());
        }
        if let Some(path_excel) = &self.path_excel {
            self.workbook.save(path_excel)?;
            log::debug!("Saved workbook {}", path_excel.display());
        }
        self.if_closed = true;
        Ok(())
    }

    /// Encode the workbook as `.xlsx` bytes.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>> {
        Ok(self.workbook.save_to_buffer()?)
    }

    /// Encode the workbook as `.xlsx` into `writer`.
    pub fn save_to_writer<W: Write + Seek + Send>(&mut self, writer: W) -> Result<()> {
        self.workbook.save_to_writer(writer)?;
        Ok(())
    }
}

impl Drop for XlsxDrawingWriter {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("Failed to save workbook on drop: {err}");
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region ColumnDrawing

/// Formats of one style, with a date variant for date/time cells.
#[derive(Debug, Clone)]
struct SpecDrawFormat {
    fmt_value: Format,
    fmt_date: Format,
    height: Option<f64>,
}

impl SpecDrawFormat {
    fn from_style(
        style: Option<&SpecCellStyle>,
        options: &SpecDrawOptions,
        report: &mut SpecDrawReport,
    ) -> Self {
        let style = match style {
            Some(val) => derive_default_cell_style().merge(val),
            None => derive_default_cell_style(),
        };
        let fmt_value = derive_rust_xlsx_format(&style, report);
        let fmt_date = match style.num_format {
            Some(_) => fmt_value.clone(),
            None => fmt_value.clone().set_num_format(options.date_num_format.as_str()),
        };
        Self {
            fmt_value,
            fmt_date,
            height: style.height.filter(|val| *val > 0.0),
        }
    }
}

/// Drawing plan of one bound column.
struct SpecColumnDrawing<T> {
    column: SpecColumn<T>,
    col_num: u16,
    width: Option<usize>,
    fmt_header: SpecDrawFormat,
    fmt_cell: SpecDrawFormat,
    fmt_alternate: Option<SpecDrawFormat>,
}

impl<T> SpecColumnDrawing<T> {
    fn derive_format(&self, row_idx: usize) -> &SpecDrawFormat {
        match &self.fmt_alternate {
            Some(val) if row_idx % 2 == 1 => val,
            _ => &self.fmt_cell,
        }
    }
}

fn derive_column_drawings<T>(
    l_columns: Vec<SpecColumn<T>>,
    options: &SpecDrawOptions,
    report: &mut SpecDrawReport,
) -> Result<Vec<SpecColumnDrawing<T>>> {
    let mut set_cols_idx = BTreeSet::new();
    let mut l_drawings = Vec::with_capacity(l_columns.len());

    for column in l_columns {
        if column.if_drawing_ignore {
            continue;
        }
        let n_idx = column
            .index
            .ok_or_else(|| XlsxObjectError::ColumnIndexMissing(column.field_name.to_string()))?;
        if !set_cols_idx.insert(n_idx) {
            return Err(XlsxObjectError::DuplicateColumnIndex(n_idx));
        }

        let width = match column.style_header.as_ref().and_then(|val| val.column_width) {
            Some(val) if val != clamp_column_width(val) => {
                report.warn(format!(
                    "Column width {val} of field \"{}\" clamped to {}.",
                    column.field_name,
                    clamp_column_width(val)
                ));
                Some(clamp_column_width(val))
            }
            other => other,
        };
        let fmt_header = SpecDrawFormat::from_style(
            column.style_header.as_ref().map(|val| &val.style),
            options,
            report,
        );
        let fmt_cell = SpecDrawFormat::from_style(column.style_cell.as_ref(), options, report);
        let fmt_alternate = column
            .style_alternate
            .as_ref()
            .map(|val| SpecDrawFormat::from_style(Some(val), options, report));

        l_drawings.push(SpecColumnDrawing {
            col_num: cast_col_num(n_idx)?,
            column,
            width,
            fmt_header,
            fmt_cell,
            fmt_alternate,
        });
    }

    l_drawings.sort_by_key(|val| val.col_num);
    Ok(l_drawings)
}

fn draw_header<T>(
    worksheet: &mut Worksheet,
    l_drawings: &[SpecColumnDrawing<T>],
    header_row_index: usize,
    options: &SpecDrawOptions,
) -> Result<()> {
    let row_num = cast_row_num(header_row_index)?;
    let mut height_row = None;
    for drawing in l_drawings {
        worksheet.write_string_with_format(
            row_num,
            drawing.col_num,
            drawing.column.display_name(),
            &drawing.fmt_header.fmt_value,
        )?;
        if let Some(val) = drawing.width {
            worksheet.set_column_width(drawing.col_num, val as f64)?;
        }
        height_row = height_row.or(drawing.fmt_header.height);
    }
    if let Some(val) = height_row {
        worksheet.set_row_height(row_num, val)?;
    }
    if options.if_freeze_header {
        worksheet.set_freeze_panes(cast_row_num(header_row_index + 1)?, 0)?;
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellWriting

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_num: u32,
    col_num: u16,
    value: &EnumCellValue,
    fmt_draw: &SpecDrawFormat,
) -> Result<()> {
    let format = &fmt_draw.fmt_value;
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(row_num, col_num, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(row_num, col_num, val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(row_num, col_num, *val, format)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean_with_format(row_num, col_num, *val, format)?;
        }
        EnumCellValue::DateTime(val) => {
            worksheet.write_datetime_with_format(row_num, col_num, val, &fmt_draw.fmt_date)?;
        }
        EnumCellValue::Error(code) => {
            worksheet.write_number_with_format(row_num, col_num, f64::from(*code), format)?;
        }
    }
    Ok(())
}

/// Translate a cell style into a `rust_xlsxwriter` format.
///
/// Unparsable colors are skipped with a report warning; the fill pattern is
/// applied only when a fill color parses.
fn derive_rust_xlsx_format(style: &SpecCellStyle, report: &mut SpecDrawReport) -> Format {
    let mut format = Format::new();

    if let Some(val) = style.text_align {
        format = format.set_align(derive_format_align(val));
    }
    if let Some(val) = style.vertical_align {
        format = format.set_align(derive_format_valign(val));
    }

    let mut if_fill = false;
    if let Some(val) = derive_format_color(style.background_color.as_deref(), report) {
        format = format.set_background_color(val);
        if_fill = true;
    }
    if let Some(val) = derive_format_color(style.foreground_color.as_deref(), report) {
        format = format.set_foreground_color(val);
        if_fill = true;
    }
    if if_fill && let Some(val) = style.fill_pattern {
        format = format.set_pattern(derive_format_pattern(val));
    }

    if style.has_font() {
        format = derive_font_format(format, style, report);
    }

    if let Some(val) = style.num_format.as_deref().filter(|val| !val.is_empty()) {
        format = format.set_num_format(val);
    }

    format
}

fn derive_font_format(
    mut format: Format,
    style: &SpecCellStyle,
    report: &mut SpecDrawReport,
) -> Format {
    if style.font_weight.is_some_and(|val| val >= N_FONT_WEIGHT_BOLD) {
        format = format.set_bold();
    }
    if let Some(val) = style.font_family.as_deref().filter(|val| !val.is_empty()) {
        format = format.set_font_name(val);
    }
    if let Some(val) = style.font_size.filter(|val| *val > 0.0) {
        format = format.set_font_size(val);
    }
    if style.italic.unwrap_or(false) {
        format = format.set_italic();
    }
    if let Some(val) = derive_format_color(style.text_color.as_deref(), report) {
        format = format.set_font_color(val);
    }
    format
}

fn derive_format_color(text: Option<&str>, report: &mut SpecDrawReport) -> Option<Color> {
    let text = text.filter(|val| !val.trim().is_empty())?;
    match parse_color(text) {
        Some(val) => Some(Color::RGB(val)),
        None => {
            report.warn(format!("Unrecognized color \"{text}\" ignored."));
            None
        }
    }
}

fn derive_format_align(align: EnumHorizontalAlign) -> FormatAlign {
    match align {
        EnumHorizontalAlign::General => FormatAlign::General,
        EnumHorizontalAlign::Left => FormatAlign::Left,
        EnumHorizontalAlign::Center => FormatAlign::Center,
        EnumHorizontalAlign::Right => FormatAlign::Right,
        EnumHorizontalAlign::Fill => FormatAlign::Fill,
        EnumHorizontalAlign::Justify => FormatAlign::Justify,
        EnumHorizontalAlign::CenterAcross => FormatAlign::CenterAcross,
        EnumHorizontalAlign::Distributed => FormatAlign::Distributed,
    }
}

fn derive_format_valign(align: EnumVerticalAlign) -> FormatAlign {
    match align {
        EnumVerticalAlign::Top => FormatAlign::Top,
        EnumVerticalAlign::Center => FormatAlign::VerticalCenter,
        EnumVerticalAlign::Bottom => FormatAlign::Bottom,
        EnumVerticalAlign::Justify => FormatAlign::VerticalJustify,
        EnumVerticalAlign::Distributed => FormatAlign::VerticalDistributed,
    }
}

fn derive_format_pattern(pattern: EnumFillPattern) -> FormatPattern {
    match pattern {
        EnumFillPattern::None => FormatPattern::None,
        EnumFillPattern::Solid => FormatPattern::Solid,
        EnumFillPattern::MediumGray => FormatPattern::MediumGray,
        EnumFillPattern::DarkGray => FormatPattern::DarkGray,
        EnumFillPattern::LightGray => FormatPattern::LightGray,
        EnumFillPattern::DarkHorizontal => FormatPattern::DarkHorizontal,
        EnumFillPattern::DarkVertical => FormatPattern::DarkVertical,
        EnumFillPattern::DarkDown => FormatPattern::DarkDown,
        EnumFillPattern::DarkUp => FormatPattern::DarkUp,
        EnumFillPattern::DarkGrid => FormatPattern::DarkGrid,
        EnumFillPattern::DarkTrellis => FormatPattern::DarkTrellis,
        EnumFillPattern::LightHorizontal => FormatPattern::LightHorizontal,
        EnumFillPattern::LightVertical => FormatPattern::LightVertical,
        EnumFillPattern::LightDown => FormatPattern::LightDown,
        EnumFillPattern::LightUp => FormatPattern::LightUp,
        EnumFillPattern::LightGrid => FormatPattern::LightGrid,
        EnumFillPattern::LightTrellis => FormatPattern::LightTrellis,
        EnumFillPattern::Gray125 => FormatPattern::Gray125,
        EnumFillPattern::Gray0625 => FormatPattern::Gray0625,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use calamine::{Data, Reader, Xlsx};
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::SpecHeaderStyle;

    #[derive(Debug, Default)]
    struct Shipment {
        code: String,
        weight: f64,
        fragile: bool,
        memo: String,
    }

    impl SheetRecord for Shipment {
        fn columns() -> Vec<SpecColumn<Self>> {
            vec![
                crate::record_column!(Shipment, weight).with_index(2),
                crate::record_column!(Shipment, code)
                    .with_index(0)
                    .with_name("Code")
                    .with_header_style(SpecHeaderStyle {
                        style: SpecCellStyle {
                            font_weight: Some(700),
                            ..Default::default()
                        },
                        column_width: Some(400),
                    }),
                crate::record_column!(Shipment, fragile)
                    .with_index(1)
                    .with_alternate_style(SpecCellStyle {
                        background_color: Some("#EEEEEE".to_string()),
                        ..Default::default()
                    }),
                crate::record_column!(Shipment, memo).with_drawing_ignore(),
            ]
        }
    }

    fn shipments() -> Vec<Shipment> {
        vec![
            Shipment {
                code: "A-1".into(),
                weight: 2.5,
                fragile: true,
                memo: "skip".into(),
            },
            Shipment {
                code: "B-2".into(),
                weight: 10.0,
                fragile: false,
                memo: String::new(),
            },
        ]
    }

    fn read_sheet(bytes: Vec<u8>, sheet_name: &str) -> calamine::Range<Data> {
        let mut workbook = Xlsx::new(Cursor::new(bytes)).expect("open xlsx");
        workbook.worksheet_range(sheet_name).expect("sheet range")
    }

    fn read_part(bytes: &[u8], path: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open package");
        let mut xml = String::new();
        archive
            .by_name(path)
            .expect("package part")
            .read_to_string(&mut xml)
            .expect("read part");
        xml
    }

    /// Opening tag of the first element starting with `prefix`.
    fn derive_tag<'a>(xml: &'a str, prefix: &str) -> &'a str {
        let n_start = xml.find(prefix).expect("tag present");
        let n_end = n_start + xml[n_start..].find('>').expect("tag closed");
        &xml[n_start..=n_end]
    }

    fn derive_style_id<'a>(xml: &'a str, cell_ref: &str) -> &'a str {
        let c_tag = derive_tag(xml, &format!("<c r=\"{cell_ref}\""));
        let n_start = c_tag.find(" s=\"").expect("style attribute") + 4;
        let n_len = c_tag[n_start..].find('"').expect("style closed");
        &c_tag[n_start..n_start + n_len]
    }

    #[test]
    fn test_new_rejects_bad_paths() {
        assert!(matches!(
            XlsxDrawingWriter::new(""),
            Err(XlsxObjectError::EmptyPath)
        ));
        assert!(matches!(
            XlsxDrawingWriter::new("out.xls"),
            Err(XlsxObjectError::UnsupportedOutput(EnumExcelType::Xls))
        ));
        assert!(matches!(
            XlsxDrawingWriter::new("out.csv"),
            Err(XlsxObjectError::InvalidExtension(_))
        ));
    }

    #[test]
    fn test_draw_header_and_rows_sorted_by_index() {
        let mut writer = XlsxDrawingWriter::in_memory();
        writer.draw("Ship/ments", &shipments()).unwrap();

        let report = writer.report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].sheet_name, "Ship_ments");
        assert_eq!(report[0].n_columns, 3);
        assert_eq!((report[0].row_start, report[0].row_end_exclusive), (1, 3));
        assert!(report[0].if_header_drawn);
        assert_eq!(report[0].warnings.len(), 1);

        let range = read_sheet(writer.save_to_buffer().unwrap(), "Ship_ments");
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Code".into())));
        assert_eq!(range.get_value((0, 1)), Some(&Data::String("fragile".into())));
        assert_eq!(range.get_value((0, 2)), Some(&Data::String("weight".into())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::String("A-1".into())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::Bool(true)));
        assert_eq!(range.get_value((2, 2)), Some(&Data::Float(10.0)));
        assert_eq!(range.get_size().1, 3);
    }

    #[test]
    fn test_draw_existing_sheet_continues_after_last_row() {
        let mut writer = XlsxDrawingWriter::in_memory().with_options(SpecDrawOptions {
            if_keep_sheet_cursor: true,
            ..Default::default()
        });
        writer.draw("Data", &shipments()).unwrap();
        writer.draw("Data", &shipments()[..1]).unwrap();

        let report = writer.report();
        assert!(!report[1].if_header_drawn);
        assert_eq!((report[1].row_start, report[1].row_end_exclusive), (3, 4));

        let range = read_sheet(writer.save_to_buffer().unwrap(), "Data");
        assert_eq!(range.get_value((3, 0)), Some(&Data::String("A-1".into())));
    }

    #[test]
    fn test_draw_restarts_rows_by_default() {
        let mut writer = XlsxDrawingWriter::in_memory();
        writer.draw("Data", &shipments()).unwrap();
        writer.draw("Data", &shipments()[1..]).unwrap();

        let report = writer.report();
        assert!(!report[1].if_header_drawn);
        assert_eq!((report[1].row_start, report[1].row_end_exclusive), (1, 2));
        let range = read_sheet(writer.save_to_buffer().unwrap(), "Data");
        assert_eq!(range.get_value((1, 0)), Some(&Data::String("B-2".into())));
        assert_eq!(range.get_value((2, 0)), Some(&Data::String("B-2".into())));
        assert_eq!(range.get_size().0, 3);
    }

    #[test]
    fn test_draw_matches_sheet_names_case_insensitively() {
        let mut writer = XlsxDrawingWriter::in_memory().with_options(SpecDrawOptions {
            if_keep_sheet_cursor: true,
            ..Default::default()
        });
        writer.draw("Data", &shipments()).unwrap();
        writer.draw("data", &shipments()[..1]).unwrap();

        let report = writer.report();
        assert_eq!(report[1].sheet_name, "Data");
        assert!(!report[1].if_header_drawn);

        let v_bytes = writer.save_to_buffer().unwrap();
        let workbook = Xlsx::new(Cursor::new(v_bytes.clone())).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Data".to_string()]);
        let range = read_sheet(v_bytes, "Data");
        assert_eq!(range.get_value((3, 0)), Some(&Data::String("A-1".into())));
    }

    #[derive(Debug, Default)]
    struct Visit {
        arrived: NaiveDateTime,
        due: NaiveDateTime,
    }

    impl SheetRecord for Visit {
        fn columns() -> Vec<SpecColumn<Self>> {
            vec![
                crate::record_column!(Visit, arrived)
                    .with_index(0)
                    .with_header_style(SpecHeaderStyle {
                        style: SpecCellStyle {
                            height: Some(30.0),
                            ..Default::default()
                        },
                        column_width: None,
                    }),
                crate::record_column!(Visit, due)
                    .with_index(1)
                    .with_cell_style(SpecCellStyle {
                        num_format: Some("dd/mm/yyyy".to_string()),
                        height: Some(30.0),
                        ..Default::default()
                    }),
            ]
        }
    }

    fn visits() -> Vec<Visit> {
        let dt = NaiveDate::from_ymd_opt(2024, 5, 17)
            .and_then(|val| val.and_hms_opt(8, 30, 0))
            .unwrap();
        vec![Visit {
            arrived: dt,
            due: dt,
        }]
    }

    #[test]
    fn test_draw_freezes_header_and_sets_row_heights() {
        let mut writer = XlsxDrawingWriter::in_memory().with_options(SpecDrawOptions {
            if_freeze_header: true,
            ..Default::default()
        });
        writer.draw("Visits", &visits()).unwrap();
        let xml_sheet = read_part(&writer.save_to_buffer().unwrap(), "xl/worksheets/sheet1.xml");

        let c_pane = derive_tag(&xml_sheet, "<pane ");
        assert!(c_pane.contains("ySplit=\"1\""));
        assert!(c_pane.contains("state=\"frozen\""));
        for c_row in ["<row r=\"1\"", "<row r=\"2\""] {
            let c_tag = derive_tag(&xml_sheet, c_row);
            assert!(c_tag.contains("ht=\"30\""), "{c_tag}");
            assert!(c_tag.contains("customHeight=\"1\""), "{c_tag}");
        }

        let mut writer = XlsxDrawingWriter::in_memory();
        writer.draw("Visits", &visits()).unwrap();
        let xml_sheet = read_part(&writer.save_to_buffer().unwrap(), "xl/worksheets/sheet1.xml");
        assert!(!xml_sheet.contains("<pane "));
    }

    #[test]
    fn test_draw_dates_use_style_or_default_format() {
        let mut writer = XlsxDrawingWriter::in_memory();
        writer.draw("Visits", &visits()).unwrap();
        let v_bytes = writer.save_to_buffer().unwrap();

        let xml_styles = read_part(&v_bytes, "xl/styles.xml");
        assert!(xml_styles.contains("formatCode=\"yyyy-mm-dd hh:mm:ss\""));
        assert!(xml_styles.contains("formatCode=\"dd/mm/yyyy\""));
        let xml_sheet = read_part(&v_bytes, "xl/worksheets/sheet1.xml");
        assert_ne!(derive_style_id(&xml_sheet, "A2"), derive_style_id(&xml_sheet, "B2"));

        let range = read_sheet(v_bytes, "Visits");
        let Some(Data::DateTime(val)) = range.get_value((1, 0)) else {
            panic!("date cell expected");
        };
        assert_eq!(val.as_datetime(), Some(visits()[0].arrived));
    }

    #[test]
    fn test_alternate_style_applies_to_odd_rows() {
        let mut writer = XlsxDrawingWriter::in_memory();
        writer.draw("Data", &shipments()).unwrap();
        let xml_sheet = read_part(&writer.save_to_buffer().unwrap(), "xl/worksheets/sheet1.xml");

        assert_ne!(derive_style_id(&xml_sheet, "B2"), derive_style_id(&xml_sheet, "B3"));
        assert_eq!(derive_style_id(&xml_sheet, "C2"), derive_style_id(&xml_sheet, "C3"));
    }

    #[test]
    fn test_save_to_writer_encodes_workbook() {
        let mut writer = XlsxDrawingWriter::in_memory();
        writer.draw("Data", &shipments()).unwrap();
        let mut cursor = Cursor::new(Vec::new());
        writer.save_to_writer(&mut cursor).unwrap();

        let range = read_sheet(cursor.into_inner(), "Data");
        assert_eq!(range.get_value((2, 0)), Some(&Data::String("B-2".into())));
    }

    #[derive(Default)]
    struct Unindexed {
        id: u32,
        label: String,
    }

    impl SheetRecord for Unindexed {
        fn columns() -> Vec<SpecColumn<Self>> {
            vec![
                crate::record_column!(Unindexed, id).with_index(0),
                crate::record_column!(Unindexed, label),
            ]
        }
    }

    #[derive(Default)]
    struct Clashing {
        id: u32,
        label: String,
    }

    impl SheetRecord for Clashing {
        fn columns() -> Vec<SpecColumn<Self>> {
            vec![
                crate::record_column!(Clashing, id).with_index(0),
                crate::record_column!(Clashing, label).with_index(0),
            ]
        }
    }

    #[test]
    fn test_draw_validates_column_indices() {
        let mut writer = XlsxDrawingWriter::in_memory();
        assert!(matches!(
            writer.draw("A", &[Unindexed::default()]),
            Err(XlsxObjectError::ColumnIndexMissing(name)) if name == "label"
        ));
        assert!(matches!(
            writer.draw("A", &[Clashing::default()]),
            Err(XlsxObjectError::DuplicateColumnIndex(0))
        ));
        assert!(writer.report().is_empty());
    }

    #[test]
    fn test_close_saves_once_and_rejects_draws() {
        let dir = tempfile::tempdir().unwrap();
        let path_excel = dir.path().join("nested").join("out.xlsx");

        let mut writer = XlsxDrawingWriter::new(&path_excel).unwrap();
        writer.draw("Data", &shipments()).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        assert!(path_excel.exists());
        assert!(matches!(
            writer.draw("Data", &shipments()),
            Err(XlsxObjectError::Closed)
        ));
    }

    #[test]
    fn test_drop_saves_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path_excel = dir.path().join("dropped.xlsx");
        {
            let mut writer = XlsxDrawingWriter::new(&path_excel).unwrap();
            writer.draw("Data", &shipments()).unwrap();
        }
        assert!(path_excel.exists());
    }

    #[test]
    fn test_derive_rust_xlsx_format() {
        let mut report = SpecDrawReport::default();
        let style = derive_default_cell_style().merge(&SpecCellStyle {
            background_color: Some("red".to_string()),
            text_color: Some("nope".to_string()),
            font_weight: Some(700),
            font_size: Some(0.0),
            ..Default::default()
        });

        let format = derive_rust_xlsx_format(&style, &mut report);
        let expected = Format::new()
            .set_align(FormatAlign::General)
            .set_align(FormatAlign::Top)
            .set_background_color(Color::RGB(0xFF0000))
            .set_pattern(FormatPattern::Solid)
            .set_bold();

        assert!(style.has_font());
        assert_eq!(format, expected);
        assert_eq!(report.warnings, vec!["Unrecognized color \"nope\" ignored."]);
    }

    #[test]
    fn test_fill_pattern_requires_color() {
        let mut report = SpecDrawReport::default();
        assert!(!derive_default_cell_style().has_font());
        let format = derive_rust_xlsx_format(&derive_default_cell_style(), &mut report);
        let expected = Format::new()
            .set_align(FormatAlign::General)
            .set_align(FormatAlign::Top);
        assert_eq!(format, expected);
        assert!(report.warnings.is_empty());
    }
}
