//! Rich text cells rendered as HTML.
//!
//! The reader backend flattens rich strings to plain text, so formatting runs
//! are recovered from the `.xlsx` package: the shared string table holds the
//! runs and each worksheet part maps its cells to shared string positions.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::conf::{
    C_XLSX_SHARED_STRINGS_PATH, C_XLSX_WORKBOOK_PATH, C_XLSX_WORKBOOK_RELS_PATH,
    N_FONT_WEIGHT_BOLD, N_FONT_WEIGHT_NORMAL,
};
use crate::spec::{Result, XlsxObjectError};

/// Font properties of one rich text run that matter for HTML rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecRichFont {
    /// Bold run.
    pub bold: bool,
    /// Italic run.
    pub italic: bool,
    /// Font family; empty when the run does not name one.
    pub name: String,
}

/// One contiguous text run sharing a font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRichRun {
    /// Run text.
    pub text: String,
    /// Run font; `None` when the run inherits the cell font.
    pub font: Option<SpecRichFont>,
}

/// Shared string runs of an `.xlsx` package, addressable per cell.
#[derive(Debug, Clone, Default)]
pub struct RichTextIndex {
    l_entries: Vec<Vec<SpecRichRun>>,
    dict_cells_by_sheet: HashMap<String, HashMap<(u32, u32), usize>>,
}

impl RichTextIndex {
    /// Build the index from an `.xlsx` package. A package without a shared
    /// string table yields an empty index.
    pub fn from_xlsx_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(derive_zip_error_text)?;
        let Some(xml_shared) = read_zip_text(&mut archive, C_XLSX_SHARED_STRINGS_PATH)? else {
            return Ok(Self::default());
        };
        let mut index = Self::from_shared_strings_xml(&xml_shared)?;

        let xml_workbook = read_zip_text(&mut archive, C_XLSX_WORKBOOK_PATH)?.unwrap_or_default();
        let xml_rels = read_zip_text(&mut archive, C_XLSX_WORKBOOK_RELS_PATH)?.unwrap_or_default();
        let dict_targets = parse_relationship_targets(&xml_rels)?;
        for (sheet_name, c_rel_id) in parse_workbook_sheets(&xml_workbook)? {
            let Some(c_target) = dict_targets.get(&c_rel_id) else {
                continue;
            };
            if let Some(xml_sheet) = read_zip_text(&mut archive, &derive_part_path(c_target))? {
                index.add_sheet_xml(&sheet_name, &xml_sheet)?;
            }
        }
        Ok(index)
    }

    /// Build the index from `sharedStrings.xml` content, with no sheets yet.
    pub fn from_shared_strings_xml(xml: &str) -> Result<Self> {
        Ok(Self {
            l_entries: parse_shared_string_runs(xml)?,
            dict_cells_by_sheet: HashMap::new(),
        })
    }

    /// Register the shared string cells of one worksheet part.
    pub fn add_sheet_xml(&mut self, sheet_name: &str, xml: &str) -> Result<()> {
        let dict_cells = parse_sheet_shared_string_cells(xml)?;
        self.dict_cells_by_sheet
            .insert(sheet_name.to_string(), dict_cells);
        Ok(())
    }

    /// Number of shared strings.
    pub fn len(&self) -> usize {
        self.l_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.l_entries.is_empty()
    }

    /// Runs of the shared string stored at zero-based `(row, col)`.
    pub fn runs(&self, sheet_name: &str, row: u32, col: u32) -> Option<&[SpecRichRun]> {
        let n_idx = self.dict_cells_by_sheet.get(sheet_name)?.get(&(row, col))?;
        self.l_entries.get(*n_idx).map(Vec::as_slice)
    }

    /// Render one cell as HTML from its own runs; cells outside the shared
    /// string table render `text` as a plain paragraph.
    pub fn to_html(&self, sheet_name: &str, row: u32, col: u32, text: &str) -> String {
        match self.runs(sheet_name, row, col) {
            Some(l_runs) => render_rich_text_html(l_runs),
            None => render_plain_text_html(text),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region HtmlRendering

struct SpecPendingSpan {
    font: Option<SpecRichFont>,
    text: String,
}

impl SpecPendingSpan {
    fn flush_into(&mut self, html: &mut String) {
        if self.text.is_empty() {
            return;
        }
        if let Some(font) = &self.font {
            html.push_str(&format!(
                "<span style=\"font-weight:{};font-style:{};font-family:'{}'\">",
                if font.bold {
                    N_FONT_WEIGHT_BOLD
                } else {
                    N_FONT_WEIGHT_NORMAL
                },
                if font.italic { "italic" } else { "normal" },
                escape_html(&font.name)
            ));
            html.push_str(&escape_html(&self.text));
            html.push_str("</span>");
        }
        self.text.clear();
    }
}

/// Render rich text runs as a `<p>` paragraph.
///
/// Adjacent runs with equal fonts share one `<span>`; runs without a font are
/// emitted as bare text. Carriage returns are dropped and line feeds become
/// `<br/>`.
pub fn render_rich_text_html(runs: &[SpecRichRun]) -> String {
    let mut html = String::from("<p>");
    let mut pending = SpecPendingSpan {
        font: None,
        text: String::new(),
    };

    for run in runs {
        for chr in run.text.chars() {
            match chr {
                '\r' => {}
                '\n' => {
                    pending.flush_into(&mut html);
                    html.push_str("<br/>");
                }
                _ => match &run.font {
                    None => {
                        pending.flush_into(&mut html);
                        html.push_str(&escape_html(chr.encode_utf8(&mut [0u8; 4])));
                    }
                    Some(font) => {
                        if pending.font.as_ref() != Some(font) {
                            pending.flush_into(&mut html);
                            pending.font = Some(font.clone());
                        }
                        pending.text.push(chr);
                    }
                },
            }
        }
    }

    pending.flush_into(&mut html);
    html.push_str("</p>");
    html
}

/// Render unformatted text as a `<p>` paragraph.
pub fn render_plain_text_html(text: &str) -> String {
    render_rich_text_html(&[SpecRichRun {
        text: text.to_string(),
        font: None,
    }])
}

fn escape_html(text: &str) -> String {
    let mut c_escaped = String::with_capacity(text.len());
    for chr in text.chars() {
        match chr {
            '&' => c_escaped.push_str("&amp;"),
            '<' => c_escaped.push_str("&lt;"),
            '>' => c_escaped.push_str("&gt;"),
            '"' => c_escaped.push_str("&quot;"),
            '\'' => c_escaped.push_str("&#39;"),
            _ => c_escaped.push(chr),
        }
    }
    c_escaped
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SharedStringParsing

/// Parse every `<si>` entry of a shared string table into runs.
///
/// Plain entries become one font-less run; phonetic (`<rPh>`) text is skipped.
pub fn parse_shared_string_runs(xml: &str) -> Result<Vec<Vec<SpecRichRun>>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut l_entries = Vec::new();
    let mut l_runs_current: Vec<SpecRichRun> = Vec::new();
    let mut if_in_run = false;
    let mut if_in_rpr = false;
    let mut if_in_t = false;
    let mut if_in_rph = false;
    let mut font_current: Option<SpecRichFont> = None;
    let mut c_text_current = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| XlsxObjectError::RichText(format!("sharedStrings.xml: {err}")))?;
        match event {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => l_runs_current.clear(),
                b"r" if !if_in_rph => {
                    if_in_run = true;
                    font_current = None;
                    c_text_current.clear();
                }
                b"rPr" if if_in_run => {
                    if_in_rpr = true;
                    font_current = Some(SpecRichFont::default());
                }
                b"t" if !if_in_rph => {
                    if_in_t = true;
                    if !if_in_run {
                        c_text_current.clear();
                    }
                }
                b"rPh" => if_in_rph = true,
                name if if_in_rpr => apply_run_property(name, e, font_current.as_mut()),
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"rPr" if if_in_run => font_current = Some(SpecRichFont::default()),
                name if if_in_rpr => apply_run_property(name, e, font_current.as_mut()),
                _ => {}
            },
            Event::Text(ref e) if if_in_t => {
                c_text_current.push_str(&unescape_xml(&String::from_utf8_lossy(e.as_ref())));
            }
            Event::GeneralRef(ref e) if if_in_t => {
                if let Some(chr) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                    c_text_current.push(chr);
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" if if_in_t => {
                    if_in_t = false;
                    if !if_in_run {
                        l_runs_current.push(SpecRichRun {
                            text: std::mem::take(&mut c_text_current),
                            font: None,
                        });
                    }
                }
                b"rPr" => if_in_rpr = false,
                b"r" if if_in_run => {
                    if_in_run = false;
                    l_runs_current.push(SpecRichRun {
                        text: std::mem::take(&mut c_text_current),
                        font: font_current.take(),
                    });
                }
                b"rPh" => if_in_rph = false,
                b"si" => l_entries.push(std::mem::take(&mut l_runs_current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(l_entries)
}

fn apply_run_property(name: &[u8], element: &BytesStart<'_>, font: Option<&mut SpecRichFont>) {
    let Some(font) = font else {
        return;
    };
    let c_val = derive_attribute_val(element);
    match name {
        b"b" => font.bold = c_val.as_deref().is_none_or(is_truthy),
        b"i" => font.italic = c_val.as_deref().is_none_or(is_truthy),
        b"rFont" => font.name = c_val.unwrap_or_default(),
        _ => {}
    }
}

fn derive_attribute_val(element: &BytesStart<'_>) -> Option<String> {
    derive_attribute(element, b"val")
}

/// Attribute value by local name, so `r:id` matches `id`.
fn derive_attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .map(|attr| unescape_xml(&String::from_utf8_lossy(&attr.value)))
}

fn is_truthy(val: &str) -> bool {
    !matches!(val, "0" | "false")
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let c_num = name.strip_prefix('#')?;
            let n_code = match c_num.strip_prefix('x').or_else(|| c_num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => c_num.parse::<u32>().ok()?,
            };
            char::from_u32(n_code)
        }
    }
}

/// Unescape the predefined XML entities left in raw text.
fn unescape_xml(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn derive_zip_error_text(err: ZipError) -> XlsxObjectError {
    XlsxObjectError::RichText(format!("xlsx package: {err}"))
}

fn read_zip_text<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Option<String>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(derive_zip_error_text(err)),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetPartParsing

/// `(sheet name, relationship id)` pairs of `xl/workbook.xml`, in sheet order.
fn parse_workbook_sheets(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut l_sheets = Vec::new();
    loop {
        let event = reader
            .read_event()
            .map_err(|err| XlsxObjectError::RichText(format!("workbook.xml: {err}")))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                if let Some(c_name) = derive_attribute(e, b"name")
                    && let Some(c_rel_id) = derive_attribute(e, b"id")
                {
                    l_sheets.push((c_name, c_rel_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(l_sheets)
}

/// Relationship id to target of `xl/_rels/workbook.xml.rels`.
fn parse_relationship_targets(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut dict_targets = HashMap::new();
    loop {
        let event = reader
            .read_event()
            .map_err(|err| XlsxObjectError::RichText(format!("workbook.xml.rels: {err}")))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let Some(c_id) = derive_attribute(e, b"Id")
                    && let Some(c_target) = derive_attribute(e, b"Target")
                {
                    dict_targets.insert(c_id, c_target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(dict_targets)
}

/// Package path of a workbook relationship target.
fn derive_part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(val) => val.to_string(),
        None => format!("xl/{target}"),
    }
}

/// Running position inside `<sheetData>`, for rows and cells that omit `r`.
#[derive(Debug, Default)]
struct SpecSheetDataCursor {
    n_row: u32,
    n_row_next: u32,
    n_col_next: u32,
}

impl SpecSheetDataCursor {
    fn enter_row(&mut self, element: &BytesStart<'_>) {
        self.n_row = derive_attribute(element, b"r")
            .and_then(|val| val.parse::<u32>().ok())
            .and_then(|val| val.checked_sub(1))
            .unwrap_or(self.n_row_next);
        self.n_row_next = self.n_row.saturating_add(1);
        self.n_col_next = 0;
    }

    fn enter_cell(&mut self, element: &BytesStart<'_>) -> (u32, u32) {
        let (n_row, n_col) = derive_attribute(element, b"r")
            .and_then(|val| parse_cell_ref(&val))
            .unwrap_or((self.n_row, self.n_col_next));
        self.n_col_next = n_col.saturating_add(1);
        (n_row, n_col)
    }
}

/// Zero-based `(row, col)` to shared string position for every `t="s"` cell
/// of one worksheet part.
fn parse_sheet_shared_string_cells(xml: &str) -> Result<HashMap<(u32, u32), usize>> {
    let mut reader = Reader::from_str(xml);
    let mut dict_cells = HashMap::new();
    let mut cursor = SpecSheetDataCursor::default();
    let mut cell_shared: Option<(u32, u32)> = None;
    let mut if_in_v = false;
    let mut c_text_v = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| XlsxObjectError::RichText(format!("worksheet: {err}")))?;
        match event {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"row" => cursor.enter_row(e),
                b"c" => {
                    let pos = cursor.enter_cell(e);
                    let if_shared = derive_attribute(e, b"t").as_deref() == Some("s");
                    cell_shared = if_shared.then_some(pos);
                }
                b"v" if cell_shared.is_some() => {
                    if_in_v = true;
                    c_text_v.clear();
                }
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"row" => cursor.enter_row(e),
                b"c" => {
                    cursor.enter_cell(e);
                }
                _ => {}
            },
            Event::Text(ref e) if if_in_v => {
                c_text_v.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" if if_in_v => {
                    if_in_v = false;
                    if let Some(pos) = cell_shared
                        && let Ok(n_idx) = c_text_v.trim().parse::<usize>()
                    {
                        dict_cells.insert(pos, n_idx);
                    }
                }
                b"c" => cell_shared = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(dict_cells)
}

/// Zero-based `(row, col)` of an `A1` reference.
fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let n_split = cell_ref.find(|chr: char| chr.is_ascii_digit())?;
    let (c_col, c_row) = cell_ref.split_at(n_split);
    if c_col.is_empty() {
        return None;
    }
    let mut n_col: u32 = 0;
    for chr in c_col.chars() {
        if !chr.is_ascii_alphabetic() {
            return None;
        }
        let n_digit = u32::from(chr.to_ascii_uppercase()) - u32::from('A') + 1;
        n_col = n_col.checked_mul(26)?.checked_add(n_digit)?;
    }
    let n_row = c_row.parse::<u32>().ok()?.checked_sub(1)?;
    Some((n_row, n_col - 1))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
