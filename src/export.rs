//! Spreadsheet export of a reconciled report grid.
//!
//! Export runs in two passes. [`SheetPlan::build`] turns the grid into a
//! plain description of every cell write, merge and size adjustment, and
//! [`write_workbook`] replays that plan against `rust_xlsxwriter` and
//! serialises the workbook into memory.

use lazy_static::lazy_static;
use regex::Regex;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cell::{CellValue, DenseGridCell};
use crate::color::{argb_to_rgb, is_bold, spreadsheet_argb};
use crate::daterange::DateRange;
use crate::error::ExportError;
use crate::grid::{Grid, HEADER_ROWS};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Accent fill behind the title row.
pub const TITLE_FILL: &str = "FFFFA500";
/// Thin border drawn around every populated data cell.
pub const BORDER_COLOR: &str = "FFE5E7EB";

const TITLE_FONT_SIZE: f64 = 16.0;
const DATE_FONT_SIZE: f64 = 12.0;
const DATA_FONT_SIZE: f64 = 11.0;
/// Zero-based; data starts on spreadsheet row 4.
const DATA_START_ROW: u32 = HEADER_ROWS as u32;
const DATA_ROW_HEIGHT: f64 = 18.0;
const MEASURE_CAP: usize = 15;
const MIN_COLUMN_WIDTH: usize = 6;
const MAX_COLUMN_WIDTH: usize = 20;
const MAX_SHEET_NAME: usize = 31;

/// Inclusive worksheet rectangle, zero-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl MergeRange {
    /// Number of worksheet positions covered.
    pub fn area(&self) -> usize {
        (self.last_row - self.first_row + 1) as usize * (self.last_col - self.first_col + 1) as usize
    }
}

impl fmt::Display for MergeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_to_letter(self.first_col.saturating_add(1)),
            self.first_row + 1,
            column_to_letter(self.last_col.saturating_add(1)),
            self.last_row + 1
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlannedValue {
    Blank,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl PlannedValue {
    fn from_cell(value: Option<&CellValue>) -> Self {
        match value {
            None => PlannedValue::Blank,
            Some(CellValue::Text(s)) => PlannedValue::Text(s.clone()),
            Some(CellValue::Number(n)) => PlannedValue::Number(*n),
            Some(CellValue::Bool(b)) => PlannedValue::Bool(*b),
        }
    }
}

/// Styling of a cell that came from a descriptor. Colors are `0xRRGGBB`.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CellStyle {
    pub background: Option<u32>,
    pub font_color: Option<u32>,
    pub bold: bool,
}

impl CellStyle {
    fn of(cell: &DenseGridCell) -> Self {
        let rgb = |code: Option<&String>| spreadsheet_argb(code.map(String::as_str)).and_then(|argb| argb_to_rgb(&argb));
        CellStyle {
            background: rgb(cell.bg_color.as_ref()),
            font_color: rgb(cell.font_color.as_ref()),
            bold: is_bold(cell.font_style.as_deref()),
        }
    }
}

/// One independent cell write. `style` is `None` for grid positions that no
/// descriptor covered; those only get the border.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedCell {
    pub row: u32,
    pub col: u16,
    pub value: PlannedValue,
    pub style: Option<CellStyle>,
    pub merge: Option<MergeRange>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SheetPlan {
    pub sheet_name: String,
    pub title: String,
    pub date_label: String,
    pub width: u16,
    pub cells: Vec<PlannedCell>,
    pub column_widths: Vec<f64>,
    pub row_heights: Vec<(u32, f64)>,
}

impl SheetPlan {
    pub fn build(grid: &Grid, title: &str, range: &DateRange) -> Self {
        let width = to_col(grid.width());
        let date_label = range.label();
        let mut cells = Vec::new();
        // Title and date rows are merged across every column.
        let mut longest = vec![measure(title).max(measure(&date_label)); grid.width()];

        for (r, row) in grid.rows.iter().enumerate() {
            let sheet_row = DATA_START_ROW.saturating_add(to_row(r));
            for (c, slot) in row.iter().enumerate() {
                let col = to_col(c);
                match slot {
                    Some(cell) if cell.skip => {}
                    Some(cell) => {
                        let merge = cell.is_merged().then(|| MergeRange {
                            first_row: sheet_row,
                            first_col: col,
                            last_row: sheet_row.saturating_add(cell.rowspan - 1),
                            last_col: col.saturating_add(to_col(cell.colspan as usize) - 1),
                        });
                        let shown = measure(&cell.display_value());
                        let span_end = c.saturating_add(cell.colspan as usize).min(longest.len());
                        for len in &mut longest[c..span_end] {
                            *len = (*len).max(shown);
                        }
                        cells.push(PlannedCell {
                            row: sheet_row,
                            col,
                            value: PlannedValue::from_cell(cell.value.as_ref()),
                            style: Some(CellStyle::of(cell)),
                            merge,
                        });
                    }
                    None => cells.push(PlannedCell {
                        row: sheet_row,
                        col,
                        value: PlannedValue::Blank,
                        style: None,
                        merge: None,
                    }),
                }
            }
        }

        let column_widths = longest
            .into_iter()
            .map(|len| (len + 1).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH) as f64)
            .collect();
        let row_heights = (0..grid.height())
            .map(|r| (DATA_START_ROW.saturating_add(to_row(r)), DATA_ROW_HEIGHT))
            .collect();

        SheetPlan {
            sheet_name: sheet_name(title),
            title: title.to_string(),
            date_label,
            width,
            cells,
            column_widths,
            row_heights,
        }
    }

    pub fn merges(&self) -> impl Iterator<Item = &MergeRange> {
        self.cells.iter().filter_map(|cell| cell.merge.as_ref())
    }

    pub fn cell_at(&self, row: u32, col: u16) -> Option<&PlannedCell> {
        self.cells.iter().find(|cell| cell.row == row && cell.col == col)
    }
}

/// Characters counted towards a column's width.
fn measure(text: &str) -> usize {
    text.trim().chars().count().min(MEASURE_CAP)
}

fn to_row(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

fn to_col(index: usize) -> u16 {
    u16::try_from(index).unwrap_or(u16::MAX)
}

/// A merge the spreadsheet engine refused. The export carries on without it.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeWarning {
    pub range: MergeRange,
    pub reason: String,
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "merge {} skipped: {}", self.range, self.reason)
    }
}

/// A finished workbook ready to hand to the browser.
#[derive(Debug)]
pub struct ExportOutcome {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub warnings: Vec<MergeWarning>,
}

impl ExportOutcome {
    /// Writes the workbook into `dir` under its download name.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let path = dir.as_ref().join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Builds the workbook for a report grid.
///
/// An empty grid is refused before any workbook is created. Bytes are only
/// returned once serialisation succeeded, so a failure never yields a
/// truncated file.
pub fn export_report(grid: &Grid, title: &str, range: &DateRange) -> Result<ExportOutcome, ExportError> {
    if grid.is_empty() {
        return Err(ExportError::Empty);
    }

    let plan = SheetPlan::build(grid, title, range);
    let (bytes, warnings) = write_workbook(&plan)?;

    log::info!(
        "exported '{}' ({}x{}, {} bytes, {} merge warnings)",
        title,
        grid.height(),
        grid.width(),
        bytes.len(),
        warnings.len()
    );

    Ok(ExportOutcome {
        file_name: export_file_name(title),
        bytes,
        warnings,
    })
}

/// Replays a plan into an in-memory xlsx file.
pub fn write_workbook(plan: &SheetPlan) -> Result<(Vec<u8>, Vec<MergeWarning>), ExportError> {
    let mut workbook = Workbook::new();
    let mut warnings = Vec::new();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&plan.sheet_name)?;

    let title_format = Format::new()
        .set_bold()
        .set_font_size(TITLE_FONT_SIZE)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(argb_to_rgb(TITLE_FILL).unwrap_or(0xFFA500));
    let date_format = Format::new()
        .set_font_size(DATE_FONT_SIZE)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);

    if plan.width > 1 {
        worksheet.merge_range(0, 0, 0, plan.width - 1, &plan.title, &title_format)?;
        worksheet.merge_range(1, 0, 1, plan.width - 1, &plan.date_label, &date_format)?;
    } else {
        worksheet.write_string_with_format(0, 0, &plan.title, &title_format)?;
        worksheet.write_string_with_format(1, 0, &plan.date_label, &date_format)?;
    }

    for cell in &plan.cells {
        let format = cell_format(cell.style.as_ref());

        if let Some(range) = cell.merge {
            if let Err(e) = worksheet.merge_range(
                range.first_row,
                range.first_col,
                range.last_row,
                range.last_col,
                "",
                &format,
            ) {
                log::warn!("Merge attempted at {} but failed: {}", range, e);
                warnings.push(MergeWarning {
                    range,
                    reason: e.to_string(),
                });
            }
        }

        match &cell.value {
            PlannedValue::Blank => {
                worksheet.write_blank(cell.row, cell.col, &format)?;
            }
            PlannedValue::Text(s) => {
                worksheet.write_string_with_format(cell.row, cell.col, s, &format)?;
            }
            PlannedValue::Number(n) => {
                worksheet.write_number_with_format(cell.row, cell.col, *n, &format)?;
            }
            PlannedValue::Bool(b) => {
                worksheet.write_boolean_with_format(cell.row, cell.col, *b, &format)?;
            }
        }
    }

    for (row, height) in &plan.row_heights {
        worksheet.set_row_height(*row, *height)?;
    }
    for (col, width) in plan.column_widths.iter().enumerate() {
        worksheet.set_column_width(to_col(col), *width)?;
    }

    let buffer = workbook.save_to_buffer()?;
    Ok((buffer, warnings))
}

fn cell_format(style: Option<&CellStyle>) -> Format {
    let border = argb_to_rgb(BORDER_COLOR).unwrap_or(0xE5E7EB);
    let mut format = Format::new().set_border(FormatBorder::Thin).set_border_color(border);

    let Some(style) = style else {
        return format;
    };

    format = format
        .set_font_size(DATA_FONT_SIZE)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();
    if style.bold {
        format = format.set_bold();
    }
    if let Some(color) = style.font_color {
        format = format.set_font_color(color);
    }
    if let Some(color) = style.background {
        format = format.set_background_color(color);
    }
    format
}

/// Download name: title with whitespace runs replaced by `_`, lower-cased.
pub fn export_file_name(title: &str) -> String {
    let base = if title.is_empty() { "report" } else { title };
    format!("{}.xlsx", WHITESPACE.replace_all(base, "_").to_lowercase())
}

/// Worksheet names cannot contain `[]:*?/\` and are limited to 31 chars.
fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').trim();
    if cleaned.is_empty() {
        "Report".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Convert column number to letter (A=1, B=2, etc.)
fn column_to_letter(col: u16) -> String {
    let mut name = String::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    name
}

/// Per-view in-flight flag: only one export of a report runs at a time.
#[derive(Clone, Debug, Default)]
pub struct ExportGuard {
    in_flight: Arc<AtomicBool>,
}

/// Held while an export runs; releases the guard when dropped.
#[derive(Debug)]
pub struct ExportTicket {
    in_flight: Arc<AtomicBool>,
}

impl ExportGuard {
    pub fn try_begin(&self) -> Result<ExportTicket, ExportError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::InProgress)?;
        Ok(ExportTicket {
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for ExportTicket {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
