use serde::Serialize;

use crate::cell::{CellDescriptor, DenseGridCell};
use crate::error::ReportError;

/// Worksheet limits of the xlsx format.
pub const SHEET_MAX_ROWS: usize = 1_048_576;
pub const SHEET_MAX_COLS: usize = 16_384;
/// Title, date and spacer rows written above the data.
pub const HEADER_ROWS: usize = 3;
/// Largest grid that still fits a worksheet below the header rows.
pub const MAX_GRID_ROWS: usize = SHEET_MAX_ROWS - HEADER_ROWS;
pub const MAX_GRID_COLS: usize = SHEET_MAX_COLS;
/// Upper bound on dense positions held for one report.
pub const MAX_GRID_CELLS: usize = 1_000_000;

/// Dense, span-resolved report grid. `None` marks a position no descriptor
/// touched; it still renders as an empty bordered cell.
#[derive(Clone, Serialize, Debug, Default, PartialEq)]
pub struct Grid {
    pub rows: Vec<Vec<Option<DenseGridCell>>>,
}

impl Grid {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// An empty grid means "no data", not an error.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&DenseGridCell> {
        self.rows.get(row)?.get(col)?.as_ref()
    }

    /// Positions that are rendered and exported on their own, row-major.
    pub fn anchors(&self) -> impl Iterator<Item = (usize, usize, &DenseGridCell)> {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter().enumerate().filter_map(move |(c, slot)| match slot {
                Some(cell) if !cell.skip => Some((r, c, cell)),
                _ => None,
            })
        })
    }
}

/// Rows and columns the grid for `cells` would have.
pub fn extent(cells: &[CellDescriptor]) -> (usize, usize) {
    let rows = cells.iter().map(CellDescriptor::end_row).max().unwrap_or(0);
    let cols = cells.iter().map(CellDescriptor::end_col).max().unwrap_or(0);
    (rows, cols)
}

/// Refuses candidate lists whose grid would not fit a worksheet or would be
/// too large to hold in memory.
pub fn check_extent(cells: &[CellDescriptor]) -> Result<(usize, usize), ReportError> {
    let (rows, cols) = extent(cells);
    let too_large = rows > MAX_GRID_ROWS || cols > MAX_GRID_COLS || rows.saturating_mul(cols) > MAX_GRID_CELLS;
    if too_large {
        return Err(ReportError::TooLarge { rows, cols });
    }
    Ok((rows, cols))
}

/// Reconciles an ordered candidate list into a dense grid.
///
/// Cells are placed in input order and the first writer of a position keeps
/// it. A later cell whose requested rectangle runs into occupied rows is
/// shortened to the rows that are free across its whole colspan (at least
/// one row); columns are never trimmed.
///
/// The grid is allocated at full extent, so untrusted input goes through
/// [`check_extent`] first.
pub fn build_grid(cells: &[CellDescriptor]) -> Grid {
    if cells.is_empty() {
        return Grid::default();
    }

    let (max_row, max_col) = extent(cells);

    let mut rows: Vec<Vec<Option<DenseGridCell>>> = vec![vec![None; max_col]; max_row];

    for cell in cells {
        let (row, col) = (cell.row as usize, cell.col as usize);
        let colspan = cell.colspan as usize;

        let mut usable = 0;
        for r in 0..cell.rowspan as usize {
            let slice = &rows[row + r][col..col + colspan];
            if slice.iter().any(Option::is_some) {
                break;
            }
            usable += 1;
        }
        let rowspan = usable.max(1);

        if rowspan < cell.rowspan as usize {
            log::debug!(
                "cell at ({}, {}) truncated from rowspan {} to {}",
                cell.row,
                cell.col,
                cell.rowspan,
                rowspan
            );
        }

        for r in 0..rowspan {
            for c in 0..colspan {
                let slot = &mut rows[row + r][col + c];
                if slot.is_none() {
                    let skip = !(r == 0 && c == 0);
                    *slot = Some(DenseGridCell::resolve(cell, rowspan as u32, colspan as u32, skip));
                }
            }
        }
    }

    Grid { rows }
}
