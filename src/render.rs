use handlebars::{Handlebars, RenderError};
use serde::Serialize;

use crate::cell::DenseGridCell;
use crate::color::{DEFAULT_BACKGROUND, DEFAULT_FONT, convert_color, is_bold};
use crate::daterange::DateRange;
use crate::export::export_file_name;
use crate::grid::Grid;
use crate::payload::ReportMeta;

const REPORT_TEMPLATE: &str = include_str!("./static/report.hbs");

/// One `<td>` of the result table.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct TableCell {
    pub rowspan: u32,
    pub colspan: u32,
    pub style: String,
    pub text: String,
}

impl TableCell {
    fn from_slot(slot: Option<&DenseGridCell>) -> Self {
        let background = slot
            .and_then(|c| convert_color(c.bg_color.as_deref()))
            .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string());
        let color = slot
            .and_then(|c| convert_color(c.font_color.as_deref()))
            .unwrap_or_else(|| DEFAULT_FONT.to_string());
        let weight = if slot.is_some_and(|c| is_bold(c.font_style.as_deref())) {
            "bold"
        } else {
            "normal"
        };

        TableCell {
            rowspan: slot.map_or(1, |c| c.rowspan),
            colspan: slot.map_or(1, |c| c.colspan),
            style: format!(
                "background-color: {}; color: {}; font-weight: {}; text-align: center; \
                 padding: 12px 14px; border: 1px solid #e5e7eb; font-size: 15px; white-space: nowrap",
                background, color, weight
            ),
            text: slot.map(DenseGridCell::display_value).unwrap_or_default(),
        }
    }
}

/// Table rows for the result page. Covered positions are left out entirely;
/// positions nobody claimed become empty cells.
pub fn render_table(grid: &Grid) -> Vec<Vec<TableCell>> {
    grid.rows
        .iter()
        .map(|row| {
            row.iter()
                .filter(|slot| !matches!(slot, Some(cell) if cell.skip))
                .map(|slot| TableCell::from_slot(slot.as_ref()))
                .collect()
        })
        .collect()
}

#[derive(Serialize)]
pub struct ReportPage<'a> {
    heading: &'a str,
    subtitle: String,
    export_url: &'a str,
    file_name: String,
    rows: Vec<Vec<TableCell>>,
}

impl<'a> ReportPage<'a> {
    pub fn new(meta: &'a ReportMeta, range: &DateRange, grid: &Grid, export_url: &'a str) -> Self {
        ReportPage {
            heading: meta.heading(),
            subtitle: format!("{} • {}", meta.report_type.as_deref().unwrap_or_default(), range.label()),
            export_url,
            file_name: export_file_name(meta.export_title()),
            rows: render_table(grid),
        }
    }

    pub fn render(&self) -> Result<String, RenderError> {
        let mut registry = Handlebars::new();
        registry.register_template_string("report", REPORT_TEMPLATE)?;
        registry.render("report", self)
    }
}
