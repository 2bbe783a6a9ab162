use crate::daterange::DateRange;
use crate::error::{ExportError, ReportError};
use crate::export::{ExportGuard, ExportOutcome, export_report};
use crate::grid::{Grid, build_grid};
use crate::payload::{ReportMeta, ReportRequest};
use crate::render::ReportPage;

/// An opened report result: the grid is built once from the request and
/// never changes afterwards. Each view has its own export guard.
#[derive(Debug)]
pub struct ReportView {
    pub meta: ReportMeta,
    pub date_range: DateRange,
    pub grid: Grid,
    guard: ExportGuard,
}

impl ReportView {
    pub fn open(request: ReportRequest) -> Result<Self, ReportError> {
        let (meta, date_range, cells) = request.into_parts()?;
        let grid = build_grid(&cells);

        log::info!(
            "opened report '{}' ({} cells -> {}x{} grid)",
            meta.heading(),
            cells.len(),
            grid.height(),
            grid.width()
        );

        Ok(ReportView {
            meta,
            date_range,
            grid,
            guard: ExportGuard::default(),
        })
    }

    pub fn page<'a>(&'a self, export_url: &'a str) -> ReportPage<'a> {
        ReportPage::new(&self.meta, &self.date_range, &self.grid, export_url)
    }

    /// Runs an export unless one is already running for this view.
    pub fn export(&self) -> Result<ExportOutcome, ExportError> {
        let _ticket = self.guard.try_begin()?;
        export_report(&self.grid, self.meta.export_title(), &self.date_range)
    }

    pub fn export_guard(&self) -> &ExportGuard {
        &self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> ReportRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn opens_and_reconciles_records_before_headers() {
        let view = ReportView::open(request(
            r#"{
                "reportResponse": {"success": true, "records": {
                    "headers": [{"row": 0, "col": 0, "rowspan": 2, "value": "Region"}],
                    "records": [[{"row": 1, "col": 0, "value": "North"}]]
                }},
                "reportData": {"sub_report_title": "Regional Sales", "type": "Sales"},
                "dateRange": {"from": "01-03-2024", "to": "31-03-2024"}
            }"#,
        ))
        .unwrap();

        assert_eq!(view.grid.height(), 2);
        assert_eq!(view.grid.get(0, 0).unwrap().rowspan, 1);
        assert_eq!(view.grid.get(1, 0).unwrap().display_value(), "North");
        assert_eq!(view.date_range.label(), "01-03-2024 to 31-03-2024");
    }

    #[test]
    fn missing_records_give_empty_grid() {
        let view = ReportView::open(request(r#"{"reportResponse": {"success": true}, "reportData": {}}"#)).unwrap();
        assert!(view.grid.is_empty());
        assert!(matches!(view.export(), Err(ExportError::Empty)));
        assert!(!view.export_guard().is_busy());
    }

    #[test]
    fn oversized_report_is_not_opened() {
        let result = ReportView::open(request(
            r#"{"reportResponse": {"success": true, "records": {"records":
                {"row": 0, "col": 0, "rowspan": 4294967295, "colspan": 4294967295}}},
                "reportData": {}}"#,
        ));
        assert!(matches!(result, Err(ReportError::TooLarge { .. })));
    }

    #[test]
    fn export_refused_while_another_runs() {
        let view = ReportView::open(request(
            r#"{"reportResponse": {"success": true, "records": {"records": {"row": 0, "col": 0, "value": 1}}},
                "reportData": {}}"#,
        ))
        .unwrap();

        let running = view.export_guard().try_begin().unwrap();
        assert!(matches!(view.export(), Err(ExportError::InProgress)));
        drop(running);
        assert!(view.export().is_ok());
    }
}
