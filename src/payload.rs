use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::cell::CellDescriptor;
use crate::daterange::DateRange;
use crate::error::ReportError;
use crate::grid::check_extent;

/// A cell group as the backend sends it: one descriptor, a flat list, or a
/// list of rows. Anything else is ignored.
#[derive(Clone, Deserialize, Debug)]
#[serde(untagged)]
pub enum CellSource {
    Many(Vec<CellEntry>),
    One(CellDescriptor),
    Other(IgnoredAny),
}

#[derive(Clone, Deserialize, Debug)]
#[serde(untagged)]
pub enum CellEntry {
    Row(Vec<RowEntry>),
    Cell(CellDescriptor),
    Other(IgnoredAny),
}

/// Items inside a row. Nested lists stop here.
#[derive(Clone, Deserialize, Debug)]
#[serde(untagged)]
pub enum RowEntry {
    Cell(CellDescriptor),
    Other(IgnoredAny),
}

impl CellSource {
    /// Flattens the group into one list, preserving order.
    pub fn flatten(&self) -> Vec<CellDescriptor> {
        let mut bucket = Vec::new();
        self.collect_into(&mut bucket);
        bucket
    }

    pub fn collect_into(&self, bucket: &mut Vec<CellDescriptor>) {
        match self {
            CellSource::One(cell) => bucket.push(cell.clone()),
            CellSource::Many(entries) => {
                for entry in entries {
                    match entry {
                        CellEntry::Cell(cell) => bucket.push(cell.clone()),
                        CellEntry::Row(row) => {
                            for item in row {
                                if let RowEntry::Cell(cell) = item {
                                    bucket.push(cell.clone());
                                }
                            }
                        }
                        CellEntry::Other(_) => {}
                    }
                }
            }
            CellSource::Other(_) => {}
        }
    }
}

impl From<Vec<CellDescriptor>> for CellSource {
    fn from(cells: Vec<CellDescriptor>) -> Self {
        CellSource::Many(cells.into_iter().map(CellEntry::Cell).collect())
    }
}

impl From<Vec<Vec<CellDescriptor>>> for CellSource {
    fn from(rows: Vec<Vec<CellDescriptor>>) -> Self {
        CellSource::Many(
            rows.into_iter()
                .map(|row| CellEntry::Row(row.into_iter().map(RowEntry::Cell).collect()))
                .collect(),
        )
    }
}

/// The three cell groups of a generated report.
#[derive(Clone, Deserialize, Debug, Default)]
pub struct ReportRecords {
    #[serde(default)]
    pub records: Option<CellSource>,
    #[serde(default)]
    pub headers: Option<CellSource>,
    #[serde(default)]
    pub footer: Option<CellSource>,
}

impl ReportRecords {
    /// Candidate list for reconciliation: records first so data cells claim
    /// their footprint before header and footer spans are placed.
    pub fn candidates(&self) -> Vec<CellDescriptor> {
        let mut all = Vec::new();
        for source in [&self.records, &self.headers, &self.footer].into_iter().flatten() {
            source.collect_into(&mut all);
        }
        all
    }
}

/// Envelope returned by the reporting backend.
#[derive(Clone, Deserialize, Debug, Default)]
pub struct ReportResponse {
    /// A response without `success` counts as failed; the backend has to
    /// send `"success": true` explicitly.
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub records: Option<ReportRecords>,
}

/// Tenant a report is generated for.
#[derive(Clone, Deserialize, serde::Serialize, Debug, Default)]
pub struct ReportEntity {
    #[serde(default)]
    pub id: serde_json::Value,
}

/// Which report is being shown.
#[derive(Clone, Deserialize, serde::Serialize, Debug, Default)]
pub struct ReportMeta {
    #[serde(default)]
    pub sub_report_title: Option<String>,
    #[serde(default)]
    pub report_title: Option<String>,
    #[serde(default, rename = "type")]
    pub report_type: Option<String>,
    #[serde(default)]
    pub date_filter: Option<u8>,
    /// Backend path (or absolute URL) that generates this report.
    #[serde(default, rename = "endPoint")]
    pub end_point: Option<String>,
    #[serde(default)]
    pub entity: Option<ReportEntity>,
}

impl ReportMeta {
    /// Heading shown above the table.
    pub fn heading(&self) -> &str {
        self.title().unwrap_or("Report Result")
    }

    /// Title written into the workbook.
    pub fn export_title(&self) -> &str {
        self.title().unwrap_or("Report")
    }

    fn title(&self) -> Option<&str> {
        self.sub_report_title.as_deref().filter(|t| !t.is_empty())
    }

    pub fn single_date(&self) -> bool {
        self.date_filter == Some(1)
    }

    /// Tenant id as sent in the query string and `X-Tenant-ID` header.
    pub fn tenant_id(&self) -> Option<String> {
        match &self.entity.as_ref()?.id {
            serde_json::Value::String(id) if !id.is_empty() => Some(id.clone()),
            serde_json::Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// What a result view is opened with.
#[derive(Clone, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub report_response: Option<ReportResponse>,
    #[serde(default)]
    pub report_data: Option<ReportMeta>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl ReportRequest {
    /// Validates the request and returns the flattened candidate cells.
    /// Cell lists whose grid would exceed a worksheet are refused.
    pub fn into_parts(self) -> Result<(ReportMeta, DateRange, Vec<CellDescriptor>), ReportError> {
        let (response, meta) = match (self.report_response, self.report_data) {
            (Some(response), Some(meta)) => (response, meta),
            _ => return Err(ReportError::MissingData),
        };

        if !response.success {
            let message = response
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Failed to generate report".to_string());
            return Err(ReportError::Backend(message));
        }

        let cells = response.records.map(|r| r.candidates()).unwrap_or_default();
        check_extent(&cells)?;
        Ok((meta, self.date_range.unwrap_or_default(), cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> CellSource {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn flattens_single_descriptor() {
        let cells = parse(r#"{"row": 0, "col": 1, "value": "a"}"#).flatten();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].col, 1);
    }

    #[test]
    fn flattens_flat_and_nested_lists_in_order() {
        let flat = parse(r#"[{"row":0,"col":0},{"row":0,"col":1}]"#).flatten();
        assert_eq!(flat.iter().map(|c| c.col).collect::<Vec<_>>(), vec![0, 1]);

        let nested = parse(r#"[[{"row":0,"col":0},null,{"row":0,"col":1}],[{"row":1,"col":0}],{"row":2,"col":0}]"#)
            .flatten();
        let coords: Vec<_> = nested.iter().map(|c| (c.row, c.col)).collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (1, 0), (2, 0)]);
    }

    #[test]
    fn drops_deeper_nesting_and_junk() {
        let cells = parse(r#"[[[{"row":5,"col":5}]], "text", 7, [{"row":1,"col":1}], {"col": 3}]"#).flatten();
        assert_eq!(cells.len(), 1);
        assert_eq!((cells[0].row, cells[0].col), (1, 1));

        assert!(parse(r#""nothing""#).flatten().is_empty());
    }

    #[test]
    fn candidates_put_records_first() {
        let records: ReportRecords = serde_json::from_str(
            r#"{"headers":[{"row":0,"col":0,"value":"h"}],
                "footer":{"row":9,"col":0,"value":"f"},
                "records":[[{"row":1,"col":0,"value":"r"}]]}"#,
        )
        .unwrap();
        let order: Vec<_> = records.candidates().into_iter().map(|c| c.value.unwrap().to_string()).collect();
        assert_eq!(order, vec!["r", "h", "f"]);
    }

    #[test]
    fn request_without_payload_is_missing_data() {
        let request: ReportRequest = serde_json::from_str(r#"{"reportData": {}}"#).unwrap();
        assert_eq!(request.into_parts().unwrap_err(), ReportError::MissingData);
    }

    #[test]
    fn unsuccessful_response_surfaces_backend_message() {
        let request: ReportRequest = serde_json::from_str(
            r#"{"reportResponse": {"success": false, "message": "tenant not found"}, "reportData": {}}"#,
        )
        .unwrap();
        assert_eq!(
            request.into_parts().unwrap_err(),
            ReportError::Backend("tenant not found".to_string())
        );

        let request: ReportRequest =
            serde_json::from_str(r#"{"reportResponse": {}, "reportData": {}}"#).unwrap();
        assert_eq!(
            request.into_parts().unwrap_err().to_string(),
            "Failed to generate report"
        );
    }

    #[test]
    fn missing_success_flag_is_a_failure() {
        let response: ReportResponse = serde_json::from_str(r#"{"records": {"records": []}}"#).unwrap();
        assert!(!response.success);

        let request = ReportRequest {
            report_response: Some(response),
            report_data: Some(ReportMeta::default()),
            date_range: None,
        };
        assert_eq!(
            request.into_parts().unwrap_err(),
            ReportError::Backend("Failed to generate report".to_string())
        );
    }

    #[test]
    fn oversized_extent_is_refused() {
        let request: ReportRequest = serde_json::from_str(
            r#"{"reportResponse": {"success": true, "records": {"records":
                {"row": 0, "col": 0, "rowspan": 4294967295, "colspan": 4294967295}}},
                "reportData": {}}"#,
        )
        .unwrap();
        let err = request.into_parts().unwrap_err();
        assert!(matches!(err, ReportError::TooLarge { .. }));
        assert!(err.to_string().starts_with("Report is too large to display"));

        let request: ReportRequest = serde_json::from_str(
            r#"{"reportResponse": {"success": true, "records": {"footer": {"row": 0, "col": 16384}}},
                "reportData": {}}"#,
        )
        .unwrap();
        assert_eq!(
            request.into_parts().unwrap_err(),
            ReportError::TooLarge { rows: 1, cols: 16_385 }
        );
    }

    #[test]
    fn tenant_id_accepts_numbers_and_strings() {
        let meta: ReportMeta = serde_json::from_str(r#"{"endPoint": "/r", "entity": {"id": 42}}"#).unwrap();
        assert_eq!(meta.tenant_id().as_deref(), Some("42"));
        assert_eq!(meta.end_point.as_deref(), Some("/r"));

        let meta: ReportMeta = serde_json::from_str(r#"{"entity": {"id": "t-7"}}"#).unwrap();
        assert_eq!(meta.tenant_id().as_deref(), Some("t-7"));

        assert_eq!(ReportMeta::default().tenant_id(), None);
    }
}
