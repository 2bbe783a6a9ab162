//! Report generation against the reporting backend.
//!
//! A report is generated by calling its `endPoint` with the chosen period and
//! tenant. A successful response is opened as a [`ReportView`] exactly like a
//! response posted to `/api/reports`.

use reqwest::{Client, StatusCode, header};

use crate::daterange::DateRange;
use crate::error::GenerateError;
use crate::payload::{ReportMeta, ReportRequest, ReportResponse};
use crate::report::ReportView;

#[derive(Clone, Debug, Default)]
pub struct ReportBackend {
    base_url: String,
    client: Client,
}

impl ReportBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        ReportBackend {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    /// Absolute endpoints are used as given; anything else is appended to
    /// the configured base URL.
    pub fn report_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.base_url, endpoint)
        }
    }

    /// Fetches the report for `range` and opens it.
    pub async fn generate(&self, meta: ReportMeta, range: DateRange, token: &str) -> Result<ReportView, GenerateError> {
        let endpoint = meta
            .end_point
            .clone()
            .filter(|e| !e.is_empty())
            .ok_or(GenerateError::MissingEndpoint)?;
        let tenant_id = meta.tenant_id();

        let response = self.fetch(&endpoint, &range, tenant_id.as_deref(), token).await?;
        let view = ReportView::open(ReportRequest {
            report_response: Some(response),
            report_data: Some(meta),
            date_range: Some(range),
        })?;
        Ok(view)
    }

    /// `GET {endpoint}?startDate=..&endDate=..&tenant_id=..` with the
    /// caller's bearer token. Tenant headers are only sent when a tenant is
    /// known.
    pub async fn fetch(
        &self,
        endpoint: &str,
        range: &DateRange,
        tenant_id: Option<&str>,
        token: &str,
    ) -> Result<ReportResponse, GenerateError> {
        let url = self.report_url(endpoint);
        let mut query = vec![("startDate", range.from.as_str()), ("endDate", range.to.as_str())];
        let mut request = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json");
        if let Some(tenant_id) = tenant_id {
            query.push(("tenant_id", tenant_id));
            request = request.header("X-Tenant-ID", tenant_id).header("tenant_id", tenant_id);
        }

        log::info!("requesting report {} ({})", url, range.label());
        let response = request.query(&query).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        match status {
            StatusCode::UNAUTHORIZED => return Err(GenerateError::SessionExpired),
            StatusCode::NOT_FOUND => return Err(GenerateError::NotFound),
            _ => {}
        }

        let parsed = serde_json::from_slice::<ReportResponse>(&body);
        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|r| r.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("Error: {}", status.as_u16()));
            log::warn!("report backend answered {}: {}", status, message);
            return Err(GenerateError::Backend(message));
        }

        parsed.map_err(|e| {
            log::warn!("unreadable report response from {}: {}", url, e);
            GenerateError::Backend("Failed to generate report".to_string())
        })
    }
}
