use thiserror::Error;

/// Problems opening a report result view.
#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("No report data found!")]
    MissingData,

    #[error("{0}")]
    Backend(String),

    #[error("Report is too large to display ({rows} rows x {cols} columns)")]
    TooLarge { rows: usize, cols: usize },
}

/// Failures at the spreadsheet export boundary.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No data to download")]
    Empty,

    #[error("An export is already in progress")]
    InProgress,

    #[error("Failed to download Excel: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to write export file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum DateRangeError {
    #[error("Please select a date")]
    MissingDate,

    #[error("Please select both dates")]
    MissingDates,

    #[error("From date cannot be after To date!")]
    Inverted,

    #[error("Invalid date '{0}', expected dd-mm-yyyy")]
    Unparseable(String),

    #[error("Unknown quick report '{0}'")]
    UnknownPreset(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port '{0}'")]
    Port(String),

    #[error("Invalid report limit '{0}', expected a positive number")]
    MaxReports(String),
}

/// Failures while asking the reporting backend for a report.
#[cfg(feature = "web")]
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Session expired. Please login again.")]
    SessionExpired,

    #[error("Report not found")]
    NotFound,

    #[error("Report data missing!")]
    MissingEndpoint,

    #[error("{0}")]
    Backend(String),

    #[error("{0}")]
    DateRange(#[from] DateRangeError),

    #[error("{0}")]
    Report(#[from] ReportError),

    #[error("Failed to generate report: {0}")]
    Http(#[from] reqwest::Error),
}
