#![cfg(not(tarpaulin_include))]

use clap::Parser;
use report_portal::daterange::DateRange;
use report_portal::payload::ReportRequest;
use report_portal::report::ReportView;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

/// Export a saved report payload to an Excel workbook.
#[derive(Parser, Debug)]
#[command(name = "report-cli", version)]
struct Args {
    /// JSON file holding `reportResponse`, `reportData` and `dateRange`
    payload: PathBuf,

    /// Directory the workbook is written to
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Overrides the report title
    #[arg(long)]
    title: Option<String>,

    /// Overrides the start of the date range
    #[arg(long, requires = "to")]
    from: Option<String>,

    /// Overrides the end of the date range
    #[arg(long, requires = "from")]
    to: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let started = Instant::now();

    let raw = fs::read_to_string(&args.payload)?;
    let mut request: ReportRequest = serde_json::from_str(&raw)?;

    if let Some(title) = args.title {
        request
            .report_data
            .get_or_insert_with(Default::default)
            .sub_report_title = Some(title);
    }
    if let (Some(from), Some(to)) = (args.from, args.to) {
        request.date_range = Some(DateRange::new(from, to));
    }

    let view = ReportView::open(request)?;
    println!(
        "{}: {} rows x {} cols ({})",
        view.meta.heading(),
        view.grid.height(),
        view.grid.width(),
        view.date_range.label()
    );

    if view.grid.is_empty() {
        eprintln!("No records found, nothing to export");
        return Ok(());
    }

    let outcome = view.export()?;
    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning);
    }

    let path = outcome.save_to(&args.out)?;
    println!(
        "Wrote {} ({} bytes) in {:.2}s",
        path.display(),
        outcome.bytes.len(),
        started.elapsed().as_secs_f64()
    );

    Ok(())
}
