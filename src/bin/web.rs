#![cfg(not(tarpaulin_include))]

use report_portal::app;
use report_portal::config::Config;

/// Main entry point for the report portal web application
///
/// Starts the server with configuration taken from the environment only
/// (`REPORT_PORTAL_HOST`, `REPORT_PORTAL_PORT`); log output is controlled
/// through `RUST_LOG`.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    app::run(config).await
}
