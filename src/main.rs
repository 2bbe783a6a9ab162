use report_portal::app;
use report_portal::config::Config;

use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();

    // Positional [host] [port] take precedence over the environment
    let config = Config::from_env()?.with_args(&args)?;

    // Start the web application
    app::run(config).await?;

    Ok(())
}
