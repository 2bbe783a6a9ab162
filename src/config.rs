use std::env;

use crate::error::ConfigError;

pub const HOST_VAR: &str = "REPORT_PORTAL_HOST";
pub const PORT_VAR: &str = "REPORT_PORTAL_PORT";
pub const MAX_REPORTS_VAR: &str = "REPORT_PORTAL_MAX_REPORTS";
pub const API_URL_VAR: &str = "REPORT_PORTAL_API_URL";

/// Where the web server listens and what it talks to.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Opened report views kept in memory; the least recently used one is
    /// dropped beyond this.
    pub max_reports: usize,
    /// Prefix for report endpoints that are not absolute URLs.
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_reports: 64,
            api_base_url: String::new(),
        }
    }
}

impl Config {
    /// Reads `REPORT_PORTAL_HOST` / `REPORT_PORTAL_PORT`, falling back to
    /// `127.0.0.1:3000`, plus `REPORT_PORTAL_MAX_REPORTS` and
    /// `REPORT_PORTAL_API_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Ok(host) = env::var(HOST_VAR) {
            config.host = host;
        }
        if let Ok(port) = env::var(PORT_VAR) {
            config.port = parse_port(&port)?;
        }
        if let Ok(max) = env::var(MAX_REPORTS_VAR) {
            config.max_reports = parse_max_reports(&max)?;
        }
        if let Ok(url) = env::var(API_URL_VAR) {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }

    /// Positional `[host] [port]` arguments override the environment.
    pub fn with_args(mut self, args: &[String]) -> Result<Self, ConfigError> {
        if let Some(host) = args.first() {
            self.host = host.clone();
        }
        if let Some(port) = args.get(1) {
            self.port = parse_port(port)?;
        }
        Ok(self)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(s: &str) -> Result<u16, ConfigError> {
    s.trim().parse().map_err(|_| ConfigError::Port(s.to_string()))
}

fn parse_max_reports(s: &str) -> Result<usize, ConfigError> {
    match s.trim().parse() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::MaxReports(s.to_string())),
    }
}
