use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Default cap on how many candidate links one brokenLinks task may probe.
pub const DEFAULT_LINK_CHECK_CAP: usize = 50;

/// Process configuration, read from the environment exactly once at
/// startup. Per-request code never touches `std::env`.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub app_env: String,
    pub storage_endpoint: String,
    pub storage_bucket: String,
    pub public_base_url: Option<String>,
    pub chrome_path: Option<PathBuf>,
    pub axe_script_path: PathBuf,
    pub link_check_cap: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Missing storage configuration is
    /// startup-fatal; everything else has a default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let storage_endpoint = match lookup("STORAGE_ENDPOINT") {
            Some(v) if !v.trim().is_empty() => v,
            _ => bail!("STORAGE_ENDPOINT must be set"),
        };
        let storage_bucket = match lookup("STORAGE_BUCKET") {
            Some(v) if !v.trim().is_empty() => v,
            _ => bail!("STORAGE_BUCKET must be set"),
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port number: '{raw}'"))?,
            None => 8080,
        };

        let link_check_cap = match lookup("LINK_CHECK_CAP") {
            Some(raw) => {
                let cap: usize = raw
                    .parse()
                    .with_context(|| format!("LINK_CHECK_CAP is not a number: '{raw}'"))?;
                if cap == 0 {
                    bail!("LINK_CHECK_CAP must be at least 1");
                }
                cap
            }
            None => DEFAULT_LINK_CHECK_CAP,
        };

        Ok(Config {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            app_env: lookup("APP_ENV").unwrap_or_else(|| "development".to_string()),
            storage_endpoint,
            storage_bucket,
            public_base_url: lookup("PUBLIC_BASE_URL").filter(|v| !v.trim().is_empty()),
            chrome_path: lookup("CHROME_PATH").map(PathBuf::from),
            axe_script_path: lookup("AXE_SCRIPT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("assets/axe.min.js")),
            link_check_cap,
        })
    }
}
