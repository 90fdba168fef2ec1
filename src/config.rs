use std::env;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FUTURES_URL: &str = "http://www.cboe.com/delayedquote/futures-quotes";
/// Position of the VX quote table among all `<table>` elements on the futures page.
pub const DEFAULT_FUTURES_TABLE_INDEX: usize = 6;

fn get_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn get_env_bool(key: &str, default: bool) -> bool {
    match get_env(key) {
        None => default,
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"),
    }
}

fn get_env_usize(key: &str, default: usize) -> Result<usize> {
    match get_env(key) {
        None => Ok(default),
        Some(v) => Ok(v
            .parse::<usize>()
            .map_err(|e| anyhow!("{key} invalid int: {e}"))?),
    }
}

fn get_env_u16(key: &str, default: u16) -> Result<u16> {
    match get_env(key) {
        None => Ok(default),
        Some(v) => Ok(v
            .parse::<u16>()
            .map_err(|e| anyhow!("{key} invalid port: {e}"))?),
    }
}

fn get_env_opt_u64(key: &str) -> Result<Option<u64>> {
    match get_env(key) {
        None => Ok(None),
        Some(v) => Ok(Some(
            v.parse::<u64>()
                .map_err(|e| anyhow!("{key} invalid int: {e}"))?,
        )),
    }
}

fn get_env_string(key: &str, default: &str) -> String {
    get_env(key).unwrap_or_else(|| default.to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Futures page
    pub futures_url: String,
    pub futures_table_index: usize,
    pub drop_untraded_front: bool,

    // Spot cards
    pub spot_url: Option<String>,
    pub spot_table_index: usize,
    pub spot_symbols: Vec<String>,
    pub spot_history_path: Option<String>,

    // HTTP client
    pub http_timeout_secs: Option<u64>,
    pub http_user_agent: String,
    pub http_no_proxy: bool,

    // Dashboard
    pub dashboard_title: String,
    pub dashboard_host: String,
    pub dashboard_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            futures_url: DEFAULT_FUTURES_URL.to_string(),
            futures_table_index: DEFAULT_FUTURES_TABLE_INDEX,
            drop_untraded_front: true,
            spot_url: None,
            spot_table_index: 0,
            spot_symbols: vec!["VIX".to_string(), "VIX9D".to_string()],
            spot_history_path: None,
            http_timeout_secs: None,
            http_user_agent: format!("contango/{}", env!("CARGO_PKG_VERSION")),
            http_no_proxy: false,
            dashboard_title: "Wango Contango".to_string(),
            dashboard_host: "127.0.0.1".to_string(),
            dashboard_port: 8050,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let d = Self::default();

        let s = Self {
            futures_url: get_env_string("FUTURES_URL", &d.futures_url),
            futures_table_index: get_env_usize("FUTURES_TABLE_INDEX", d.futures_table_index)?,
            drop_untraded_front: get_env_bool("DROP_UNTRADED_FRONT", d.drop_untraded_front),
            spot_url: get_env("SPOT_URL"),
            spot_table_index: get_env_usize("SPOT_TABLE_INDEX", d.spot_table_index)?,
            spot_symbols: get_env("SPOT_SYMBOLS")
                .map(|v| split_list(&v))
                .unwrap_or(d.spot_symbols),
            spot_history_path: get_env("SPOT_HISTORY_PATH"),
            http_timeout_secs: get_env_opt_u64("HTTP_TIMEOUT_SECS")?,
            http_user_agent: get_env_string("HTTP_USER_AGENT", &d.http_user_agent),
            http_no_proxy: get_env_bool("HTTP_NO_PROXY", d.http_no_proxy),
            dashboard_title: get_env_string("DASHBOARD_TITLE", &d.dashboard_title),
            dashboard_host: get_env_string("DASHBOARD_HOST", &d.dashboard_host),
            dashboard_port: get_env_u16("DASHBOARD_PORT", d.dashboard_port)?,
        };

        s.validate()?;
        Ok(s)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.futures_url) {
            return Err(anyhow!(
                "FUTURES_URL must be an http(s) url (got {})",
                self.futures_url
            ));
        }
        if let Some(url) = &self.spot_url {
            if !is_http_url(url) {
                return Err(anyhow!("SPOT_URL must be an http(s) url (got {url})"));
            }
            if self.spot_symbols.is_empty() {
                return Err(anyhow!("SPOT_SYMBOLS must name at least one index when SPOT_URL is set"));
            }
        }
        if self.http_timeout_secs == Some(0) {
            return Err(anyhow!("HTTP_TIMEOUT_SECS must be >= 1"));
        }
        if self.dashboard_port == 0 {
            return Err(anyhow!("DASHBOARD_PORT must be >= 1"));
        }
        Ok(())
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
