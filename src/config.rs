use anyhow::{Context, Result};

use crate::dialect;

#[derive(Debug, Clone)]
pub struct Config {
    // Backend API
    pub api_base_url: String,

    // Dialect rotation
    pub dialects: Vec<String>,
    pub refresh_interval_secs: u64,

    // Session
    pub session_file: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Backend API serving timeline, authoring, auth and translation
            api_base_url: std::env::var("API_BASE_URL")
                .context("API_BASE_URL not set")?,

            // Dialect rotation
            dialects: std::env::var("DIALECTS")
                .map(|v| parse_dialect_list(&v))
                .unwrap_or_else(|_| {
                    dialect::DEFAULT_DIALECTS
                        .iter()
                        .map(|d| d.to_string())
                        .collect()
                }),
            refresh_interval_secs: std::env::var("REFRESH_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),

            // Session token storage
            session_file: std::env::var("SESSION_FILE")
                .unwrap_or_else(|_| ".access_token".to_string()),
        })
    }
}

/// Parse a comma-separated dialect list, trimming whitespace and dropping
/// empty entries. Ordering is preserved.
fn parse_dialect_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
