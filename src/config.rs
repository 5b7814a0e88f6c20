use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Runtime configuration, read from `config.toml` when present.
///
/// Every section falls back to compiled-in defaults so the binary runs
/// without a config file. The keyword lists live here rather than as
/// process-wide constants so the classifiers can be constructed with
/// regional overrides or test fixtures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub filters: FilterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub portfolio_search_url: String,
    pub page_size: u32,
    pub delay_ms: u64,
    pub timeout_seconds: u64,
    pub retries: u32,
    /// Property-use codes passed to the sales search (residential classes).
    pub property_use_codes: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gis.hcpafl.org/CommonServices/property".to_string(),
            portfolio_search_url:
                "https://gis.hillsboroughcounty.org/PropertyAppraiser/ParcelSearch/Search"
                    .to_string(),
            page_size: 1000,
            delay_ms: 250,
            timeout_seconds: 10,
            retries: 3,
            property_use_codes: "0403,0400,0500,0501,0200,0408,0508,0111,0102,0100,0106"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// City names and state codes that terminate the street portion of an address.
    pub stop_words: Vec<String>,
    /// Substrings that mark a buyer name as a business/trust entity.
    pub entity_keywords: Vec<String>,
    /// Deed-type codes treated as non-financed transfers.
    pub investor_deed_types: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let strings = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            stop_words: strings(&[
                "TAMPA", "ODESSA", "LUTZ", "APOLLO", "BEACH", "PLANT", "RIVERVIEW", "FL",
                "GA", "TX", "NC", "SC", "AL", "LA", "MS", "TN",
            ]),
            entity_keywords: strings(&[
                "LLC", "INC", "TRUST", "HOLDINGS", "CAPITAL", "PROPERTIES", "MGMT", "LP",
                "CORP",
            ]),
            investor_deed_types: strings(&["TR", "TD", "QC", "SWD", "WD"]),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// API key gating the service endpoints, from the environment (dotenv honored).
pub fn api_key() -> String {
    std::env::var("API_KEY").unwrap_or_else(|_| "changeme".to_string())
}
