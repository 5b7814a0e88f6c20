use thiserror::Error;

/// Failure taxonomy for the scraper.
///
/// The pipeline never lets one of these abort a run: transport and parse
/// failures are downgraded to skips of the affected page, record, or group
/// at the call site, and only setup problems (config, bind) reach the CLI.
#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV processing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Source API error: {message}")]
    Api { message: String },
}

pub type Result<T> = std::result::Result<T, ScraperError>;
