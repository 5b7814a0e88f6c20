use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
///
/// Console lines are human-formatted; the file layer writes JSON to a
/// daily-rotated `logs/investor_scraper.log` so scrape runs triggered from
/// the background endpoint leave an inspectable trail.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "investor_scraper.log");
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("investor_scraper=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(non_blocking_writer))
        .with(fmt::layer().with_writer(std::io::stdout))
        .init();

    // Keep the guard alive so buffered file logs flush on exit
    std::mem::forget(_guard);
}
