use clap::{Parser, Subcommand};
use tracing::error;

mod apis;
mod classify;
mod config;
mod csv_processor;
mod error;
mod logging;
mod normalize;
mod pipeline;
mod portfolio;
mod portfolio_lookup;
mod server;
mod types;

use crate::apis::HillsboroughApi;
use crate::config::Config;
use crate::csv_processor::CsvProcessor;
use crate::pipeline::InvestorPipeline;
use crate::server::AppState;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "investor_scraper")]
#[command(about = "Hillsborough County investor buyer scraper")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape recent sales and persist investor profiles
    Scrape {
        /// Maximum number of sales pages to fetch (unbounded when omitted)
        #[arg(long)]
        max_pages: Option<u32>,
        /// Only include sales recorded within this many days
        #[arg(long, default_value_t = 180)]
        days_back: i64,
        /// Directory for the JSON output file
        #[arg(long, default_value = "output")]
        output_dir: String,
    },
    /// Run the investor filters over a bulk sales CSV export
    Csv {
        /// Input CSV with SiteAddress/MailingAddress1/Owner1/Owner2 columns
        #[arg(long)]
        input: String,
        /// Output path for the filtered investor table
        #[arg(long, default_value = "investors_output.csv")]
        output: String,
    },
    /// Look up an owner's full parcel portfolio on the search page
    Portfolio {
        /// Owner name as recorded on the deed
        #[arg(long)]
        owner: String,
    },
    /// Serve the scraper behind the HTTP API
    Serve {
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Scrape {
            max_pages,
            days_back,
            output_dir,
        } => {
            println!("🔄 Running investor scrape...");
            let api = Arc::new(HillsboroughApi::new(&config.source)?);
            let pipeline = InvestorPipeline::new(api, &config);

            match pipeline.get_recent_investors(max_pages, days_back).await {
                Ok(summary) => {
                    println!("\n📊 Scrape results for {}:", summary.source);
                    println!("   Pages fetched: {}", summary.pages_fetched);
                    println!("   Records seen: {}", summary.records_seen);
                    println!("   Records skipped: {}", summary.records_skipped);
                    println!("   Unique owners: {}", summary.unique_owners);
                    println!("   Investors: {}", summary.investors.len());

                    let output_file = InvestorPipeline::persist_to_json(
                        &summary.investors,
                        &summary.source,
                        &output_dir,
                    )?;
                    println!("   Output file: {}", output_file);
                }
                Err(e) => {
                    error!("Scrape failed: {}", e);
                    println!("❌ Scrape failed: {e}");
                }
            }
        }
        Commands::Csv { input, output } => {
            println!("🔄 Processing sales CSV...");
            let processor = CsvProcessor::from_config(&config);
            let investors = processor.process_sales_csv(&input)?;
            processor.write_investors_csv(&investors, &output)?;
            println!("✅ Wrote {} investor rows to {}", investors.len(), output);
        }
        Commands::Portfolio { owner } => {
            let api = HillsboroughApi::new(&config.source)?;
            let lookup = portfolio_lookup::lookup_portfolio(
                api.client(),
                &config.source.portfolio_search_url,
                &owner,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&lookup)?);
        }
        Commands::Serve { port } => {
            let api = Arc::new(HillsboroughApi::new(&config.source)?);
            let pipeline = Arc::new(InvestorPipeline::new(api, &config));
            let state = AppState {
                pipeline,
                api_key: config::api_key(),
            };
            server::start_server(state, port).await?;
        }
    }
    Ok(())
}
