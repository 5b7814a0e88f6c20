use crate::error::Result;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Serialize)]
pub struct ParcelSummary {
    pub parcel_id: String,
    pub address: String,
}

/// Everything the parcel-search page lists for one owner name.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioLookup {
    pub buyer_name: String,
    pub portfolio_count: usize,
    pub properties: Vec<ParcelSummary>,
}

/// Search the parcel-lookup page by owner name and scrape the result table.
#[instrument(skip(client, search_url))]
pub async fn lookup_portfolio(
    client: &reqwest::Client,
    search_url: &str,
    buyer_name: &str,
) -> Result<PortfolioLookup> {
    let form = [
        ("OwnerName", buyer_name),
        ("Address", ""),
        ("SaleDateFrom", ""),
        ("SaleDateTo", ""),
    ];
    let response = client
        .post(search_url)
        .form(&form)
        .send()
        .await?
        .error_for_status()?;
    let body = response.text().await?;

    let properties = parse_parcel_rows(&body);
    debug!(
        "portfolio lookup for {:?} returned {} parcels",
        buyer_name,
        properties.len()
    );
    Ok(PortfolioLookup {
        buyer_name: buyer_name.to_string(),
        portfolio_count: properties.len(),
        properties,
    })
}

/// Pull (parcel id, address) out of every result row with enough cells.
fn parse_parcel_rows(html: &str) -> Vec<ParcelSummary> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let mut parcels = Vec::new();
    for row in document.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() < 3 {
            continue;
        }
        parcels.push(ParcelSummary {
            parcel_id: cells[0].clone(),
            address: cells[1].clone(),
        });
    }
    parcels
}
