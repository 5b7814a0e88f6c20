use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use investor_scraper::config::Config;
use investor_scraper::error::{Result as ScraperResult, ScraperError};
use investor_scraper::pipeline::InvestorPipeline;
use investor_scraper::types::{
    InvestorTier, MailingAddress, PropertyApi, PropertyDetail, SaleHistoryEntry, SaleRecord,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;

/// Canned county source: pages of sales plus per-PIN details. PINs listed in
/// `fail_after_first_fetch` succeed once (the aggregation pass) and fail on
/// every later fetch (the assembly re-fetch).
struct MockCountyApi {
    pages: Vec<Vec<SaleRecord>>,
    details: HashMap<String, PropertyDetail>,
    fail_after_first_fetch: HashSet<String>,
    fetch_counts: Mutex<HashMap<String, u32>>,
}

impl MockCountyApi {
    fn new(pages: Vec<Vec<SaleRecord>>, details: HashMap<String, PropertyDetail>) -> Self {
        Self {
            pages,
            details,
            fail_after_first_fetch: HashSet::new(),
            fetch_counts: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl PropertyApi for MockCountyApi {
    fn source_name(&self) -> &'static str {
        "mock_county"
    }

    async fn fetch_sales_page(&self, page: u32, _page_size: u32) -> ScraperResult<Vec<SaleRecord>> {
        Ok(self
            .pages
            .get((page - 1) as usize)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_property_detail(&self, pin: &str) -> ScraperResult<PropertyDetail> {
        let mut counts = self.fetch_counts.lock().unwrap();
        let count = counts.entry(pin.to_string()).or_insert(0);
        *count += 1;
        if *count > 1 && self.fail_after_first_fetch.contains(pin) {
            return Err(ScraperError::Api {
                message: format!("simulated outage for pin {pin}"),
            });
        }
        self.details.get(pin).cloned().ok_or_else(|| {
            ScraperError::MissingField(format!("no detail for pin {pin}"))
        })
    }
}

fn days_ago(days: i64) -> String {
    (Utc::now().date_naive() - Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

fn sale(pin: &str, sale_date: String) -> SaleRecord {
    SaleRecord {
        pin: Some(pin.to_string()),
        display_folio: Some(format!("F-{pin}")),
        sale_date: Some(sale_date),
        sale_price: Some(250_000.0),
        address: None,
        site_address: None,
    }
}

fn detail(owner: &str, addr1: &str, site: &str, deed: &str) -> PropertyDetail {
    PropertyDetail {
        owner: Some(owner.to_string()),
        mailing_address: Some(MailingAddress {
            addr1: Some(addr1.to_string()),
            city: Some("TAMPA".to_string()),
            state: Some("FL".to_string()),
            zip: Some("33601".to_string()),
            ..Default::default()
        }),
        site_address: Some(site.to_string()),
        sales_history: vec![SaleHistoryEntry {
            deed_type: Some(deed.to_string()),
            date: None,
            price: None,
        }],
        ..Default::default()
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.source.delay_ms = 0;
    config
}

fn pipeline(api: MockCountyApi) -> InvestorPipeline {
    InvestorPipeline::new(Arc::new(api), &test_config())
}

#[tokio::test]
async fn multi_property_entity_cash_buyer_is_emitted() -> Result<()> {
    let mut details = HashMap::new();
    details.insert(
        "P1".to_string(),
        detail("ACME HOLDINGS LLC", "123 MAIN ST", "123 MAIN ST", "WD"),
    );
    details.insert(
        "P2".to_string(),
        detail("ACME HOLDINGS LLC", "123 MAIN ST", "456 OAK AVE", "WD"),
    );
    let api = MockCountyApi::new(
        vec![vec![sale("P1", days_ago(10)), sale("P2", days_ago(5))]],
        details,
    );

    let summary = pipeline(api).get_recent_investors(Some(5), 180).await?;

    assert_eq!(summary.records_seen, 2);
    assert_eq!(summary.unique_owners, 1);
    assert_eq!(summary.investors.len(), 1);

    let investor = &summary.investors[0];
    assert_eq!(investor.buyer_name, "ACME HOLDINGS LLC");
    assert_eq!(investor.mailing_address, "123 MAIN ST TAMPA FL 33601");
    assert_eq!(investor.portfolio_count, 2);
    assert_eq!(investor.tier, InvestorTier::Small);
    assert_eq!(investor.properties.len(), 2);
    assert_eq!(investor.properties[0].pin, "P1");
    assert_eq!(investor.properties[1].pin, "P2");
    Ok(())
}

#[tokio::test]
async fn single_purchase_is_excluded_by_count_rule() -> Result<()> {
    let mut details = HashMap::new();
    details.insert(
        "P1".to_string(),
        detail("JOHN SMITH", "9 ELM CT", "9 ELM CT", "WD"),
    );
    let api = MockCountyApi::new(vec![vec![sale("P1", days_ago(3))]], details);

    let summary = pipeline(api).get_recent_investors(Some(5), 180).await?;

    assert_eq!(summary.unique_owners, 1);
    assert!(summary.investors.is_empty());
    Ok(())
}

#[tokio::test]
async fn stale_sales_are_excluded_from_aggregation() -> Result<()> {
    let mut details = HashMap::new();
    details.insert(
        "P1".to_string(),
        detail("ACME HOLDINGS LLC", "123 MAIN ST", "123 MAIN ST", "WD"),
    );
    let api = MockCountyApi::new(
        vec![vec![sale("P1", days_ago(400)), sale("P1", days_ago(365))]],
        details,
    );

    let summary = pipeline(api).get_recent_investors(Some(5), 180).await?;

    assert_eq!(summary.records_seen, 2);
    assert_eq!(summary.records_skipped, 2);
    assert_eq!(summary.unique_owners, 0);
    assert!(summary.investors.is_empty());
    Ok(())
}

#[tokio::test]
async fn financed_groups_are_filtered_out() -> Result<()> {
    let mut financed = detail("ACME HOLDINGS LLC", "123 MAIN ST", "123 MAIN ST", "XX");
    financed.extra.insert(
        "mortgageHolder".to_string(),
        serde_json::Value::String("EXAMPLE BANK NA".to_string()),
    );
    let mut details = HashMap::new();
    details.insert("P1".to_string(), financed.clone());
    details.insert("P2".to_string(), financed);

    let api = MockCountyApi::new(
        vec![vec![sale("P1", days_ago(10)), sale("P2", days_ago(5))]],
        details,
    );

    let summary = pipeline(api).get_recent_investors(Some(5), 180).await?;

    assert_eq!(summary.unique_owners, 1);
    assert!(summary.investors.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_representative_refetch_skips_only_that_group() -> Result<()> {
    let mut details = HashMap::new();
    details.insert(
        "A1".to_string(),
        detail("ACME HOLDINGS LLC", "123 MAIN ST", "123 MAIN ST", "WD"),
    );
    details.insert(
        "A2".to_string(),
        detail("ACME HOLDINGS LLC", "123 MAIN ST", "456 OAK AVE", "WD"),
    );
    details.insert(
        "B1".to_string(),
        detail("BAYSIDE CAPITAL LP", "77 HARBOR BLVD", "12 COVE LN", "TR"),
    );
    details.insert(
        "B2".to_string(),
        detail("BAYSIDE CAPITAL LP", "77 HARBOR BLVD", "34 COVE LN", "TR"),
    );

    let mut api = MockCountyApi::new(
        vec![vec![
            sale("A1", days_ago(10)),
            sale("A2", days_ago(9)),
            sale("B1", days_ago(8)),
            sale("B2", days_ago(7)),
        ]],
        details,
    );
    // The ACME group's representative PIN goes dark before the second pass
    api.fail_after_first_fetch.insert("A1".to_string());

    let summary = pipeline(api).get_recent_investors(Some(5), 180).await?;

    assert_eq!(summary.unique_owners, 2);
    assert_eq!(summary.investors.len(), 1);
    assert_eq!(summary.investors[0].buyer_name, "BAYSIDE CAPITAL LP");
    Ok(())
}

#[tokio::test]
async fn pagination_stops_at_first_empty_page() -> Result<()> {
    let mut details = HashMap::new();
    details.insert(
        "P1".to_string(),
        detail("ACME HOLDINGS LLC", "123 MAIN ST", "123 MAIN ST", "WD"),
    );
    let api = MockCountyApi::new(
        vec![
            vec![sale("P1", days_ago(3))],
            Vec::new(),
            vec![sale("P1", days_ago(2))],
        ],
        details,
    );

    let summary = pipeline(api).get_recent_investors(None, 180).await?;

    // Page 2 is empty, so page 3 is never reached
    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(summary.records_seen, 1);
    Ok(())
}
