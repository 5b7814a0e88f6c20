use crate::config::SourceConfig;
use crate::error::Result;
use crate::types::{PropertyApi, PropertyDetail, SaleRecord};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const USER_AGENT: &str = "Mozilla/5.0 (ForeclosureScraperBot)";

/// Client for the Hillsborough County property appraiser services.
pub struct HillsboroughApi {
    client: reqwest::Client,
    base_url: String,
    property_use_codes: String,
    retries: u32,
    retry_delay: Duration,
}

impl HillsboroughApi {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            property_use_codes: config.property_use_codes.clone(),
            retries: config.retries.max(1),
            retry_delay: Duration::from_secs(2),
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// GET returning deserialized JSON, retrying transport failures with a
    /// fixed sleep between attempts. Non-2xx responses are not retried.
    async fn get_json<T>(&self, url: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).query(query).send().await {
                Ok(response) => return Ok(response.error_for_status()?.json::<T>().await?),
                Err(e) if attempt < self.retries => {
                    warn!("GET {} attempt {}/{} failed: {}", url, attempt, self.retries, e);
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait::async_trait]
impl PropertyApi for HillsboroughApi {
    fn source_name(&self) -> &'static str {
        "hillsborough"
    }

    #[instrument(skip(self))]
    async fn fetch_sales_page(&self, page: u32, page_size: u32) -> Result<Vec<SaleRecord>> {
        let url = format!("{}/search/SalesSearchMod", self.base_url);
        let query = [
            ("prop", self.property_use_codes.clone()),
            ("stype", "q".to_string()),
            ("pagesize", page_size.to_string()),
            ("page", page.to_string()),
        ];
        let sales: Vec<SaleRecord> = self.get_json(&url, &query).await?;
        debug!("fetched {} sale records from page {}", sales.len(), page);
        Ok(sales)
    }

    #[instrument(skip(self))]
    async fn fetch_property_detail(&self, pin: &str) -> Result<PropertyDetail> {
        let url = format!("{}/search/ParcelData", self.base_url);
        let query = [("pin", pin.to_string())];
        self.get_json(&url, &query).await
    }
}
