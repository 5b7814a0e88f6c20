use crate::classify::{BuyerClassifier, PurchaseClassifier};
use crate::config::Config;
use crate::error::Result;
use crate::normalize::AddressNormalizer;
use crate::portfolio::PortfolioIndex;
use crate::types::{InvestorProfile, InvestorTier, PropertyApi, PropertyRecord, SaleRecord};
use chrono::{NaiveDate, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Result of a complete scrape run.
#[derive(Debug, Serialize)]
pub struct ScrapeSummary {
    pub source: String,
    pub pages_fetched: u32,
    pub records_seen: usize,
    pub records_skipped: usize,
    pub unique_owners: usize,
    pub investors: Vec<InvestorProfile>,
}

/// Two-pass investor pipeline: aggregate recent sales into per-mailing-key
/// portfolios, then filter the multi-property groups down to cash buyers.
///
/// Strictly sequential: pages in order, one detail fetch at a time, all
/// mutation single-writer. The only suspension points are the fetch awaits
/// and the inter-page pacing sleep.
pub struct InvestorPipeline {
    api: Arc<dyn PropertyApi>,
    normalizer: AddressNormalizer,
    buyers: BuyerClassifier,
    purchases: PurchaseClassifier,
    page_size: u32,
    page_delay: Duration,
}

impl InvestorPipeline {
    pub fn new(api: Arc<dyn PropertyApi>, config: &Config) -> Self {
        let normalizer = AddressNormalizer::new(config.filters.stop_words.clone());
        Self {
            buyers: BuyerClassifier::new(
                config.filters.entity_keywords.clone(),
                normalizer.clone(),
            ),
            purchases: PurchaseClassifier::new(config.filters.investor_deed_types.clone()),
            normalizer,
            page_size: config.source.page_size,
            page_delay: Duration::from_millis(config.source.delay_ms),
            api,
        }
    }

    /// Run the full aggregate-then-assemble pipeline over sales recorded in
    /// the last `days_back` days, paging until `max_pages`, an empty page,
    /// or a page fetch failure.
    #[instrument(skip(self))]
    pub async fn get_recent_investors(
        &self,
        max_pages: Option<u32>,
        days_back: i64,
    ) -> Result<ScrapeSummary> {
        let source = self.api.source_name().to_string();
        info!("Building portfolio index for last {} days", days_back);
        println!("🔍 Building portfolio index for last {days_back} days...");
        counter!("scrape_runs_total", "source" => source.clone()).increment(1);
        let t_run = std::time::Instant::now();

        let cutoff = Utc::now().date_naive() - chrono::Duration::days(days_back);
        let mut index = PortfolioIndex::new();
        let mut pages_fetched = 0u32;
        let mut records_seen = 0usize;
        let mut records_skipped = 0usize;

        let mut page = 1u32;
        loop {
            if let Some(max) = max_pages {
                if page > max {
                    break;
                }
            }
            println!("📄 Fetching sales page {page}...");
            let sales = match self.api.fetch_sales_page(page, self.page_size).await {
                Ok(sales) => sales,
                Err(e) => {
                    // A failed page ends the stream early; it never aborts the run
                    warn!("sales page {} fetch failed, ending pagination: {}", page, e);
                    counter!("scrape_page_failures_total", "source" => source.clone())
                        .increment(1);
                    break;
                }
            };
            if sales.is_empty() {
                println!("⚠️ No more sales at page {page}.");
                break;
            }
            pages_fetched += 1;

            for sale in &sales {
                records_seen += 1;
                if !self.ingest_sale(sale, cutoff, &mut index).await {
                    records_skipped += 1;
                }
            }

            page += 1;
            // Soft rate-limit between pages
            tokio::time::sleep(self.page_delay).await;
        }

        info!("Portfolio index built: {} unique owners", index.owners());
        println!("📦 Portfolio index built. Unique owners: {}", index.owners());
        histogram!("scrape_pages_per_run", "source" => source.clone())
            .record(pages_fetched as f64);
        counter!("scrape_records_seen_total", "source" => source.clone())
            .increment(records_seen as u64);

        let unique_owners = index.owners();
        let investors = self.assemble(&index).await;

        histogram!("scrape_duration_seconds", "source" => source.clone())
            .record(t_run.elapsed().as_secs_f64());
        counter!("scrape_investors_total", "source" => source.clone())
            .increment(investors.len() as u64);
        info!("Final investor count: {}", investors.len());
        println!("🎉 FINAL INVESTOR COUNT: {}", investors.len());

        Ok(ScrapeSummary {
            source,
            pages_fetched,
            records_seen,
            records_skipped,
            unique_owners,
            investors,
        })
    }

    /// First pass: fold one sale record into the portfolio index.
    ///
    /// Returns false when the record is skipped: date outside the window,
    /// unparseable date, missing PIN or mailing address, or a failed detail
    /// fetch. No skip is fatal.
    async fn ingest_sale(
        &self,
        sale: &SaleRecord,
        cutoff: NaiveDate,
        index: &mut PortfolioIndex,
    ) -> bool {
        let Some(sale_date) = sale.sale_date.as_deref() else {
            return false;
        };
        let sale_day = match NaiveDate::parse_from_str(sale_date, "%Y-%m-%d") {
            Ok(day) => day,
            Err(e) => {
                debug!("skipping record with unparseable sale date {:?}: {}", sale_date, e);
                return false;
            }
        };
        if sale_day < cutoff {
            return false;
        }

        let Some(pin) = sale.pin.as_deref() else {
            debug!("skipping sale with no PIN");
            return false;
        };

        let detail = match self.api.fetch_property_detail(pin).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!("detail fetch failed for pin {}: {}", pin, e);
                counter!("scrape_detail_failures_total").increment(1);
                return false;
            }
        };

        let mailing_line = detail
            .mailing_address
            .as_ref()
            .map(|m| m.display_line())
            .unwrap_or_default();
        let mail_key = self.normalizer.street_key(&mailing_line);
        if mail_key.is_empty() {
            debug!("skipping pin {}: no usable mailing address", pin);
            return false;
        }

        let first_building = detail.buildings.first();
        let site_address = detail
            .site_address
            .clone()
            .or_else(|| sale.address.clone())
            .or_else(|| sale.site_address.clone())
            .unwrap_or_default();

        index.add(
            &mail_key,
            PropertyRecord {
                pin: pin.to_string(),
                folio: sale.display_folio.clone(),
                site_address,
                sale_price: sale.sale_price,
                sale_date: sale.sale_date.clone(),
                property_type: first_building
                    .and_then(|b| b.building_type.as_ref())
                    .and_then(|t| t.description.clone()),
                year_built: first_building.and_then(|b| b.year_built),
            },
        );
        true
    }

    /// Second pass: re-fetch a representative detail per multi-property
    /// group and apply the owner-occupancy and cash filters to it.
    #[instrument(skip(self, index))]
    async fn assemble(&self, index: &PortfolioIndex) -> Vec<InvestorProfile> {
        info!("Applying investor filters");
        println!("🔍 Applying investor filters...");
        let mut investors = Vec::new();

        for (key, entry) in index.iter() {
            if entry.count < 2 {
                continue; // one-off buyers are not investors
            }
            let Some(first) = entry.properties.first() else {
                continue;
            };

            // Aggregation may have run on a partially-built detail, so the
            // buyer's display name and mailing address come from a fresh
            // fetch of the group's first property.
            let detail = match self.api.fetch_property_detail(&first.pin).await {
                Ok(detail) => detail,
                Err(e) => {
                    warn!(
                        "skipping group {}: representative detail fetch failed: {}",
                        key, e
                    );
                    counter!("assemble_group_failures_total").increment(1);
                    continue;
                }
            };

            let buyer_name = detail.owner.as_deref().unwrap_or("").trim().to_string();
            let mailing_display = detail
                .mailing_address
                .as_ref()
                .map(|m| m.display_line())
                .unwrap_or_default();

            if self
                .buyers
                .is_owner_occupied(&first.site_address, &mailing_display, &buyer_name)
            {
                debug!("skipping group {}: owner occupied", key);
                continue;
            }
            if !self.purchases.is_cash_purchase(&detail) {
                debug!("skipping group {}: financed purchase", key);
                continue;
            }

            investors.push(InvestorProfile {
                buyer_name,
                mailing_address: mailing_display.trim().to_string(),
                portfolio_count: entry.count,
                tier: InvestorTier::from_count(entry.count),
                properties: entry.properties.clone(),
            });
        }
        investors
    }

    /// Persist investor profiles to a timestamped JSON file.
    pub fn persist_to_json(
        investors: &[InvestorProfile],
        source: &str,
        output_dir: &str,
    ) -> Result<String> {
        fs::create_dir_all(output_dir)?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{source}_investors_{timestamp}.json");
        let filepath = Path::new(output_dir).join(&filename);

        let json_content = serde_json::to_string_pretty(investors)?;
        fs::write(&filepath, json_content)?;

        Ok(filepath.to_string_lossy().to_string())
    }
}
