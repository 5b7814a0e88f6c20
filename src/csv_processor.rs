use crate::classify::BuyerClassifier;
use crate::config::Config;
use crate::error::Result;
use crate::normalize::AddressNormalizer;
use crate::types::InvestorTier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Input row from a bulk sales export.
#[derive(Debug, Clone, Deserialize)]
pub struct SalesCsvRow {
    #[serde(rename = "SiteAddress", default)]
    pub site_address: String,
    #[serde(rename = "MailingAddress1", default)]
    pub mailing_address: String,
    #[serde(rename = "Owner1", default)]
    pub owner1: String,
    #[serde(rename = "Owner2", default)]
    pub owner2: String,
}

/// Output row of the filtered investor table.
#[derive(Debug, Clone, Serialize)]
pub struct CsvInvestorRow {
    #[serde(rename = "SiteAddress")]
    pub site_address: String,
    #[serde(rename = "MailingAddress1")]
    pub mailing_address: String,
    #[serde(rename = "Owner1")]
    pub owner1: String,
    #[serde(rename = "Owner2")]
    pub owner2: String,
    #[serde(rename = "SiteStreet")]
    pub site_street: String,
    #[serde(rename = "MailStreet")]
    pub mail_street: String,
    #[serde(rename = "PortfolioCount")]
    pub portfolio_count: usize,
    #[serde(rename = "InvestorType")]
    pub investor_type: String,
}

/// Alternate tabular pipeline: the same investor rules as the fetched
/// pipeline, reimplemented over rows of a delimited sales file.
pub struct CsvProcessor {
    normalizer: AddressNormalizer,
    buyers: BuyerClassifier,
}

impl CsvProcessor {
    pub fn new(normalizer: AddressNormalizer, buyers: BuyerClassifier) -> Self {
        Self { normalizer, buyers }
    }

    pub fn from_config(config: &Config) -> Self {
        let normalizer = AddressNormalizer::new(config.filters.stop_words.clone());
        let buyers = BuyerClassifier::new(
            config.filters.entity_keywords.clone(),
            normalizer.clone(),
        );
        Self::new(normalizer, buyers)
    }

    /// Keep rows that are not owner-occupied and whose mailing address bought
    /// at least two properties in the file. Malformed rows are skipped, not
    /// fatal.
    pub fn process_sales_csv<P: AsRef<Path>>(&self, path: P) -> Result<Vec<CsvInvestorRow>> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut rows = Vec::new();
        for (i, result) in reader.deserialize::<SalesCsvRow>().enumerate() {
            match result {
                Ok(row) => rows.push(row),
                // +2: header line plus 1-based numbering
                Err(e) => warn!("skipping malformed CSV row {}: {}", i + 2, e),
            }
        }

        // Portfolio size by the raw mailing-address column, duplicates included
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in &rows {
            *counts.entry(row.mailing_address.as_str()).or_insert(0) += 1;
        }

        let mut investors = Vec::new();
        for row in &rows {
            let portfolio_count = counts
                .get(row.mailing_address.as_str())
                .copied()
                .unwrap_or(0);
            let site_street = self.normalizer.street_key(&row.site_address);
            let mail_street = self.normalizer.street_key(&row.mailing_address);
            let owner_occupied = !site_street.is_empty()
                && site_street == mail_street
                && !self.buyers.is_entity(&row.owner1)
                && !self.buyers.is_entity(&row.owner2);

            if owner_occupied || portfolio_count < 2 {
                continue;
            }

            investors.push(CsvInvestorRow {
                site_address: row.site_address.clone(),
                mailing_address: row.mailing_address.clone(),
                owner1: row.owner1.clone(),
                owner2: row.owner2.clone(),
                site_street,
                mail_street,
                portfolio_count,
                investor_type: InvestorTier::from_count(portfolio_count).label().to_string(),
            });
        }

        info!(
            "CSV pipeline kept {} investor rows of {}",
            investors.len(),
            rows.len()
        );
        Ok(investors)
    }

    pub fn write_investors_csv<P: AsRef<Path>>(
        &self,
        rows: &[CsvInvestorRow],
        path: P,
    ) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
