use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw sale transaction as returned by the county sales search.
///
/// Every field is optional and unknown fields are dropped: the feed is noisy
/// and a malformed record must deserialize rather than poison its page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleRecord {
    pub pin: Option<String>,
    pub display_folio: Option<String>,
    pub sale_date: Option<String>,
    pub sale_price: Option<f64>,
    pub address: Option<String>,
    pub site_address: Option<String>,
}

/// Enriched parcel record fetched per PIN.
///
/// The `extra` map carries every payload field the pipeline does not model
/// (including the source's mortgage indicator when present), so serializing
/// the struct reproduces the full payload for the financing-text fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyDetail {
    pub owner: Option<String>,
    pub mailing_address: Option<MailingAddress>,
    pub site_address: Option<String>,
    pub buildings: Vec<Building>,
    pub sales_history: Vec<SaleHistoryEntry>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MailingAddress {
    pub addr1: Option<String>,
    pub addr2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

impl MailingAddress {
    /// Single display line in "addr1 city state zip" order, matching how the
    /// county renders mailing addresses.
    pub fn display_line(&self) -> String {
        [&self.addr1, &self.city, &self.state, &self.zip]
            .iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Building {
    #[serde(rename = "type")]
    pub building_type: Option<BuildingType>,
    pub year_built: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingType {
    pub description: Option<String>,
}

/// One entry of a parcel's recorded transfer history, most recent first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleHistoryEntry {
    pub deed_type: Option<String>,
    pub date: Option<String>,
    pub price: Option<f64>,
}

/// Per-sale entry kept inside a portfolio group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub pin: String,
    pub folio: Option<String>,
    pub site_address: String,
    pub sale_price: Option<f64>,
    pub sale_date: Option<String>,
    pub property_type: Option<String>,
    pub year_built: Option<i32>,
}

/// Portfolio-size tier, a pure function of the property count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestorTier {
    Institutional,
    Large,
    MidSize,
    Small,
}

impl InvestorTier {
    pub fn from_count(count: usize) -> Self {
        match count {
            n if n >= 25 => Self::Institutional,
            n if n >= 10 => Self::Large,
            n if n >= 4 => Self::MidSize,
            _ => Self::Small,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Institutional => "Institutional (25+)",
            Self::Large => "Large (10-24)",
            Self::MidSize => "Mid-size (4-9)",
            Self::Small => "Small (2-3)",
        }
    }
}

impl fmt::Display for InvestorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final output entity for one multi-property buyer. Never mutated after
/// assembly.
#[derive(Debug, Clone, Serialize)]
pub struct InvestorProfile {
    pub buyer_name: String,
    pub mailing_address: String,
    pub portfolio_count: usize,
    pub tier: InvestorTier,
    pub properties: Vec<PropertyRecord>,
}

/// Core trait every property-records source must implement.
#[async_trait::async_trait]
pub trait PropertyApi: Send + Sync {
    /// Unique identifier for this source
    fn source_name(&self) -> &'static str;

    /// Fetch one page of recent sale transactions
    async fn fetch_sales_page(&self, page: u32, page_size: u32) -> Result<Vec<SaleRecord>>;

    /// Fetch the full parcel record for a PIN
    async fn fetch_property_detail(&self, pin: &str) -> Result<PropertyDetail>;
}
