use crate::normalize::AddressNormalizer;
use crate::types::PropertyDetail;
use tracing::debug;

/// Classifies buyers from name and address signals.
#[derive(Debug, Clone)]
pub struct BuyerClassifier {
    entity_keywords: Vec<String>,
    normalizer: AddressNormalizer,
}

impl BuyerClassifier {
    pub fn new<I, S>(entity_keywords: I, normalizer: AddressNormalizer) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entity_keywords: entity_keywords
                .into_iter()
                .map(|k| k.into().to_uppercase())
                .collect(),
            normalizer,
        }
    }

    /// True iff the upper-cased name contains any business/trust keyword.
    pub fn is_entity(&self, name: &str) -> bool {
        let upper = name.to_uppercase();
        self.entity_keywords.iter().any(|k| upper.contains(k))
    }

    /// A purchase is owner-occupied only when the site and mailing street
    /// keys match exactly AND the buyer is not an entity. Empty or missing
    /// addresses never match.
    pub fn is_owner_occupied(&self, site_address: &str, mailing_address: &str, buyer_name: &str) -> bool {
        let site_key = self.normalizer.street_key(site_address);
        let mail_key = self.normalizer.street_key(mailing_address);

        if site_key.is_empty() || site_key != mail_key {
            return false;
        }
        if self.is_entity(buyer_name) {
            // Matching addresses but a business buyer is still an investment
            return false;
        }
        true
    }
}

/// Classifies purchases as cash transactions from deed and financing signals.
#[derive(Debug, Clone)]
pub struct PurchaseClassifier {
    investor_deed_types: Vec<String>,
}

impl PurchaseClassifier {
    pub fn new<I, S>(investor_deed_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            investor_deed_types: investor_deed_types
                .into_iter()
                .map(|d| d.into().to_uppercase())
                .collect(),
        }
    }

    /// Best-effort cash signal, not a ground-truth determination.
    ///
    /// The most recent transfer's deed type decides when it belongs to the
    /// non-financed set. Otherwise (including an empty history) the fallback
    /// is absence of evidence: cash iff the serialized payload mentions no
    /// financing anywhere. The source exposes no explicit financing flag.
    pub fn is_cash_purchase(&self, detail: &PropertyDetail) -> bool {
        if let Some(deed) = detail
            .sales_history
            .first()
            .and_then(|entry| entry.deed_type.as_deref())
        {
            let deed = deed.trim().to_uppercase();
            if self.investor_deed_types.iter().any(|d| *d == deed) {
                return true;
            }
        }

        match serde_json::to_string(detail) {
            Ok(text) => !text.to_lowercase().contains("mortgage"),
            Err(e) => {
                debug!("could not serialize detail for financing scan: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::types::SaleHistoryEntry;

    fn buyers() -> BuyerClassifier {
        let filters = FilterConfig::default();
        BuyerClassifier::new(filters.entity_keywords, AddressNormalizer::default())
    }

    fn purchases() -> PurchaseClassifier {
        PurchaseClassifier::new(FilterConfig::default().investor_deed_types)
    }

    fn detail_with_deed(deed: &str) -> PropertyDetail {
        PropertyDetail {
            sales_history: vec![SaleHistoryEntry {
                deed_type: Some(deed.to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn entity_keywords_match_anywhere_in_name() {
        let b = buyers();
        assert!(b.is_entity("ACME HOLDINGS LLC"));
        assert!(b.is_entity("sunrise properties of tampa"));
        assert!(b.is_entity("SMITH FAMILY TRUST"));
        assert!(!b.is_entity("JOHN SMITH"));
        assert!(!b.is_entity(""));
    }

    #[test]
    fn owner_occupied_requires_matching_street_keys() {
        let b = buyers();
        assert!(b.is_owner_occupied("123 Main St, Tampa FL", "123 MAIN ST TAMPA FL 33601", "JOHN SMITH"));
        assert!(!b.is_owner_occupied("123 Main St", "456 Oak Ave", "JOHN SMITH"));
    }

    #[test]
    fn owner_occupied_is_false_for_entities_even_on_match() {
        let b = buyers();
        assert!(!b.is_owner_occupied("123 Main St", "123 Main St", "ACME HOLDINGS LLC"));
    }

    #[test]
    fn owner_occupied_is_false_for_missing_addresses() {
        let b = buyers();
        assert!(!b.is_owner_occupied("", "", "JOHN SMITH"));
        assert!(!b.is_owner_occupied("123 Main St", "", "JOHN SMITH"));
    }

    #[test]
    fn recent_deed_in_investor_set_is_cash() {
        let p = purchases();
        assert!(p.is_cash_purchase(&detail_with_deed("WD")));
        assert!(p.is_cash_purchase(&detail_with_deed(" qc ")));
    }

    #[test]
    fn unknown_deed_falls_back_to_financing_scan() {
        let p = purchases();
        // No financing text anywhere in the payload
        assert!(p.is_cash_purchase(&detail_with_deed("XX")));

        let mut financed = detail_with_deed("XX");
        financed.extra.insert(
            "mortgageHolder".to_string(),
            serde_json::Value::String("EXAMPLE BANK NA".to_string()),
        );
        assert!(!p.is_cash_purchase(&financed));
    }

    #[test]
    fn empty_history_without_financing_text_is_cash() {
        let p = purchases();
        assert!(p.is_cash_purchase(&PropertyDetail::default()));
    }
}
