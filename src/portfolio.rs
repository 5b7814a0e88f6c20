use crate::types::PropertyRecord;
use std::collections::HashMap;

/// One mailing-address group: total purchase count plus the derived records
/// in arrival order.
///
/// The count tracks every record ever added under the key, independently of
/// the list, so later filtering of groups can never understate portfolio
/// size.
#[derive(Debug, Clone, Default)]
pub struct PortfolioEntry {
    pub count: usize,
    pub properties: Vec<PropertyRecord>,
}

/// Mapping from normalized mailing key to everything purchased under that
/// address. Built incrementally as pages stream in; order of insertion is
/// preserved within a group. Duplicate PINs are counted per occurrence, the
/// same way the source paginates them.
#[derive(Debug, Default)]
pub struct PortfolioIndex {
    groups: HashMap<String, PortfolioEntry>,
}

impl PortfolioIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, record: PropertyRecord) {
        let entry = self.groups.entry(key.to_string()).or_default();
        entry.count += 1;
        entry.properties.push(record);
    }

    pub fn count(&self, key: &str) -> usize {
        self.groups.get(key).map(|entry| entry.count).unwrap_or(0)
    }

    /// Number of distinct mailing keys seen.
    pub fn owners(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PortfolioEntry)> {
        self.groups.iter().map(|(key, entry)| (key.as_str(), entry))
    }
}
