use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,.]").expect("valid regex"));

/// Canonicalizes free-text addresses into comparable street-level keys.
///
/// Matching is exact string equality after normalization; there is no fuzzy
/// matching and no geocoding. Two spellings of the same place that normalize
/// differently simply fail to group, an accepted precision/recall tradeoff.
#[derive(Debug, Clone)]
pub struct AddressNormalizer {
    stop_words: HashSet<String>,
}

impl AddressNormalizer {
    /// `stop_words` are the city names and state codes that terminate the
    /// street portion of an unpunctuated address.
    pub fn new<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stop_words: stop_words.into_iter().map(|w| w.into().to_uppercase()).collect(),
        }
    }

    /// Uppercase, strip commas/periods, collapse whitespace runs, trim.
    pub fn normalize(&self, raw: &str) -> String {
        let upper = raw.to_uppercase();
        let stripped = PUNCTUATION.replace_all(&upper, "");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Extract only the street-level portion (house number + street name).
    ///
    /// A comma ends the street outright; otherwise tokens accumulate until
    /// the first stop-word, which is discarded along with everything after.
    pub fn street_only(&self, raw: &str) -> String {
        let upper = raw.to_uppercase();
        if let Some((street, _rest)) = upper.split_once(',') {
            return street.trim().to_string();
        }

        let mut street_tokens = Vec::new();
        for token in upper.split_whitespace() {
            if self.stop_words.contains(token) {
                break;
            }
            street_tokens.push(token);
        }
        street_tokens.join(" ")
    }

    /// The grouping/matching key: `normalize(street_only(raw))`. Idempotent.
    pub fn street_key(&self, raw: &str) -> String {
        self.normalize(&self.street_only(raw))
    }
}

impl Default for AddressNormalizer {
    fn default() -> Self {
        Self::new(crate::config::FilterConfig::default().stop_words)
    }
}
