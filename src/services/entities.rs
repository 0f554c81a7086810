//! Entity Extraction
//!
//! Pulls companies and tickers out of report text so a thread can show which
//! securities its reports have covered.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::services::report::html::block_text;

/// Exchanges recognised in `Company (EXCHANGE: TICKER)` mentions.
const EXCHANGES: &str = "NASDAQ|NYSE|NYSEARCA|AMEX|OTC|LSE|TSX|HKEX|ASX|TSE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Company,
    Ticker,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Company => "company",
            EntityKind::Ticker => "ticker",
        }
    }
}

/// An entity found in one report, with its mention count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    pub kind: EntityKind,
    pub mentions: u32,
}

fn qualified_ticker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"((?:[A-Z][A-Za-z0-9&'.\-]*[ \t]+){{0,4}}[A-Z][A-Za-z0-9&'.\-]*)[ \t]*\((?:{}):\s*([A-Z]{{1,5}}(?:\.[A-Z])?)\)",
            EXCHANGES
        );
        Regex::new(&pattern).unwrap_or_else(|e| panic!("ticker pattern is valid: {}", e))
    })
}

fn cashtag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\w$])\$([A-Z]{1,5})\b")
            .unwrap_or_else(|e| panic!("cashtag pattern is valid: {}", e))
    })
}

/// Extract companies and tickers from report HTML.
///
/// Entities are de-duplicated by kind and case-insensitive name and returned
/// in order of first mention.
pub fn extract_entities(html: &str) -> Vec<ExtractedEntity> {
    let text = block_text(html);
    let mut entities: Vec<ExtractedEntity> = Vec::new();
    let mut index: HashMap<(EntityKind, String), usize> = HashMap::new();

    let mut record = |name: &str, kind: EntityKind| {
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            return;
        }
        let key = (kind, name.to_lowercase());
        match index.get(&key) {
            Some(&i) => entities[i].mentions += 1,
            None => {
                index.insert(key, entities.len());
                entities.push(ExtractedEntity {
                    name,
                    kind,
                    mentions: 1,
                });
            }
        }
    };

    for caps in qualified_ticker_regex().captures_iter(&text) {
        if let Some(company) = caps.get(1) {
            record(company.as_str(), EntityKind::Company);
        }
        if let Some(ticker) = caps.get(2) {
            record(ticker.as_str(), EntityKind::Ticker);
        }
    }

    for caps in cashtag_regex().captures_iter(&text) {
        if let Some(ticker) = caps.get(1) {
            record(ticker.as_str(), EntityKind::Ticker);
        }
    }

    entities
}
