// src/extractors/search.rs

use crate::extractors::tables::element_text;
use crate::extractors::text::normalize_str;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

// Result links look like: href="javascript: ViewDetail('3F2A9C01')"
static DETAIL_LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[href*="ViewDetail"]"#).expect("Failed to compile DETAIL_LINK_SELECTOR")
});

static CID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\(\s*['"]([A-Za-z0-9]+)['"]\s*\)"#).expect("Failed to compile CID_RE")
});

/// A search hit: the contract number as shown on the portal and the internal
/// content identifier used to address its detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMatch {
    pub contract_number: String,
    pub cid: String,
}

/// Finds the result link whose label equals `contract_number` (case-insensitive).
/// `None` means the portal returned no such contract.
pub fn find_contract_match(search_html: &str, contract_number: &str) -> Option<ContractMatch> {
    let wanted = normalize_str(contract_number).to_uppercase();
    let document = Html::parse_document(search_html);

    let mut candidates = 0usize;
    for link in document.select(&DETAIL_LINK_SELECTOR) {
        candidates += 1;
        let label = normalize_str(&element_text(link));
        let href = link.value().attr("href").unwrap_or_default();

        let Some(cid) = CID_RE.captures(href).map(|caps| caps[1].to_string()) else {
            tracing::warn!("Search result '{}' has no contract id in '{}'", label, href);
            continue;
        };

        if label.to_uppercase() == wanted {
            tracing::debug!("Matched '{}' -> CID {}", label, cid);
            return Some(ContractMatch {
                contract_number: label,
                cid,
            });
        }
    }

    tracing::warn!(
        "No match found for contract '{}' among {} search results",
        contract_number,
        candidates
    );
    None
}
