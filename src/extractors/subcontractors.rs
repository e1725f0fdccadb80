// src/extractors/subcontractors.rs

use crate::extractors::record::SubcontractorNode;
use crate::extractors::tables::{
    direct_cells, direct_rows, element_text, find_table_after_marker, own_text_nodes,
};
use crate::extractors::text::{normalize, normalize_str};
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

pub const SUBCONTRACTOR_SECTION_MARKER: &str = "Subcontractors";

// Rows above the first subcontractor (column captions).
const HEADER_ROWS: usize = 1;

const DEFAULT_TIER: u32 = 1;

static TIER_IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"img[src*="/images/img_sub_tier_"]"#)
        .expect("Failed to compile TIER_IMAGE_SELECTOR")
});

// ".../img_sub_tier_3.gif" -> 3
static TIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_(\d+)\.").expect("Failed to compile TIER_RE"));

/// Flat, source-ordered `(tier, node)` pairs from the subcontractor table.
/// Children are not linked yet; see `HierarchyBuilder`.
pub fn extract_subcontractor_rows(scope: ElementRef) -> Vec<(u32, SubcontractorNode)> {
    let Some(table) = find_table_after_marker(scope, SUBCONTRACTOR_SECTION_MARKER) else {
        tracing::debug!("No '{}' section found", SUBCONTRACTOR_SECTION_MARKER);
        return Vec::new();
    };

    let mut rows = Vec::new();
    for (index, row) in direct_rows(table).into_iter().enumerate().skip(HEADER_ROWS) {
        match parse_subcontractor_row(row) {
            Ok(pair) => rows.push(pair),
            Err(e) => tracing::error!("Error parsing subcontractor row {}: {}", index, e),
        }
    }
    tracing::debug!("Found {} subcontractor rows", rows.len());
    rows
}

pub fn parse_subcontractor_row(row: ElementRef) -> Result<(u32, SubcontractorNode), ExtractError> {
    let cells = direct_cells(row);
    let Some(name_cell) = cells.first() else {
        return Err(ExtractError::MalformedRow("subcontractor row has no cells".to_string()));
    };

    let tier = parse_tier(row)?;
    let type_of_goal = cells.get(1).and_then(|cell| goal_marker(*cell)).unwrap_or_default();

    let node = SubcontractorNode {
        name: subcontractor_name(*name_cell),
        tier,
        included_in_goal: !type_of_goal.is_empty(),
        type_of_goal,
        contracted_amount: cells.get(2).and_then(|cell| amount_with_share(*cell)),
        paid_amount: cells.get(3).and_then(|cell| amount_with_share(*cell)),
        more_subcontractors: Vec::new(),
    };
    Ok((tier, node))
}

/// Text of the second cell of each row of the table nested in the name cell.
/// Tables nested further down are part of that cell's text, not extra rows.
fn subcontractor_name(cell: ElementRef) -> String {
    let raw: String = cell
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "table")
        .flat_map(direct_rows)
        .filter_map(|tr| direct_cells(tr).get(1).copied())
        .map(element_text)
        .collect();
    normalize_str(&raw)
}

fn parse_tier(row: ElementRef) -> Result<u32, ExtractError> {
    let digits = row
        .select(&TIER_IMAGE_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .find_map(|src| TIER_RE.captures(src).map(|caps| caps[1].to_string()));

    let Some(digits) = digits else {
        return Ok(DEFAULT_TIER);
    };
    match digits.parse::<u32>() {
        Ok(tier) if tier >= 1 => Ok(tier),
        _ => Err(ExtractError::InvalidTier(digits)),
    }
}

fn goal_marker(cell: ElementRef) -> Option<String> {
    let alt = cell
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "img")
        .find_map(|img| img.value().attr("alt"));
    Some(normalize(alt)).filter(|alt| !alt.is_empty())
}

/// "$1,000" + "10%" -> "$1,000 (10%)". Anything but exactly two text nodes is absent.
fn amount_with_share(cell: ElementRef) -> Option<String> {
    match own_text_nodes(cell).as_slice() {
        [amount, share] => Some(format!("{} ({})", normalize_str(amount), normalize_str(share))),
        _ => None,
    }
}
