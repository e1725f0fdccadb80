// src/extractors/record.rs

use crate::extractors::award::extract_award_summary;
use crate::extractors::fields::{extract_contract_info, HeaderField};
use crate::extractors::hierarchy::HierarchyBuilder;
use crate::extractors::subcontractors::extract_subcontractor_rows;
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// The detail page wraps everything of interest in this form.
static PAGE_FORM_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"form[name="PageForm"]"#).expect("Failed to compile PAGE_FORM_SELECTOR")
});

static ANY_ELEMENT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body *").expect("Failed to compile ANY_ELEMENT_SELECTOR"));

// --- Data Structures ---
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInformation {
    pub contract_description: String,
    pub contract_number: String,
    pub organization: String,
    pub status: String,
    pub dates: String,
    pub prime_contractor: String,
}

impl ContractInformation {
    pub fn field_mut(&mut self, field: HeaderField) -> &mut String {
        match field {
            HeaderField::ContractDescription => &mut self.contract_description,
            HeaderField::ContractNumber => &mut self.contract_number,
            HeaderField::Organization => &mut self.organization,
            HeaderField::Status => &mut self.status,
            HeaderField::Dates => &mut self.dates,
            HeaderField::PrimeContractor => &mut self.prime_contractor,
        }
    }
}

/// One row of the "Award & Payment Summary" table. Optional columns are
/// `None` when the row was too short to hold them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardSummaryEntry {
    pub award: Option<String>,
    pub award_percentage: Option<String>,
    pub payments: Option<String>,
    pub payments_percentage: Option<String>,
    #[serde(default)]
    pub difference: String,
}

/// Keyed by category slug ("mbe_goal"). Later duplicate rows overwrite earlier ones.
pub type AwardSummary = BTreeMap<String, AwardSummaryEntry>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcontractorNode {
    pub name: String,
    pub tier: u32,
    pub type_of_goal: String,
    pub included_in_goal: bool,
    pub contracted_amount: Option<String>,
    pub paid_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub more_subcontractors: Vec<SubcontractorNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub contract_info: ContractInformation,
    pub award_summary: AwardSummary,
    pub subcontractors: Vec<SubcontractorNode>,
}

// --- Assembler ---

/// Parses a contract detail page (full page or just its form) into a record.
///
/// Fails only when the header fields cannot be extracted at all. Missing award
/// or subcontractor sections yield an empty map / list.
pub fn parse_contract_page(html: &str) -> Result<ContractRecord, ExtractError> {
    if html.trim().is_empty() {
        tracing::error!("No HTML content provided for extraction");
        return Err(ExtractError::EmptyDocument);
    }

    let document = Html::parse_document(html);
    if document.select(&ANY_ELEMENT_SELECTOR).next().is_none() {
        tracing::error!("Document contains no markup ({} bytes of text)", html.len());
        return Err(ExtractError::HtmlParseError("document contains no elements".to_string()));
    }

    let scope = contract_scope(&document);
    let contract_info = extract_contract_info(scope)?;
    let award_summary = extract_award_summary(scope);

    let mut builder = HierarchyBuilder::new();
    for (tier, row) in extract_subcontractor_rows(scope) {
        builder.push(tier, row);
    }
    if builder.is_empty() {
        tracing::debug!("Contract has no subcontractor rows");
    } else {
        tracing::debug!("Building hierarchy from {} subcontractor rows", builder.len());
    }
    let subcontractors = builder.finish();

    tracing::info!(
        "Parsed contract '{}': {} award categories, {} top-level subcontractors",
        contract_info.contract_number,
        award_summary.len(),
        subcontractors.len()
    );

    Ok(ContractRecord {
        contract_info,
        award_summary,
        subcontractors,
    })
}

/// `parse_contract_page` with failures flattened to `None`, for batch callers
/// that record a null result per contract.
pub fn parse_contract_page_opt(html: &str) -> Option<ContractRecord> {
    match parse_contract_page(html) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::error!("Error extracting data: {}", e);
            None
        }
    }
}

fn contract_scope(document: &Html) -> ElementRef<'_> {
    match document.select(&PAGE_FORM_SELECTOR).next() {
        Some(form) => form,
        None => {
            tracing::debug!("No PageForm element, extracting from the whole document");
            document.root_element()
        }
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_PAGE: &str = r#"
        <html><body>
        <div id="nav"><table><tr><td>Status:</td><td><strong>navigation noise</strong></td></tr></table></div>
        <form name="PageForm" method="post">
          <table>
            <tr><td>Contract Description:</td><td><strong>Signal Upgrade</strong></td></tr>
            <tr><td>Contract Number:</td><td><strong>P36719</strong></td></tr>
            <tr><td colspan="2"><strong>MTA Construction &amp; Development</strong></td></tr>
            <tr><td>Status:</td><td><strong>Open</strong></td></tr>
            <tr><td>Dates:</td><td><strong>3/1/2021 - 2/28/2026</strong></td></tr>
            <tr><td>Prime Contractor:</td><td><strong>Prime Co</strong></td></tr>
          </table>
          <table><tr><td><b>Award &amp; Payment Summary</b></td></tr></table>
          <table>
            <tr><td></td><td>Award</td><td>%</td><td>Payments</td><td>%</td><td>Difference</td></tr>
            <tr><td>MBE Goal</td><td>$100</td><td>10%</td><td>$50</td><td>5%</td><td>$50</td></tr>
            <tr><td>WBE  Goal</td><td>$200</td><td>20%</td></tr>
          </table>
          <table><tr><td><b>Subcontractors</b></td></tr></table>
          <table>
            <tr><td>Name</td><td>Goal</td><td>Contracted</td><td>Paid</td></tr>
            <tr>
              <td><table><tr><td><img src="/images/img_sub_tier_1.gif"></td><td>Alpha Inc</td></tr></table></td>
              <td><img src="/images/goal.gif" alt="MBE"></td>
              <td>$1,000<br>10%</td>
              <td>$500<br>5%</td>
            </tr>
            <tr>
              <td><table><tr><td><img src="/images/img_sub_tier_2.gif"></td><td>Beta <i>LLC</i></td></tr></table></td>
              <td></td>
              <td>$300</td>
              <td></td>
            </tr>
            <tr>
              <td><table><tr><td><img src="/images/img_sub_tier_1.gif"></td><td>Gamma Corp</td></tr></table></td>
              <td><img src="/images/goal.gif" alt="WBE"></td>
              <td>$700<br>7%</td>
              <td>$0<br>0%</td>
            </tr>
          </table>
        </form>
        </body></html>
    "#;

    #[test]
    fn test_full_detail_page() {
        let record = parse_contract_page(DETAIL_PAGE).unwrap();

        assert_eq!(record.contract_info.contract_number, "P36719");
        assert_eq!(record.contract_info.organization, "MTA Construction & Development");
        // scoped to the form: the navigation table is never consulted
        assert_eq!(record.contract_info.status, "Open");

        let mbe = &record.award_summary["mbe_goal"];
        assert_eq!(mbe.award.as_deref(), Some("$100"));
        assert_eq!(mbe.payments_percentage.as_deref(), Some("5%"));
        assert_eq!(mbe.difference, "$50");
        let wbe = &record.award_summary["wbe_goal"];
        assert_eq!(wbe.award_percentage.as_deref(), Some("20%"));
        assert_eq!(wbe.payments, None);
        assert_eq!(wbe.difference, "");
        assert_eq!(record.award_summary.len(), 2);

        assert_eq!(record.subcontractors.len(), 2);
        let alpha = &record.subcontractors[0];
        assert_eq!(alpha.name, "Alpha Inc");
        assert_eq!(alpha.contracted_amount.as_deref(), Some("$1,000 (10%)"));
        assert!(alpha.included_in_goal);
        assert_eq!(alpha.more_subcontractors.len(), 1);
        let beta = &alpha.more_subcontractors[0];
        assert_eq!(beta.name, "Beta LLC");
        assert_eq!(beta.tier, 2);
        assert!(!beta.included_in_goal);
        assert_eq!(beta.contracted_amount, None);
        assert_eq!(record.subcontractors[1].name, "Gamma Corp");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = parse_contract_page(DETAIL_PAGE).unwrap();
        let second = parse_contract_page(DETAIL_PAGE).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_json_shape() {
        let record = parse_contract_page(DETAIL_PAGE).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("contract_info").is_some());
        assert!(value.get("award_summary").is_some());
        let subs = value["subcontractors"].as_array().unwrap();
        assert!(subs[0].get("more_subcontractors").is_some());
        // leaf nodes carry no children key, absent amounts are null
        let beta = &subs[0]["more_subcontractors"][0];
        assert!(beta.get("more_subcontractors").is_none());
        assert!(beta["contracted_amount"].is_null());
        assert_eq!(beta["tier"], 2);
    }

    #[test]
    fn test_missing_sections_are_tolerated() {
        let html = r#"<table>
            <tr><td>Contract Number:</td><td><strong>TN87</strong></td></tr>
        </table>"#;
        let record = parse_contract_page(html).unwrap();
        assert_eq!(record.contract_info.contract_number, "TN87");
        assert_eq!(record.contract_info.status, "");
        assert!(record.award_summary.is_empty());
        assert!(record.subcontractors.is_empty());
    }

    #[test]
    fn test_total_failure_returns_none() {
        assert_eq!(parse_contract_page(""), Err(ExtractError::EmptyDocument));
        assert_eq!(parse_contract_page("   \n"), Err(ExtractError::EmptyDocument));
        assert!(matches!(
            parse_contract_page("just some plain text"),
            Err(ExtractError::HtmlParseError(_))
        ));
        assert!(parse_contract_page_opt("").is_none());
        assert!(parse_contract_page_opt("<p>Service unavailable</p>").is_none());
    }
}
