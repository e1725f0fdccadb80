// src/extractors/award.rs

use crate::extractors::record::{AwardSummary, AwardSummaryEntry};
use crate::extractors::tables::{direct_cells, direct_rows, element_text, find_table_after_marker};
use crate::extractors::text::{category_key, normalize_str};
use scraper::ElementRef;

pub const AWARD_SECTION_MARKER: &str = "Award & Payment Summary";

/// Reads the table that follows the "Award & Payment Summary" heading.
/// A missing section yields an empty map.
pub fn extract_award_summary(scope: ElementRef) -> AwardSummary {
    let mut summary = AwardSummary::new();

    let Some(table) = find_table_after_marker(scope, AWARD_SECTION_MARKER) else {
        tracing::debug!("No '{}' section found", AWARD_SECTION_MARKER);
        return summary;
    };

    for row in direct_rows(table) {
        let cells: Vec<String> = direct_cells(row)
            .into_iter()
            .map(|td| normalize_str(&element_text(td)))
            .collect();

        let Some((key, entry)) = parse_award_row(&cells) else {
            tracing::trace!("Skipping award row without category: {:?}", cells);
            continue;
        };
        if summary.insert(key.clone(), entry).is_some() {
            tracing::debug!("Award category '{}' appears twice, keeping the later row", key);
        }
    }

    summary
}

/// `None` for rows that carry no category (headers, spacers). Any other
/// first-cell text becomes the key, punctuation included.
pub fn parse_award_row(cells: &[String]) -> Option<(String, AwardSummaryEntry)> {
    let label = cells.first().filter(|c| !c.is_empty())?;
    let key = category_key(label);

    let column = |i: usize| cells.get(i).cloned();
    let entry = AwardSummaryEntry {
        award: column(1),
        award_percentage: column(2),
        payments: column(3),
        payments_percentage: column(4),
        difference: column(5).unwrap_or_default(),
    };
    Some((key, entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_full_row() {
        let (key, entry) = parse_award_row(&cells(&["MBE Goal", "$10", "1%", "$5", "0.5%", "$5"])).unwrap();
        assert_eq!(key, "mbe_goal");
        assert_eq!(entry.award.as_deref(), Some("$10"));
        assert_eq!(entry.payments_percentage.as_deref(), Some("0.5%"));
        assert_eq!(entry.difference, "$5");
    }

    #[test]
    fn test_short_row_leaves_columns_absent() {
        let (_, entry) = parse_award_row(&cells(&["SDVOB", "$10"])).unwrap();
        assert_eq!(entry.award.as_deref(), Some("$10"));
        assert_eq!(entry.award_percentage, None);
        assert_eq!(entry.payments, None);
        assert_eq!(entry.difference, "");
    }

    #[test]
    fn test_rows_without_label_are_skipped() {
        assert_eq!(parse_award_row(&[]), None);
        assert_eq!(parse_award_row(&cells(&["", "Award", "%"])), None);
    }

    #[test]
    fn test_punctuation_label_is_kept_as_key() {
        let (key, entry) = parse_award_row(&cells(&["—", "$1"])).unwrap();
        assert_eq!(key, "—");
        assert_eq!(entry.award.as_deref(), Some("$1"));
    }

    #[test]
    fn test_extract_table_with_duplicates_and_junk() {
        let html = r#"
            <table><tr><td>Award &amp; Payment Summary</td></tr></table>
            <table>
              <thead><tr><th>Category</th><th>Award</th></tr></thead>
              <tbody>
                <tr><td>MBE Goal</td><td>$1</td></tr>
                <tr><td>-</td><td></td></tr>
                <tr><td>
                    MBE
                    Goal</td><td>$2</td></tr>
                <tr><td>Total</td><td>$3</td><td>3%</td><td>$3</td><td>3%</td><td>$0</td><td>extra</td></tr>
              </tbody>
            </table>
        "#;
        let doc = Html::parse_document(html);
        let summary = extract_award_summary(doc.root_element());
        assert_eq!(summary.len(), 3);
        assert_eq!(summary["-"].award.as_deref(), Some(""));
        assert_eq!(summary["mbe_goal"].award.as_deref(), Some("$2"));
        assert_eq!(summary["total"].difference, "$0");
    }

    #[test]
    fn test_missing_section_is_empty() {
        let doc = Html::parse_document("<table><tr><td>Contract Number</td></tr></table>");
        assert!(extract_award_summary(doc.root_element()).is_empty());
    }
}
