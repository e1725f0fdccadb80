// src/extractors/tables.rs
//
// DOM helpers shared by the extractors. The portal lays every section out as
// nested tables, so "find the table after the one that says X" and "direct
// rows / cells of a table" are the only structural primitives needed.

use once_cell::sync::Lazy;
use scraper::{node::Node, ElementRef, Selector};

static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("Failed to compile TABLE_SELECTOR"));

/// Concatenated text of every descendant text node.
pub fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

/// Text nodes that are direct children of `element`, unmodified.
pub fn own_text_nodes<'a>(element: ElementRef<'a>) -> Vec<&'a str> {
    element
        .children()
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some(&**text),
            _ => None,
        })
        .collect()
}

/// Rows belonging to `table` itself, looking through `thead`/`tbody`/`tfoot`
/// wrappers but never into nested tables.
pub fn direct_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| el.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

/// `td` children of a row, in order.
pub fn direct_cells<'a>(row: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect()
}

/// The row following `row` inside the same row group.
pub fn next_row<'a>(row: ElementRef<'a>) -> Option<ElementRef<'a>> {
    row.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "tr")
}

/// The next `td` sibling of `cell`.
pub fn next_cell<'a>(cell: ElementRef<'a>) -> Option<ElementRef<'a>> {
    cell.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "td")
}

/// Tables under `scope` whose text contains `marker` and that hold no nested
/// table also containing it. Document order.
pub fn innermost_tables_containing<'a>(scope: ElementRef<'a>, marker: &str) -> Vec<ElementRef<'a>> {
    scope
        .select(&TABLE_SELECTOR)
        .filter(|table| element_text(*table).contains(marker))
        .filter(|table| {
            !table
                .select(&TABLE_SELECTOR)
                .any(|inner| element_text(inner).contains(marker))
        })
        .collect()
}

/// Locates the first sibling `table` following a table that carries `marker`.
/// When the marker table is the last table in its cell, the tables wrapping it
/// (up to `scope`) are tried from the inside out.
pub fn find_table_after_marker<'a>(scope: ElementRef<'a>, marker: &str) -> Option<ElementRef<'a>> {
    for marker_table in innermost_tables_containing(scope, marker) {
        let mut current = Some(marker_table);
        while let Some(table) = current {
            if let Some(following) = following_table(table) {
                tracing::trace!("Found table following marker '{}'", marker);
                return Some(following);
            }
            current = enclosing_table(table, scope);
        }
        tracing::trace!("Marker table for '{}' has no following table, trying next", marker);
    }
    None
}

fn following_table(table: ElementRef) -> Option<ElementRef> {
    table
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
}

fn enclosing_table<'a>(element: ElementRef<'a>, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .take_while(|node| node.id() != scope.id())
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_direct_rows_with_and_without_tbody() {
        let html = r#"<table id="t"><tr><td>a</td></tr><tr><td>b<table><tr><td>nested</td></tr></table></td></tr></table>"#;
        let doc = Html::parse_document(html);
        let table = doc.select(&Selector::parse("#t").unwrap()).next().unwrap();
        // html5ever synthesizes a tbody; rows of the nested table are not included
        let rows = direct_rows(table);
        assert_eq!(rows.len(), 2);
        assert_eq!(direct_cells(rows[1]).len(), 1);
    }

    #[test]
    fn test_find_table_after_marker_prefers_innermost() {
        let html = r#"
            <table id="outer"><tr><td>
                <table><tr><td>Award &amp; Payment Summary</td></tr></table>
                <p>spacer</p>
                <table id="data"><tr><td>MBE Goal</td></tr></table>
            </td></tr></table>
            <table id="footer"><tr><td>footer</td></tr></table>
        "#;
        let doc = Html::parse_document(html);
        let table = find_table_after_marker(doc.root_element(), "Award & Payment Summary").unwrap();
        assert_eq!(table.value().attr("id"), Some("data"));
    }

    #[test]
    fn test_find_table_after_marker_climbs_wrapper_tables() {
        let html = r#"
            <form name="PageForm">
              <table><tr><td>
                <table><tr><td><b>Subcontractors</b></td></tr></table>
              </td></tr></table>
              <table id="data"><tr><td>Name</td></tr></table>
            </form>
        "#;
        let doc = Html::parse_document(html);
        let form = doc.select(&Selector::parse("form").unwrap()).next().unwrap();
        let table = find_table_after_marker(form, "Subcontractors").unwrap();
        assert_eq!(table.value().attr("id"), Some("data"));
    }

    #[test]
    fn test_find_table_after_marker_stays_inside_scope() {
        let html = r#"
            <table id="scope"><tr><td>
                <table><tr><td>Subcontractors</td></tr></table>
            </td></tr></table>
            <table id="outside"><tr><td>x</td></tr></table>
        "#;
        let doc = Html::parse_document(html);
        let scope = doc.select(&Selector::parse("#scope td").unwrap()).next().unwrap();
        assert!(find_table_after_marker(scope, "Subcontractors").is_none());
    }

    #[test]
    fn test_find_table_after_marker_missing() {
        let doc = Html::parse_document("<table><tr><td>Nothing here</td></tr></table>");
        assert!(find_table_after_marker(doc.root_element(), "Subcontractors").is_none());
    }

    #[test]
    fn test_own_text_nodes_skips_elements() {
        let doc = Html::parse_document("<table><tr><td id=\"c\">$100<br>50%<span>x</span></td></tr></table>");
        let cell = doc.select(&Selector::parse("#c").unwrap()).next().unwrap();
        assert_eq!(own_text_nodes(cell), vec!["$100", "50%"]);
    }
}
