// src/utils/html_debug.rs
use crate::utils::error::AppError;
use std::fs;
use std::path::{Path, PathBuf};

/// Anchors the extractors rely on. A detail page where one of these is not
/// highlighted explains an empty field or section in the record.
pub const DETAIL_PAGE_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)Award\s*(?:&amp;|&)\s*Payment\s*Summary", "section"),
    (r"(?i)>\s*Subcontractors\s*<", "section"),
    (r#"(?i)<form[^>]*name=['"]?PageForm['"]?[^>]*>"#, "section"),
    (r"Contract\s+Description|Contract\s+Number|Prime\s+Contractor", "label"),
    (r">\s*(?:Status|Dates)\s*:?\s*<", "label"),
    (r"/images/img_sub_tier_\d+\.\w+", "tier"),
    (r#"<img[^>]*\balt=['"][^'"]+['"][^>]*>"#, "goal"),
];

/// Saves a HTML snippet to a file with debug highlights
pub fn save_debug_html(html: &str, filename: &Path, highlights: &[(usize, usize, &str)]) -> Result<(), AppError> {
    // Add debug styling in head
    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<style>\n");

    // CSS for highlight colors
    debug_html.push_str(".highlight-section { background-color: #FFFF00; }\n");
    debug_html.push_str(".highlight-label { background-color: #90EE90; }\n");
    debug_html.push_str(".highlight-tier { background-color: #ADD8E6; }\n");
    debug_html.push_str(".highlight-goal { background-color: #FFA500; }\n");
    debug_html.push_str(".highlight-custom { background-color: #FFC0CB; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n");

    let mut last_pos = 0;
    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| (h.0, std::cmp::Reverse(h.1))); // Sort by position, longest first

    for (start, end, highlight_type) in sorted_highlights {
        // overlapping matches would duplicate text
        if start < last_pos || end > html.len() {
            continue;
        }
        debug_html.push_str(&html[last_pos..start]);

        let css_class = match highlight_type {
            "section" => "highlight-section",
            "label" => "highlight-label",
            "tier" => "highlight-tier",
            "goal" => "highlight-goal",
            _ => "highlight-custom",
        };

        debug_html.push_str(&format!("<span class=\"{}\" title=\"Position: {}-{}, Type: {}\">",
            css_class, start, end, highlight_type));
        debug_html.push_str(&html[start..end]);
        debug_html.push_str("</span>");

        last_pos = end;
    }

    // Add any remaining content
    if last_pos < html.len() {
        debug_html.push_str(&html[last_pos..]);
    }
    debug_html.push_str("\n</body>\n</html>");

    fs::write(filename, debug_html)?;
    tracing::debug!("Saved debug HTML to {}", filename.display());
    Ok(())
}

/// Creates a debug version of an HTML document with locations of specified regex patterns highlighted
pub fn create_debug_html(html: &str, filename: &Path, patterns: &[(&str, &str)]) -> Result<(), AppError> {
    use regex::Regex;

    let mut highlights = Vec::new();

    for (pattern, highlight_type) in patterns {
        let re = Regex::new(pattern).map_err(|e| {
            AppError::Config(format!("Invalid regex pattern '{}': {}", pattern, e))
        })?;

        for mat in re.find_iter(html) {
            highlights.push((mat.start(), mat.end(), *highlight_type));
        }
    }

    save_debug_html(html, filename, &highlights)
}

/// Writes `raw.html` and `annotated.html` for one detail page into `dir`.
pub fn dump_detail_page(html: &str, dir: &Path) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("raw.html"), html)?;
    let annotated = dir.join("annotated.html");
    create_debug_html(html, &annotated, DETAIL_PAGE_PATTERNS)?;
    tracing::info!("Created annotated debug HTML: {}", annotated.display());
    Ok(annotated)
}

/// Contract numbers are user input; keep them to a single path component.
pub fn safe_file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "contract".to_string() } else { stem }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mta_contracts_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_dump_highlights_markers() {
        let dir = temp_dir("html_debug");
        let html = r#"<form name="PageForm"><table><tr><td>Status:</td></tr></table>
            <table><tr><td>Award &amp; Payment Summary</td></tr></table>
            <img src="/images/img_sub_tier_2.gif"></form>"#;

        let annotated = dump_detail_page(html, &dir).unwrap();
        let out = fs::read_to_string(annotated).unwrap();
        assert!(out.contains("highlight-section"));
        assert!(out.contains("highlight-label"));
        assert!(out.contains("highlight-tier"));
        assert!(dir.join("raw.html").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_overlapping_highlights_do_not_duplicate() {
        let dir = temp_dir("overlap");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("o.html");
        save_debug_html("abcdef", &path, &[(0, 4, "label"), (2, 5, "tier")]).unwrap();
        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(out.matches("cd").count(), 1);
        assert!(out.contains("ef"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_safe_file_stem() {
        assert_eq!(safe_file_stem("ch058B"), "ch058B");
        assert_eq!(safe_file_stem("../a b"), "___a_b");
        assert_eq!(safe_file_stem("  "), "contract");
    }
}
