// src/extractors/text.rs

/// Collapses every whitespace run (newlines, tabs, NBSP) to a single space and trims.
/// `None` yields an empty string.
pub fn normalize<S: AsRef<str>>(text: Option<S>) -> String {
    match text {
        Some(t) => normalize_str(t.as_ref()),
        None => String::new(),
    }
}

pub fn normalize_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// "MBE Goal" -> "mbe_goal". Expects already-normalized text.
pub fn category_key(label: &str) -> String {
    label.to_lowercase().replace(' ', "_")
}
