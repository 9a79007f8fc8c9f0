//! Page text cleanup applied before chunking.

/// Replaces NUL bytes with spaces and trims every line.
///
/// Line structure is kept so chunk boundaries still fall near paragraph
/// breaks.
pub fn clean_page_text(s: &str) -> String {
    s.replace('\0', " ")
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

/// `true` when the cleaned page carries no text worth indexing.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
