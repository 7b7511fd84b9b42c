/// Trim a cell and collapse every internal whitespace run (including the
/// `\r` and `\n` of wrapped PDF cells) to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison form of a column caption: whitespace collapsed, lowercased.
pub fn normalize_caption(s: &str) -> String {
    collapse_whitespace(s).to_lowercase()
}

/// Comparison form of a row key (state or region name).
///
/// Same folding as captions, so `"HIMACHAL\rPRADESH"` and
/// `"Himachal Pradesh"` compare equal.
pub fn fold_row_key(s: &str) -> String {
    normalize_caption(s)
}
