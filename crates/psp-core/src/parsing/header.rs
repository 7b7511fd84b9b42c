use std::collections::HashSet;

use crate::parsing::normalize::collapse_whitespace;

/// Widest row of a grid slice.
pub fn column_count(rows: &[Vec<String>]) -> usize {
    rows.iter().map(|r| r.len()).max().unwrap_or(0)
}

/// Resolve one name per column of `sub_grid`.
///
/// `sub_grid` starts at the first header row. A `fixed` caption list
/// overrides whatever header text the document holds. The returned list
/// always has exactly `column_count(sub_grid)` entries.
pub fn resolve_headers(
    sub_grid: &[Vec<String>],
    header_rows: usize,
    fixed: Option<&[String]>,
) -> Vec<String> {
    let width = column_count(sub_grid);

    let names = match (fixed, header_rows) {
        (Some(captions), _) => captions.to_vec(),
        (None, 0) => (0..width).map(|i| format!("Column_{i}")).collect(),
        (None, 1) => (0..width)
            .map(|i| {
                let name = header_cell(sub_grid, 0, i);
                if name.is_empty() {
                    format!("Unnamed_{i}")
                } else {
                    name
                }
            })
            .collect(),
        (None, _) => (0..width)
            .map(|i| combine_stacked(&header_cell(sub_grid, 0, i), &header_cell(sub_grid, 1, i), i))
            .collect(),
    };

    reconcile(names, width)
}

/// Combine a top and a bottom header cell into one column name.
pub fn combine_stacked(top: &str, bottom: &str, index: usize) -> String {
    match (top.is_empty(), bottom.is_empty()) {
        (true, true) => format!("Unnamed_{index}"),
        (false, true) => top.to_string(),
        (true, false) => bottom.to_string(),
        (false, false) if !bottom.starts_with(top) => format!("{top} {bottom}"),
        (false, false) => bottom.to_string(),
    }
}

/// Pad with placeholders or truncate so that `names.len() == width`.
pub fn reconcile(mut names: Vec<String>, width: usize) -> Vec<String> {
    if names.len() < width {
        let start = names.len();
        names.extend((start..width).map(|i| format!("Unnamed_Col_{i}")));
    } else {
        names.truncate(width);
    }
    names
}

/// Indices of the columns to keep: the first occurrence of every name.
pub fn first_occurrences(names: &[String]) -> Vec<usize> {
    let mut seen = HashSet::new();
    names
        .iter()
        .enumerate()
        .filter(|(_, name)| seen.insert(name.as_str()))
        .map(|(i, _)| i)
        .collect()
}

fn header_cell(rows: &[Vec<String>], row: usize, col: usize) -> String {
    rows.get(row)
        .and_then(|r| r.get(col))
        .map(|c| collapse_whitespace(c))
        .unwrap_or_default()
}
