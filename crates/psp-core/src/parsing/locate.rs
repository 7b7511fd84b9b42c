use regex::Regex;

use crate::extraction::DocumentGrid;
use crate::parsing::normalize::collapse_whitespace;

/// Row range of a located table.
///
/// `start` is the first row after the marker row; `end` is exclusive and is
/// either the end-marker row or the end of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableBounds {
    pub marker_row: usize,
    pub start: usize,
    pub end: usize,
}

impl TableBounds {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Does any cell of the row contain a match of the marker?
pub fn row_matches(row: &[String], marker: &Regex) -> bool {
    row.iter()
        .map(|cell| collapse_whitespace(cell))
        .any(|cell| marker.is_match(&cell))
}

/// Find the table that starts at the first row matching `start` and ends at
/// the first later row matching `end`.
///
/// Returns `None` when no row matches the start marker. A missing end marker
/// match extends the table to the end of the grid.
pub fn locate(grid: &DocumentGrid, start: &Regex, end: Option<&Regex>) -> Option<TableBounds> {
    let rows = grid.rows();
    let marker_row = rows.iter().position(|row| row_matches(row, start))?;
    let first = marker_row + 1;

    let end_row = end
        .and_then(|end| {
            rows[first..]
                .iter()
                .position(|row| row_matches(row, end))
                .map(|offset| first + offset)
        })
        .unwrap_or(rows.len());

    Some(TableBounds {
        marker_row,
        start: first,
        end: end_row,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;

    fn re(p: &str) -> Regex {
        RegexBuilder::new(p).case_insensitive(true).build().unwrap()
    }

    fn grid(rows: &[&[&str]]) -> DocumentGrid {
        DocumentGrid::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_marker_in_any_cell() {
        let g = grid(&[
            &["cover"],
            &["", "Table 2(A) State's   Load Details"],
            &["PUNJAB", "1"],
            &["2(B) next"],
        ]);
        let b = locate(&g, &re(r"2\s*\(A\)\s*State's\s*Load"), Some(&re(r"2\s*\(B\)"))).unwrap();
        assert_eq!(b, TableBounds { marker_row: 1, start: 2, end: 3 });
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_case_insensitive_and_collapsed() {
        let g = grid(&[&["2(a)\n STATE'S\r\nload details"]]);
        assert!(locate(&g, &re(r"2\(A\) State's Load"), None).is_some());
    }

    #[test]
    fn test_not_found() {
        let g = grid(&[&["nothing here"]]);
        assert!(locate(&g, &re("2\\(A\\)"), None).is_none());
        assert!(locate(&DocumentGrid::default(), &re("x"), None).is_none());
    }

    #[test]
    fn test_missing_end_runs_to_grid_end() {
        let g = grid(&[&["start"], &["a"], &["b"]]);
        let b = locate(&g, &re("start"), Some(&re("never"))).unwrap();
        assert_eq!((b.start, b.end), (1, 3));
    }

    #[test]
    fn test_end_search_begins_after_start_row() {
        // The start row also matches the end marker; it must not close the table.
        let g = grid(&[&["2(A) ... 2(B)"], &["a"], &["2(B)"]]);
        let b = locate(&g, &re(r"2\(A\)"), Some(&re(r"2\(B\)"))).unwrap();
        assert_eq!((b.start, b.end), (1, 2));
    }

    #[test]
    fn test_first_match_wins() {
        let g = grid(&[&["x"], &["start"], &["start"], &["end"], &["end"]]);
        let b = locate(&g, &re("start"), Some(&re("end"))).unwrap();
        assert_eq!(b, TableBounds { marker_row: 1, start: 2, end: 3 });
    }

    #[test]
    fn test_marker_on_last_row() {
        let g = grid(&[&["a"], &["start"]]);
        let b = locate(&g, &re("start"), Some(&re("end"))).unwrap();
        assert!(b.is_empty());
    }
}
