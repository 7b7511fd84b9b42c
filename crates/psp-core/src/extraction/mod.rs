pub mod pdftotext;
pub mod workbook;

use crate::error::PspError;

/// Cells recognized on a single page, row by row in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageGrid {
    pub page_number: usize,
    pub rows: Vec<Vec<String>>,
}

impl PageGrid {
    pub fn new(page_number: usize, rows: Vec<Vec<String>>) -> Self {
        PageGrid { page_number, rows }
    }
}

/// All page rows of one document, concatenated in document order.
///
/// Row indices are absolute: the first row of page 2 follows the last row of
/// page 1. Page boundaries carry no meaning for table location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentGrid {
    rows: Vec<Vec<String>>,
}

impl DocumentGrid {
    pub fn from_pages(pages: Vec<PageGrid>) -> Self {
        let rows = pages.into_iter().flat_map(|p| p.rows).collect();
        DocumentGrid { rows }
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        DocumentGrid { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when no row holds a single non-blank cell.
    pub fn is_blank(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|c| c.trim().is_empty()))
    }
}

/// Trait for backends that turn a document into page grids.
pub trait GridExtractor: Send + Sync {
    /// Recognize table cells in the document, returning one PageGrid per page.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageGrid>, PspError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}
