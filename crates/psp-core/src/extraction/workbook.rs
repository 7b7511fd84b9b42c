use std::io::Cursor;

use calamine::{Reader, Sheets};

use crate::error::PspError;
use crate::extraction::{GridExtractor, PageGrid};

/// Grid backend for spreadsheet editions of a report (XLSX, XLS, ODS).
///
/// Every worksheet becomes one page, in workbook order.
pub struct WorkbookExtractor;

impl WorkbookExtractor {
    pub fn new() -> Self {
        WorkbookExtractor
    }

    /// Whether a file extension is one this backend can open.
    pub fn handles_extension(ext: &str) -> bool {
        matches!(
            ext.to_ascii_lowercase().as_str(),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods"
        )
    }
}

impl Default for WorkbookExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl GridExtractor for WorkbookExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageGrid>, PspError> {
        let mut workbook: Sheets<_> = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| PspError::Extraction(format!("failed to open workbook: {e}")))?;

        let mut pages = Vec::new();
        for (i, name) in workbook.sheet_names().into_iter().enumerate() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| PspError::Extraction(format!("sheet '{name}' unreadable: {e}")))?;
            let rows = range
                .rows()
                .map(|row| {
                    row.iter()
                        .map(|cell| cell_as_string(cell).unwrap_or_default())
                        .collect()
                })
                .collect();
            pages.push(PageGrid::new(i + 1, rows));
        }

        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        "workbook"
    }
}

fn cell_as_string(cell: &calamine::Data) -> Option<String> {
    match cell {
        calamine::Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        calamine::Data::Float(f) => Some(f.to_string()),
        calamine::Data::Int(i) => Some(i.to_string()),
        calamine::Data::Bool(b) => Some(b.to_string()),
        calamine::Data::DateTime(dt) => Some(dt.to_string()),
        calamine::Data::Empty | calamine::Data::Error(_) => None,
        _ => Some(format!("{cell}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_as_string() {
        assert_eq!(cell_as_string(&calamine::Data::String("  GOA ".into())).as_deref(), Some("GOA"));
        assert_eq!(cell_as_string(&calamine::Data::Float(1234.0)).as_deref(), Some("1234"));
        assert_eq!(cell_as_string(&calamine::Data::Float(12.5)).as_deref(), Some("12.5"));
        assert_eq!(cell_as_string(&calamine::Data::Int(7)).as_deref(), Some("7"));
        assert!(cell_as_string(&calamine::Data::Empty).is_none());
        assert!(cell_as_string(&calamine::Data::String("   ".into())).is_none());
    }

    #[test]
    fn test_handles_extension() {
        assert!(WorkbookExtractor::handles_extension("XLSX"));
        assert!(WorkbookExtractor::handles_extension("xls"));
        assert!(!WorkbookExtractor::handles_extension("pdf"));
    }

    #[test]
    fn test_garbage_bytes_is_extraction_error() {
        let err = WorkbookExtractor::new().extract_pages(b"not a workbook").unwrap_err();
        assert!(matches!(err, PspError::Extraction(_)));
    }
}
