use crate::error::PspError;
use crate::extraction::{GridExtractor, PageGrid};
use std::io::Write;
use std::process::Command;

/// Grid backend using pdftotext (from poppler-utils).
///
/// Uses `pdftotext -layout`, which keeps table columns aligned with runs of
/// spaces. Each text line becomes a row; cells are split at gaps of two or
/// more whitespace characters.
pub struct PdftotextExtractor;

impl PdftotextExtractor {
    pub fn new() -> Self {
        PdftotextExtractor
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl GridExtractor for PdftotextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageGrid>, PspError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| PspError::Extraction(e.to_string()))?;
        tmpfile
            .write_all(pdf_bytes)
            .map_err(|e| PspError::Extraction(e.to_string()))?;

        let output = Command::new("pdftotext")
            .arg("-layout")
            .arg(tmpfile.path())
            .arg("-") // output to stdout
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PspError::PdftotextNotFound
                } else {
                    PspError::Extraction(format!("pdftotext failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(PspError::PdftotextFailed { code, stderr });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let pages = layout_text_to_pages(&text);
        tracing::debug!(pages = pages.len(), "pdftotext produced page grids");
        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

/// Split `pdftotext -layout` output into page grids.
///
/// Pages are separated by form feeds; the trailing empty page pdftotext emits
/// after the last form feed is dropped.
pub fn layout_text_to_pages(text: &str) -> Vec<PageGrid> {
    text.split('\x0c')
        .enumerate()
        .map(|(i, page_text)| {
            let rows = page_text
                .lines()
                .map(|line| {
                    split_cells(line)
                        .into_iter()
                        .map(|s| s.to_string())
                        .collect()
                })
                .collect();
            PageGrid::new(i + 1, rows)
        })
        .filter(|p| !p.rows.is_empty() || p.page_number == 1)
        .collect()
}

/// Split a line by gaps of 2+ whitespace characters.
pub fn split_cells(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = None;
    let mut space_count = 0;
    let mut last_non_space_end = 0;

    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            space_count += 1;
            if space_count == 2 {
                if let Some(s) = start {
                    segments.push(&line[s..last_non_space_end]);
                    start = None;
                }
            }
        } else {
            if start.is_none() {
                start = Some(i);
            }
            space_count = 0;
            last_non_space_end = i + c.len_utf8();
        }
    }

    if let Some(s) = start {
        segments.push(&line[s..last_non_space_end]);
    }

    segments
}
