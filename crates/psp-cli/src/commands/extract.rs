use psp_core::dating::{default_chain, parse_date_arg, resolve_report_date, today_ist};
use psp_core::error::PspError;
use psp_core::extraction::pdftotext::PdftotextExtractor;
use psp_core::extraction::workbook::WorkbookExtractor;
use psp_core::extraction::GridExtractor;
use psp_core::layout::template::empty_report;
use psp_core::layout::CompiledLayout;
use psp_core::model::{Region, RegionReport};
use std::path::{Path, PathBuf};

use super::resolve_layout;
use crate::output;

pub fn run(
    files: Vec<PathBuf>,
    region: Region,
    layout_file: Option<PathBuf>,
    date: Option<String>,
    output_format: &str,
    out_dir: Option<PathBuf>,
) -> Result<(), PspError> {
    let layout = CompiledLayout::compile(resolve_layout(region, layout_file.as_deref())?)?;
    let explicit = date.as_deref().map(parse_date_arg).transpose()?;
    let mut failed = 0;

    for file in &files {
        let date = explicit.or_else(|| resolve_report_date(file, &default_chain(today_ist())));
        let report = match extract_file(file, &layout, date) {
            Ok(report) => report,
            Err(e) => {
                // One unreadable document must not stop the batch.
                tracing::error!(file = %file.display(), "extraction failed, using empty templates: {e}");
                failed += 1;
                empty_report(&layout.layout, date)
            }
        };

        match &out_dir {
            Some(dir) => {
                let path = psp_core::write_report(&report, &layout.layout.file_stem, dir)?;
                eprintln!(
                    "{}: {} record(s) written to {}",
                    file.display(),
                    report.record_count(),
                    path.display()
                );
            }
            None if output_format == "json" => output::json::print(&report)?,
            None => {
                if files.len() > 1 {
                    println!("--- {} ---\n", file.display());
                }
                println!("{}", output::table::format_report(&report));
            }
        }
    }

    if failed > 0 {
        return Err(PspError::ExtractionsFailed {
            failed,
            total: files.len(),
        });
    }
    Ok(())
}

/// Pick the grid backend from the file extension.
pub fn extractor_for(path: &Path) -> Box<dyn GridExtractor> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    if WorkbookExtractor::handles_extension(&ext) {
        Box::new(WorkbookExtractor::new())
    } else {
        Box::new(PdftotextExtractor::new())
    }
}

pub fn extract_file(
    path: &Path,
    layout: &CompiledLayout,
    date: Option<chrono::NaiveDate>,
) -> Result<RegionReport, PspError> {
    let bytes = std::fs::read(path)?;
    let extractor = extractor_for(path);
    tracing::info!(file = %path.display(), backend = extractor.backend_name(), "extracting");
    psp_core::extract_report(&bytes, extractor.as_ref(), layout, date)
}
