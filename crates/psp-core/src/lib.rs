pub mod config;
pub mod dating;
pub mod download;
pub mod error;
pub mod extraction;
pub mod layout;
pub mod merge;
pub mod model;
pub mod parsing;
pub mod push;
pub mod store;

use chrono::NaiveDate;
use error::PspError;
use extraction::{DocumentGrid, GridExtractor};
use layout::CompiledLayout;
use model::RegionReport;
use std::path::{Path, PathBuf};

/// Main API entry point: extract every table of a layout from a document.
///
/// Fails only when the backend recognizes no cell at all. Missing or empty
/// tables are replaced by their templates, so the report always has the
/// layout's full shape.
pub fn extract_report(
    bytes: &[u8],
    extractor: &dyn GridExtractor,
    layout: &CompiledLayout,
    date: Option<NaiveDate>,
) -> Result<RegionReport, PspError> {
    let pages = extractor.extract_pages(bytes)?;
    let grid = DocumentGrid::from_pages(pages);

    if grid.is_blank() {
        return Err(PspError::NoTables {
            backend: extractor.backend_name().to_string(),
        });
    }

    tracing::debug!(
        backend = extractor.backend_name(),
        rows = grid.len(),
        "built document grid"
    );
    Ok(report_from_grid(&grid, layout, date))
}

/// Assemble a region report from an already built grid.
pub fn report_from_grid(
    grid: &DocumentGrid,
    layout: &CompiledLayout,
    date: Option<NaiveDate>,
) -> RegionReport {
    RegionReport {
        region: layout.layout.region,
        date,
        tables: parsing::extract_tables(grid, layout),
    }
}

/// `<file_stem>_<DDMMYYYY>.json`, or `<file_stem>.json` without a date.
pub fn report_file_name(file_stem: &str, date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!("{}_{}.json", file_stem, d.format("%d%m%Y")),
        None => format!("{}.json", file_stem),
    }
}

/// Write a region report as pretty JSON into `dir`, returning the file path.
pub fn write_report(
    report: &RegionReport,
    file_stem: &str,
    dir: &Path,
) -> Result<PathBuf, PspError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(file_stem, report.date));
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;
    tracing::info!(path = %path.display(), "wrote region report");
    Ok(path)
}
