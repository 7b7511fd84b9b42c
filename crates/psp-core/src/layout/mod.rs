pub mod builtin;
pub mod schema;
pub mod template;

use crate::error::PspError;
use chrono::format::{Item, StrftimeItems};
use regex::{Regex, RegexBuilder};
use schema::{Orientation, ReportLayout, ReportSource, TableSpec};
use std::collections::HashSet;
use std::path::Path;

/// Load a layout from a JSON file.
pub fn load_layout(path: &Path) -> Result<ReportLayout, PspError> {
    let content = std::fs::read_to_string(path).map_err(|e| PspError::LayoutLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_layout(&content, path)
}

/// Parse a layout from a JSON string.
pub fn parse_layout(json: &str, source: &Path) -> Result<ReportLayout, PspError> {
    let layout: ReportLayout = serde_json::from_str(json).map_err(|e| PspError::LayoutLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_layout(&layout)?;
    Ok(layout)
}

/// Parse a layout from a JSON string (no file path context).
pub fn parse_layout_str(json: &str) -> Result<ReportLayout, PspError> {
    let layout: ReportLayout = serde_json::from_str(json).map_err(PspError::Json)?;
    validate_layout(&layout)?;
    Ok(layout)
}

/// Validate that a layout is well-formed.
pub fn validate_layout(layout: &ReportLayout) -> Result<(), PspError> {
    if layout.tables.is_empty() {
        return Err(PspError::LayoutInvalid("tables must not be empty".into()));
    }

    if layout.file_stem.trim().is_empty() {
        return Err(PspError::LayoutInvalid("file_stem must not be empty".into()));
    }

    let mut ids = HashSet::new();
    for table in &layout.tables {
        if table.id.trim().is_empty() {
            return Err(PspError::LayoutInvalid("table id must not be empty".into()));
        }
        if !ids.insert(table.id.as_str()) {
            return Err(PspError::LayoutInvalid(format!(
                "duplicate table id '{}'",
                table.id
            )));
        }
        validate_table(table)?;
    }

    if let Some(source) = &layout.source {
        validate_source(source)?;
    }

    Ok(())
}

fn validate_table(table: &TableSpec) -> Result<(), PspError> {
    if table.header_rows > 2 {
        return Err(PspError::LayoutInvalid(format!(
            "table '{}' has {} header rows (expected 0, 1 or 2)",
            table.id, table.header_rows
        )));
    }

    if table.orientation == Orientation::Rows && table.header_rows != 1 {
        return Err(PspError::LayoutInvalid(format!(
            "row-oriented table '{}' needs exactly one header row",
            table.id
        )));
    }

    if table.columns.is_empty() {
        return Err(PspError::LayoutInvalid(format!(
            "table '{}' has no columns",
            table.id
        )));
    }

    let mut keys = HashSet::new();
    for column in &table.columns {
        if column.key.trim().is_empty() {
            return Err(PspError::LayoutInvalid(format!(
                "table '{}' has a column with an empty key",
                table.id
            )));
        }
        if column.caption.trim().is_empty() {
            return Err(PspError::LayoutInvalid(format!(
                "column '{}' of table '{}' has an empty caption",
                column.key, table.id
            )));
        }
        if !keys.insert(column.key.as_str()) {
            return Err(PspError::LayoutInvalid(format!(
                "table '{}' declares key '{}' twice",
                table.id, column.key
            )));
        }
    }

    if table.column(table.row_key()).is_none() {
        return Err(PspError::LayoutInvalid(format!(
            "row_key '{}' of table '{}' is not a declared column",
            table.row_key(),
            table.id
        )));
    }

    if table
        .allowed_rows
        .iter()
        .chain(&table.template_rows)
        .any(|r| r.trim().is_empty())
    {
        return Err(PspError::LayoutInvalid(format!(
            "table '{}' lists a blank row label",
            table.id
        )));
    }

    compile_marker(&table.start_marker, &table.id)?;
    if let Some(end) = &table.end_marker {
        compile_marker(end, &table.id)?;
    }

    Ok(())
}

fn validate_source(source: &ReportSource) -> Result<(), PspError> {
    match source {
        ReportSource::DatedUrl { url, .. } => {
            if StrftimeItems::new(url).any(|item| item == Item::Error) {
                return Err(PspError::LayoutInvalid(format!(
                    "source url '{}' has an invalid date specifier",
                    url
                )));
            }
        }
        ReportSource::DocumentIndex { download_url, .. } => {
            if !download_url.contains("{file_name}") {
                return Err(PspError::LayoutInvalid(
                    "document index download_url must contain {file_name}".into(),
                ));
            }
        }
    }
    Ok(())
}

fn compile_marker(pattern: &str, table_id: &str) -> Result<Regex, PspError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            PspError::LayoutInvalid(format!("bad marker for table '{}': {}", table_id, e))
        })
}

/// A table spec with its markers compiled.
#[derive(Debug, Clone)]
pub struct CompiledTable {
    pub spec: TableSpec,
    pub start: Regex,
    pub end: Option<Regex>,
}

/// A validated layout ready for extraction.
#[derive(Debug, Clone)]
pub struct CompiledLayout {
    pub layout: ReportLayout,
    pub tables: Vec<CompiledTable>,
}

impl CompiledLayout {
    pub fn compile(layout: ReportLayout) -> Result<Self, PspError> {
        validate_layout(&layout)?;
        let tables = layout
            .tables
            .iter()
            .map(|spec| {
                Ok(CompiledTable {
                    start: compile_marker(&spec.start_marker, &spec.id)?,
                    end: spec
                        .end_marker
                        .as_deref()
                        .map(|m| compile_marker(m, &spec.id))
                        .transpose()?,
                    spec: spec.clone(),
                })
            })
            .collect::<Result<Vec<_>, PspError>>()?;
        Ok(CompiledLayout { layout, tables })
    }
}
