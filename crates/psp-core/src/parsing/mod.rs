pub mod header;
pub mod locate;
pub mod normalize;
pub mod values;

use std::collections::HashSet;

use crate::extraction::DocumentGrid;
use crate::layout::schema::{Orientation, TableSpec};
use crate::layout::template::empty_table;
use crate::layout::{CompiledLayout, CompiledTable};
use crate::model::{ExtractedTable, Record, TableOrigin, Value};
use header::{column_count, first_occurrences, resolve_headers};
use locate::locate;
use normalize::{collapse_whitespace, fold_row_key};
use values::coerce;

/// Extract every table of a layout from one document grid.
///
/// The result always holds one entry per declared table, in layout order.
/// Tables that cannot be located or that yield no records are replaced by
/// their empty template.
pub fn extract_tables(grid: &DocumentGrid, layout: &CompiledLayout) -> Vec<ExtractedTable> {
    layout
        .tables
        .iter()
        .map(|table| extract_table(grid, table))
        .collect()
}

/// Locate, resolve and materialize a single table.
pub fn extract_table(grid: &DocumentGrid, table: &CompiledTable) -> ExtractedTable {
    let spec = &table.spec;

    let Some(bounds) = locate(grid, &table.start, table.end.as_ref()) else {
        tracing::warn!(table = %spec.id, "start marker not found, using empty template");
        return empty_table(spec);
    };
    tracing::debug!(
        table = %spec.id,
        marker_row = bounds.marker_row,
        start = bounds.start,
        end = bounds.end,
        "located table"
    );

    let sub_grid = &grid.rows()[bounds.start..bounds.end];
    let records = match spec.orientation {
        Orientation::Columns => materialize(sub_grid, spec),
        Orientation::Rows => {
            let row_key_caption = spec
                .column(spec.row_key())
                .map(|c| c.caption.as_str())
                .unwrap_or_default();
            materialize(&transpose_rows(sub_grid, row_key_caption), spec)
        }
    };

    if records.is_empty() {
        tracing::warn!(table = %spec.id, "table has no data rows, using empty template");
        return empty_table(spec);
    }

    tracing::info!(table = %spec.id, records = records.len(), "extracted table");
    ExtractedTable {
        id: spec.id.clone(),
        origin: TableOrigin::Extracted,
        records,
    }
}

/// Turn a located sub-grid into records.
///
/// The first `header_rows` rows name the columns; the rest are data. Blank
/// rows and blank columns are dropped, duplicate column names keep their
/// first column, and only columns whose name matches a declared caption
/// survive.
pub fn materialize(sub_grid: &[Vec<String>], spec: &TableSpec) -> Vec<Record> {
    let header_rows = spec.header_rows.min(sub_grid.len());
    let captions = spec.fixed_header.then(|| spec.captions());
    let names = resolve_headers(sub_grid, spec.header_rows, captions.as_deref());

    let data: Vec<&Vec<String>> = sub_grid[header_rows..]
        .iter()
        .filter(|row| !is_blank_row(row))
        .collect();
    if data.is_empty() {
        return Vec::new();
    }

    // Duplicates are dropped before blank columns, so a blank first
    // occurrence shadows any later column of the same name.
    let columns: Vec<usize> = first_occurrences(&names)
        .into_iter()
        .filter(|&i| data.iter().any(|row| !cell(row, i).trim().is_empty()))
        .collect();

    // Declared order, each key bound to at most one grid column.
    let mapping: Vec<(usize, usize)> = spec
        .columns
        .iter()
        .enumerate()
        .filter_map(|(def_index, def)| {
            columns
                .iter()
                .find(|&&col| {
                    spec.column_for_caption(&names[col])
                        .is_some_and(|matched| matched.key == def.key)
                })
                .map(|&col| (def_index, col))
        })
        .collect();
    if mapping.is_empty() {
        tracing::warn!(table = %spec.id, headers = ?names, "no column matches a declared caption");
        return Vec::new();
    }

    let mut records: Vec<Record> = data
        .iter()
        .map(|row| {
            let mut record = Record::new();
            for &(def_index, col) in &mapping {
                let def = &spec.columns[def_index];
                let raw = row.get(col).map(|c| c.as_str());
                record.insert(def.key.clone(), coerce(raw, def.kind, spec.coercion));
            }
            record
        })
        .filter(|record| !record.is_all_null())
        .collect();

    filter_rows(&mut records, spec);
    if spec.sort_rows {
        let key = spec.row_key();
        records.sort_by_cached_key(|r| row_label(r, key));
    }
    records
}

/// Keep only records whose row key appears in the table's allow-list.
pub fn filter_rows(records: &mut Vec<Record>, spec: &TableSpec) {
    if spec.allowed_rows.is_empty() {
        return;
    }
    let allowed: HashSet<String> = spec.allowed_rows.iter().map(|r| fold_row_key(r)).collect();
    let key = spec.row_key();
    records.retain(|r| row_label(r, key).is_some_and(|label| allowed.contains(&label)));
}

fn row_label(record: &Record, key: &str) -> Option<String> {
    record.get(key).map(|v| match v {
        Value::Text(s) => fold_row_key(s),
        Value::Number(n) => n.to_string(),
    })
}

/// Transpose a metrics-by-region sub-grid into a region-by-metrics grid.
///
/// The first row holds the record labels and sits right-aligned over the
/// value columns, since text extraction drops its blank leading cell. Each
/// later row starts with a metric caption. The output's header row is the
/// row-key caption followed by the metric captions.
pub fn transpose_rows(sub_grid: &[Vec<String>], row_key_caption: &str) -> Vec<Vec<String>> {
    let Some((header, body)) = sub_grid.split_first() else {
        return Vec::new();
    };
    let width = column_count(body);
    if width == 0 {
        return vec![vec![row_key_caption.to_string()]];
    }

    let labels: Vec<String> = header
        .iter()
        .map(|c| collapse_whitespace(c))
        .filter(|c| !c.is_empty())
        .collect();
    let aligned: Vec<String> = if labels.len() >= width {
        labels[labels.len() - width..].to_vec()
    } else {
        std::iter::repeat(String::new())
            .take(width - labels.len())
            .chain(labels)
            .collect()
    };

    let mut out = Vec::with_capacity(width);
    out.push(
        std::iter::once(row_key_caption.to_string())
            .chain(body.iter().map(|row| cell(row, 0).to_string()))
            .collect(),
    );
    for (j, label) in aligned.iter().enumerate().skip(1) {
        out.push(
            std::iter::once(label.clone())
                .chain(body.iter().map(|row| cell(row, j).to_string()))
                .collect(),
        );
    }
    out
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|c| c.as_str()).unwrap_or("")
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}
