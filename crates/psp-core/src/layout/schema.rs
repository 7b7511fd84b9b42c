use serde::{Deserialize, Serialize};

use crate::model::Region;
use crate::parsing::normalize::normalize_caption;

/// Table layout of one region's daily report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportLayout {
    pub region: Region,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    /// Prefix of the per-run JSON file name (`<file_stem>_<DDMMYYYY>.json`).
    pub file_stem: String,
    /// Where the report is published. `None` means local files only.
    #[serde(default)]
    pub source: Option<ReportSource>,
    pub tables: Vec<TableSpec>,
}

impl ReportLayout {
    pub fn table(&self, id: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportSource {
    /// A URL built from the report date with chrono `strftime` specifiers.
    DatedUrl {
        url: String,
        #[serde(default = "default_lookback_days")]
        lookback_days: u32,
    },
    /// A JSON listing endpoint that names the file to download.
    ///
    /// `index_url` may contain `{date}` (YYYY-MM-DD); `download_url` must
    /// contain `{file_name}`, which is substituted URL-encoded.
    DocumentIndex {
        index_url: String,
        download_url: String,
        #[serde(default)]
        referer: Option<String>,
        #[serde(default = "default_lookback_days")]
        lookback_days: u32,
    },
}

impl ReportSource {
    pub fn lookback_days(&self) -> u32 {
        match self {
            ReportSource::DatedUrl { lookback_days, .. }
            | ReportSource::DocumentIndex { lookback_days, .. } => (*lookback_days).max(1),
        }
    }
}

fn default_lookback_days() -> u32 {
    1
}

/// Declarative description of one table inside a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    /// Output identifier, e.g. `nrldc_table_2A`.
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Regex matched case-insensitively against every cell of a row.
    pub start_marker: String,
    #[serde(default)]
    pub end_marker: Option<String>,
    /// Header rows following the marker row (0, 1 or 2).
    #[serde(default)]
    pub header_rows: usize,
    /// Use the column captions, in order, as the header instead of the text
    /// found in the document.
    #[serde(default)]
    pub fixed_header: bool,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub coercion: CoercionPolicy,
    /// Key of the column identifying a row. Defaults to the first column.
    #[serde(default)]
    pub row_key: Option<String>,
    /// If non-empty, only rows whose row key is listed here are kept.
    #[serde(default)]
    pub allowed_rows: Vec<String>,
    /// Row labels of the empty template.
    #[serde(default)]
    pub template_rows: Vec<String>,
    /// Sort records by row key.
    #[serde(default)]
    pub sort_rows: bool,
    pub columns: Vec<ColumnDef>,
}

impl TableSpec {
    pub fn row_key(&self) -> &str {
        match self.row_key.as_deref() {
            Some(key) => key,
            None => self.columns.first().map(|c| c.key.as_str()).unwrap_or(""),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.key.as_str())
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Find the column whose caption or alias matches a resolved header name.
    pub fn column_for_caption(&self, name: &str) -> Option<&ColumnDef> {
        let wanted = normalize_caption(name);
        if wanted.is_empty() {
            return None;
        }
        self.columns.iter().find(|c| {
            normalize_caption(&c.caption) == wanted
                || c.aliases.iter().any(|a| normalize_caption(a) == wanted)
        })
    }

    /// Captions in declared order, the literal header list of a fixed-header table.
    pub fn captions(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.caption.clone()).collect()
    }
}

/// Maps a document caption onto an output key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub caption: String,
    pub key: String,
    #[serde(default)]
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    #[default]
    Number,
    Text,
}

/// How numeric cells holding a dash are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionPolicy {
    /// A dash is an empty marker and becomes null.
    #[default]
    Strict,
    /// A dash means "not applicable" and is kept as text.
    KeepDash,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// One record per row, columns are fields.
    #[default]
    Columns,
    /// One record per column, rows are fields (transposed summary tables).
    Rows,
}
