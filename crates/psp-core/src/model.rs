use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PspError;

/// A typed cell value after coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(#[serde(with = "rust_decimal::serde::float")] Decimal),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Number(_) => None,
            Value::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One output row: short key -> value, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Option<Value>)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an existing value with the same key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<Value>) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Value of a field; `None` both when the key is absent and when it is null.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_all_null(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_none())
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.fields.retain(|(k, _)| keep(k));
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// The regional load-dispatch centres whose reports are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Nrldc,
    Srldc,
    Wrldc,
    Posoco,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Nrldc, Region::Srldc, Region::Wrldc, Region::Posoco];

    pub fn from_str_loose(s: &str) -> Option<Region> {
        match s.trim().to_lowercase().as_str() {
            "nrldc" | "nr" => Some(Region::Nrldc),
            "srldc" | "sr" => Some(Region::Srldc),
            "wrldc" | "wr" => Some(Region::Wrldc),
            "posoco" | "nldc" | "grid-india" => Some(Region::Posoco),
            _ => None,
        }
    }

    /// Lowercase name, used for preset names, log files and job names.
    pub fn slug(&self) -> &'static str {
        match self {
            Region::Nrldc => "nrldc",
            Region::Srldc => "srldc",
            Region::Wrldc => "wrldc",
            Region::Posoco => "posoco",
        }
    }
}

impl FromStr for Region {
    type Err = PspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::from_str_loose(s).ok_or_else(|| PspError::UnknownRegion(s.to_string()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Nrldc => write!(f, "NRLDC"),
            Region::Srldc => write!(f, "SRLDC"),
            Region::Wrldc => write!(f, "WRLDC"),
            Region::Posoco => write!(f, "POSOCO"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOrigin {
    Extracted,
    Template,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTable {
    pub id: String,
    pub origin: TableOrigin,
    pub records: Vec<Record>,
}

impl ExtractedTable {
    pub fn is_template(&self) -> bool {
        self.origin == TableOrigin::Template
    }
}

/// All tables of one region's report plus its operating day.
///
/// Serializes as `{"date": ..., "<table_id>": [records], ...}` with the
/// tables in layout order.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionReport {
    pub region: Region,
    pub date: Option<NaiveDate>,
    pub tables: Vec<ExtractedTable>,
}

impl RegionReport {
    pub fn table(&self, id: &str) -> Option<&ExtractedTable> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn record_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| !t.is_template())
            .map(|t| t.records.len())
            .sum()
    }
}

impl Serialize for RegionReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len() + 1))?;
        map.serialize_entry("date", &self.date.map(|d| d.format("%Y-%m-%d").to_string()))?;
        for table in &self.tables {
            map.serialize_entry(&table.id, &table.records)?;
        }
        map.end()
    }
}
