use chrono::NaiveDate;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::dating::{now_ist, publication_day};
use crate::error::PspError;
use crate::layout::schema::ReportLayout;
use crate::layout::template::empty_records;
use crate::model::Region;

/// Where a region's merged data came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeSource {
    File(PathBuf),
    Template,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedRegion {
    pub region: Region,
    pub source: MergeSource,
    /// Tables that were missing or empty and got their template.
    pub filled_tables: Vec<String>,
    pub data: Map<String, JsonValue>,
}

/// One combined document covering every configured region.
///
/// Serializes as `{"<REGION>": {"date": ..., "<table_id>": [...]}, ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDocument {
    pub date: NaiveDate,
    pub regions: Vec<MergedRegion>,
}

impl Serialize for MergedDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.regions.len()))?;
        for r in &self.regions {
            map.serialize_entry(&r.region.to_string(), &r.data)?;
        }
        map.end()
    }
}

/// Merge the latest per-region outputs describing operating day `day`.
///
/// A region's output is looked up in the newest run directory of the day
/// after `day` (the publication day), then of `day` itself. Each layout contributes one region, in the given order. A region whose
/// output cannot be found or read gets its full empty template.
pub fn merge_regions(download_dir: &Path, layouts: &[ReportLayout], day: NaiveDate) -> MergedDocument {
    let regions = layouts
        .iter()
        .map(|layout| {
            let region_dir = download_dir.join(layout.region.to_string());
            merge_region(&region_dir, layout, day)
        })
        .collect();
    MergedDocument { date: day, regions }
}

fn merge_region(region_dir: &Path, layout: &ReportLayout, day: NaiveDate) -> MergedRegion {
    let region = layout.region;
    let template = |filled_tables: Vec<String>| MergedRegion {
        region,
        source: MergeSource::Template,
        filled_tables,
        data: region_template(layout, day),
    };
    let all_tables = || -> Vec<String> { layout.tables.iter().map(|t| t.id.clone()).collect() };

    // Runs are named by the day they fetched the report; a local run named
    // after the operating day itself is the fallback.
    let Some(run_dir) =
        find_run_dir(region_dir, publication_day(day)).or_else(|| find_run_dir(region_dir, day))
    else {
        tracing::warn!(%region, dir = %region_dir.display(), %day, "no run directory for day, using empty template");
        return template(all_tables());
    };
    let Some(file) = newest_json(&run_dir) else {
        tracing::warn!(%region, dir = %run_dir.display(), "no JSON file in run directory, using empty template");
        return template(all_tables());
    };

    match read_region_json(&file, region) {
        Ok(inner) => {
            let (data, filled_tables) = normalize_region(inner, layout, day);
            for table in &filled_tables {
                tracing::warn!(%region, table = %table, "missing or empty table, applying empty template");
            }
            tracing::info!(%region, file = %file.display(), "merged region data");
            MergedRegion {
                region,
                source: MergeSource::File(file),
                filled_tables,
                data,
            }
        }
        Err(e) => {
            tracing::error!(%region, file = %file.display(), "unreadable report, using empty template: {e}");
            template(all_tables())
        }
    }
}

/// Newest run directory under `region_dir` whose name contains `day`.
///
/// Run directory names start with `report_<YYYY-MM-DD>_<HH-MM-SS>`, so the
/// lexically greatest match is the latest run.
pub fn find_run_dir(region_dir: &Path, day: NaiveDate) -> Option<PathBuf> {
    let wanted = day.format("%Y-%m-%d").to_string();
    std::fs::read_dir(region_dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter(|e| e.file_name().to_string_lossy().contains(&wanted))
        .map(|e| e.path())
        .max()
}

/// Most recently modified `*.json` file in `dir`.
pub fn newest_json(dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .max_by_key(|p| {
            let modified = std::fs::metadata(p)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, p.clone())
        })
}

/// Read a region output, unwrapping a `{"<REGION>": {...}}` envelope.
fn read_region_json(path: &Path, region: Region) -> Result<Map<String, JsonValue>, PspError> {
    let content = std::fs::read_to_string(path)?;
    let value: JsonValue = serde_json::from_str(&content)?;
    let JsonValue::Object(mut outer) = value else {
        return Err(PspError::Extraction(format!(
            "{} does not hold a JSON object",
            path.display()
        )));
    };
    match outer.remove(&region.to_string()) {
        Some(JsonValue::Object(inner)) => Ok(inner),
        Some(other) => {
            outer.insert(region.to_string(), other);
            Ok(outer)
        }
        None => Ok(outer),
    }
}

/// Rebuild a region object as `date` first, then every declared table in
/// layout order, then any extra keys. Missing or empty tables get their
/// template. Returns the object and the ids of the tables that were filled.
pub fn normalize_region(
    mut inner: Map<String, JsonValue>,
    layout: &ReportLayout,
    day: NaiveDate,
) -> (Map<String, JsonValue>, Vec<String>) {
    let mut data = Map::new();
    data.insert("date".into(), JsonValue::String(day.format("%Y-%m-%d").to_string()));
    inner.remove("date");

    let mut filled = Vec::new();
    for spec in &layout.tables {
        let table = match inner.remove(&spec.id) {
            Some(value) if has_content(&value) => value,
            _ => {
                filled.push(spec.id.clone());
                template_value(&empty_records(spec))
            }
        };
        data.insert(spec.id.clone(), table);
    }
    data.extend(inner);
    (data, filled)
}

/// A table has content when it is a list with at least one non-empty entry.
fn has_content(value: &JsonValue) -> bool {
    match value {
        JsonValue::Array(rows) => rows.iter().any(|row| match row {
            JsonValue::Object(fields) => !fields.is_empty(),
            JsonValue::Null => false,
            _ => true,
        }),
        _ => false,
    }
}

fn template_value<T: Serialize>(records: &T) -> JsonValue {
    serde_json::to_value(records).unwrap_or(JsonValue::Array(Vec::new()))
}

/// The full empty template of a region, dated `day`.
pub fn region_template(layout: &ReportLayout, day: NaiveDate) -> Map<String, JsonValue> {
    let (data, _) = normalize_region(Map::new(), layout, day);
    data
}

/// Write the merged document to `<dir>/merged_reports_<timestamp>.json`.
pub fn write_merged(doc: &MergedDocument, dir: &Path) -> Result<PathBuf, PspError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "merged_reports_{}.json",
        now_ist().format("%Y-%m-%d_%H-%M-%S")
    ));
    std::fs::write(&path, serde_json::to_string_pretty(doc)?)?;
    tracing::info!(path = %path.display(), date = %doc.date, "wrote merged document");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dating::{operating_day, today_ist};
    use crate::download::run_dir_name;
    use crate::layout::builtin::load_preset;
    use crate::layout::template::empty_report;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_region_dir_uses_template() {
        let dir = tempfile::tempdir().unwrap();
        let layouts = vec![load_preset("posoco").unwrap()];
        let doc = merge_regions(dir.path(), &layouts, day());
        let posoco = &doc.regions[0];
        assert_eq!(posoco.source, MergeSource::Template);
        assert_eq!(posoco.data["date"], "2025-03-14");
        assert_eq!(posoco.data["posoco_table_a"].as_array().unwrap().len(), 6);
        assert_eq!(
            posoco.data.keys().collect::<Vec<_>>(),
            vec!["date", "posoco_table_a", "posoco_table_g"]
        );
    }

    #[test]
    fn test_picks_matching_run_dir_and_fills_empty_tables() {
        let dir = tempfile::tempdir().unwrap();
        let region_dir = dir.path().join("WRLDC");
        write(
            &region_dir.join("report_2025-03-13_09-00-00/wrldc_13032025.json"),
            r#"{"date": "2025-03-13", "wrldc_table_2A": [{"state": "OLD"}]}"#,
        );
        write(
            &region_dir.join("report_2025-03-14_09-00-00/wrldc_14032025.json"),
            r#"{"WRLDC": {"date": "2025-03-14", "wrldc_table_2A": [{"state": "GOA", "thermal": 1.5}], "wrldc_table_2C": [{}]}}"#,
        );

        let layouts = vec![load_preset("wrldc").unwrap()];
        let doc = merge_regions(dir.path(), &layouts, day());
        let wr = &doc.regions[0];
        assert!(matches!(wr.source, MergeSource::File(_)));
        assert_eq!(wr.filled_tables, vec!["wrldc_table_2C".to_string()]);
        assert_eq!(wr.data["wrldc_table_2A"], json!([{"state": "GOA", "thermal": 1.5}]));
        assert!(wr.data["wrldc_table_2C"][0]["state"].is_string());
    }

    #[test]
    fn test_run_of_publication_day_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        let layout = load_preset("nrldc").unwrap();
        let run_dir = dir
            .path()
            .join("NRLDC")
            .join(run_dir_name(today_ist()));
        let report = empty_report(&layout, Some(today_ist()));
        let written = crate::write_report(&report, &layout.file_stem, &run_dir).unwrap();

        let day = operating_day(None);
        let doc = merge_regions(dir.path(), &[layout], day);
        assert_eq!(doc.regions[0].source, MergeSource::File(written));
        assert_eq!(
            doc.regions[0].data["date"],
            day.format("%Y-%m-%d").to_string()
        );
    }

    #[test]
    fn test_publication_day_run_preferred_over_operating_day_run() {
        let dir = tempfile::tempdir().unwrap();
        let region_dir = dir.path().join("WRLDC");
        write(
            &region_dir.join("report_2025-03-14_09-00-00/wrldc_14032025.json"),
            r#"{"wrldc_table_2A": [{"state": "OLD"}]}"#,
        );
        write(
            &region_dir.join("report_2025-03-15_09-00-00/wrldc_15032025.json"),
            r#"{"wrldc_table_2A": [{"state": "GOA"}]}"#,
        );
        let doc = merge_regions(dir.path(), &[load_preset("wrldc").unwrap()], day());
        assert_eq!(doc.regions[0].data["wrldc_table_2A"], json!([{"state": "GOA"}]));
        assert_eq!(doc.regions[0].data["date"], "2025-03-14");
    }

    #[test]
    fn test_latest_run_of_day_wins() {
        let dir = tempfile::tempdir().unwrap();
        let region_dir = dir.path().join("NRLDC");
        std::fs::create_dir_all(region_dir.join("report_2025-03-14_08-00-00")).unwrap();
        std::fs::create_dir_all(region_dir.join("report_2025-03-14_10-30-00")).unwrap();
        assert_eq!(
            find_run_dir(&region_dir, day()),
            Some(region_dir.join("report_2025-03-14_10-30-00"))
        );
    }

    #[test]
    fn test_bad_json_uses_template() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("SRLDC/report_2025-03-14_09-00-00/srldc.json"),
            "{ not json",
        );
        let layouts = vec![load_preset("srldc").unwrap()];
        let doc = merge_regions(dir.path(), &layouts, day());
        assert_eq!(doc.regions[0].source, MergeSource::Template);
        assert_eq!(doc.regions[0].filled_tables.len(), 2);
    }

    #[test]
    fn test_document_keys_in_region_order() {
        let dir = tempfile::tempdir().unwrap();
        let layouts = vec![load_preset("wrldc").unwrap(), load_preset("nrldc").unwrap()];
        let doc = merge_regions(dir.path(), &layouts, day());
        let value = serde_json::to_value(&doc).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["WRLDC", "NRLDC"]);
    }

    #[test]
    fn test_write_merged() {
        let dir = tempfile::tempdir().unwrap();
        let doc = merge_regions(dir.path(), &[load_preset("nrldc").unwrap()], day());
        let path = write_merged(&doc, &dir.path().join("overall_json")).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("merged_reports_"));
        let back: JsonValue = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["NRLDC"]["date"], "2025-03-14");
    }

    #[test]
    fn test_has_content() {
        assert!(!has_content(&json!([])));
        assert!(!has_content(&json!([{}, {}])));
        assert!(!has_content(&json!({"a": 1})));
        assert!(has_content(&json!([{}, {"state": null}])));
    }
}
