use chrono::NaiveDate;

use crate::layout::schema::{ReportLayout, TableSpec};
use crate::model::{ExtractedTable, Record, RegionReport, TableOrigin, Value};

/// The fixed-shape stand-in for a table that could not be extracted.
///
/// Every declared key is present and null. With `template_rows`, one record
/// per label carries the label in its row-key column.
pub fn empty_records(spec: &TableSpec) -> Vec<Record> {
    let blank = || {
        let mut record = Record::new();
        for key in spec.keys() {
            record.insert(key, None);
        }
        record
    };

    if spec.template_rows.is_empty() {
        return vec![blank()];
    }

    spec.template_rows
        .iter()
        .map(|label| {
            let mut record = blank();
            record.insert(spec.row_key(), Some(Value::Text(label.clone())));
            record
        })
        .collect()
}

pub fn empty_table(spec: &TableSpec) -> ExtractedTable {
    ExtractedTable {
        id: spec.id.clone(),
        origin: TableOrigin::Template,
        records: empty_records(spec),
    }
}

/// A whole-region report made only of templates.
pub fn empty_report(layout: &ReportLayout, date: Option<NaiveDate>) -> RegionReport {
    RegionReport {
        region: layout.region,
        date,
        tables: layout.tables.iter().map(empty_table).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::builtin::load_preset;

    #[test]
    fn test_template_rows_fill_row_key() {
        let layout = load_preset("nrldc").unwrap();
        let spec = layout.table("nrldc_table_2A").unwrap();
        let records = empty_records(spec);
        assert_eq!(records.len(), spec.template_rows.len());
        assert_eq!(records[0].get("state"), Some(&Value::Text("PUNJAB".into())));
        assert_eq!(records[0].len(), spec.columns.len());
        assert!(records[0].get("thermal").is_none());
        assert!(records[0].contains_key("thermal"));
    }

    #[test]
    fn test_single_null_record_without_template_rows() {
        let mut spec = load_preset("nrldc").unwrap().tables[0].clone();
        spec.template_rows.clear();
        let records = empty_records(&spec);
        assert_eq!(records.len(), 1);
        assert!(records[0].is_all_null());
        assert_eq!(
            records[0].keys().collect::<Vec<_>>(),
            spec.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_empty_report_covers_every_table() {
        let layout = load_preset("posoco").unwrap();
        let report = empty_report(&layout, None);
        let ids: Vec<_> = report.tables.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["posoco_table_a", "posoco_table_g"]);
        assert!(report.tables.iter().all(|t| t.is_template()));
    }
}
