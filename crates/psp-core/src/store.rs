use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::dating::now_ist;
use crate::error::PspError;
use crate::layout::schema::ReportLayout;
use crate::model::{Region, RegionReport, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite persistence for extracted rows and job bookkeeping.
pub struct Store {
    conn: Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Success,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }

    fn parse(s: &str) -> JobStatus {
        match s {
            "running" => JobStatus::Running,
            "success" => JobStatus::Success,
            _ => JobStatus::Failed,
        }
    }
}

/// Last known state of a named job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub name: String,
    pub status: JobStatus,
    pub last_run_time: Option<String>,
    pub last_success_time: Option<String>,
    pub has_data_for_today: bool,
    pub log_message: String,
}

/// Latest stored date and its row count for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub table_id: String,
    pub latest_date: Option<NaiveDate>,
    pub rows: usize,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, PspError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::create_schema(&conn)?;
        Ok(Store { conn })
    }

    pub fn open_in_memory() -> Result<Self, PspError> {
        let conn = Connection::open_in_memory()?;
        Self::create_schema(&conn)?;
        Ok(Store { conn })
    }

    fn create_schema(conn: &Connection) -> Result<(), PspError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS report_rows (
                region TEXT NOT NULL,
                table_id TEXT NOT NULL,
                report_date TEXT NOT NULL,
                row_key TEXT NOT NULL,
                record TEXT NOT NULL,   -- JSON object, keys in layout order
                updated_at TEXT NOT NULL,
                PRIMARY KEY (table_id, report_date, row_key)
            );

            CREATE INDEX IF NOT EXISTS idx_report_rows_region_date
                ON report_rows(region, report_date);

            CREATE TABLE IF NOT EXISTS jobs (
                name TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                last_run_time TEXT,
                last_success_time TEXT,
                has_data_for_today INTEGER NOT NULL DEFAULT 0,
                log_message TEXT NOT NULL DEFAULT ''
            );
            "#,
        )?;
        Ok(())
    }

    /// Upsert every extracted row of a report, one row per (table, date, row key).
    ///
    /// Template tables are not stored. Returns the number of rows written.
    pub fn save_report(&self, report: &RegionReport, layout: &ReportLayout) -> Result<usize, PspError> {
        let Some(date) = report.date else {
            tracing::warn!(region = %report.region, "report has no date, nothing stored");
            return Ok(0);
        };
        let date = date.format(DATE_FORMAT).to_string();
        let updated_at = now_ist().format(TIMESTAMP_FORMAT).to_string();

        let mut written = 0;
        for table in report.tables.iter().filter(|t| !t.is_template()) {
            let Some(spec) = layout.table(&table.id) else {
                tracing::warn!(table = %table.id, "table not in layout, skipped");
                continue;
            };
            let key = spec.row_key();

            for record in &table.records {
                let row_key = match record.get(key) {
                    Some(Value::Text(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    None => {
                        tracing::warn!(table = %table.id, "row without {key}, skipped");
                        continue;
                    }
                };

                let result = serde_json::to_string(record)
                    .map_err(PspError::from)
                    .and_then(|json| {
                        self.conn
                            .execute(
                                r#"INSERT INTO report_rows
                                       (region, table_id, report_date, row_key, record, updated_at)
                                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                                   ON CONFLICT(table_id, report_date, row_key) DO UPDATE SET
                                       record = excluded.record,
                                       updated_at = excluded.updated_at"#,
                                params![
                                    report.region.to_string(),
                                    table.id,
                                    date,
                                    row_key,
                                    json,
                                    updated_at
                                ],
                            )
                            .map_err(PspError::from)
                    });

                match result {
                    Ok(_) => written += 1,
                    Err(e) => {
                        tracing::error!(table = %table.id, row = %row_key, "failed to store row: {e}")
                    }
                }
            }
        }

        tracing::info!(region = %report.region, date = %date, rows = written, "stored report rows");
        Ok(written)
    }

    /// Is any row stored for this region and date?
    pub fn has_report(&self, region: Region, date: NaiveDate) -> Result<bool, PspError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM report_rows WHERE region = ?1 AND report_date = ?2)",
            params![region.to_string(), date.format(DATE_FORMAT).to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Stored rows of one table and date, as JSON objects.
    pub fn records(&self, table_id: &str, date: NaiveDate) -> Result<Vec<serde_json::Value>, PspError> {
        let mut stmt = self.conn.prepare(
            "SELECT record FROM report_rows WHERE table_id = ?1 AND report_date = ?2 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(
            params![table_id, date.format(DATE_FORMAT).to_string()],
            |row| row.get::<_, String>(0),
        )?;

        let mut records = Vec::new();
        for json in rows {
            records.push(serde_json::from_str(&json?)?);
        }
        Ok(records)
    }

    /// Latest date and row count of every stored table of a region.
    pub fn region_summary(&self, region: Region) -> Result<Vec<TableSummary>, PspError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT r.table_id, r.report_date, COUNT(*)
               FROM report_rows r
               WHERE r.region = ?1
                 AND r.report_date = (SELECT MAX(report_date) FROM report_rows
                                      WHERE table_id = r.table_id)
               GROUP BY r.table_id, r.report_date
               ORDER BY r.table_id"#,
        )?;
        let rows = stmt.query_map(params![region.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (table_id, date, count) = row?;
            summaries.push(TableSummary {
                table_id,
                latest_date: NaiveDate::parse_from_str(&date, DATE_FORMAT).ok(),
                rows: count.max(0) as usize,
            });
        }
        Ok(summaries)
    }

    /// Mark a job as running, creating it on first use.
    pub fn start_job(&self, name: &str) -> Result<(), PspError> {
        let now = now_ist().format(TIMESTAMP_FORMAT).to_string();
        self.conn.execute(
            r#"INSERT INTO jobs (name, status, last_run_time, log_message)
               VALUES (?1, ?2, ?3, 'Starting process...')
               ON CONFLICT(name) DO UPDATE SET
                   status = excluded.status,
                   last_run_time = excluded.last_run_time,
                   log_message = excluded.log_message"#,
            params![name, JobStatus::Running.as_str(), now],
        )?;
        Ok(())
    }

    /// Record the outcome of a job run.
    pub fn finish_job(
        &self,
        name: &str,
        status: JobStatus,
        has_data_for_today: bool,
        message: &str,
    ) -> Result<(), PspError> {
        let now = now_ist().format(TIMESTAMP_FORMAT).to_string();
        let success_time = (status == JobStatus::Success).then_some(now);
        self.conn.execute(
            r#"INSERT INTO jobs (name, status, last_success_time, has_data_for_today, log_message)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(name) DO UPDATE SET
                   status = excluded.status,
                   last_success_time = COALESCE(excluded.last_success_time, jobs.last_success_time),
                   has_data_for_today = excluded.has_data_for_today,
                   log_message = excluded.log_message"#,
            params![name, status.as_str(), success_time, has_data_for_today, message],
        )?;
        Ok(())
    }

    pub fn job(&self, name: &str) -> Result<Option<JobRecord>, PspError> {
        let job = self
            .conn
            .query_row(
                r#"SELECT name, status, last_run_time, last_success_time, has_data_for_today, log_message
                   FROM jobs WHERE name = ?1"#,
                params![name],
                |row| {
                    Ok(JobRecord {
                        name: row.get(0)?,
                        status: JobStatus::parse(&row.get::<_, String>(1)?),
                        last_run_time: row.get(2)?,
                        last_success_time: row.get(3)?,
                        has_data_for_today: row.get(4)?,
                        log_message: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::builtin::load_preset;
    use crate::layout::template::empty_table;
    use crate::model::{ExtractedTable, Record, TableOrigin};
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn state_row(state: Option<&str>, thermal: rust_decimal::Decimal) -> Record {
        let mut r = Record::new();
        r.insert("state", state.map(|s| Value::Text(s.into())));
        r.insert("thermal", Some(Value::Number(thermal)));
        r
    }

    fn report(records: Vec<Record>) -> (RegionReport, ReportLayout) {
        let layout = load_preset("nrldc").unwrap();
        let report = RegionReport {
            region: Region::Nrldc,
            date: Some(date()),
            tables: vec![
                ExtractedTable {
                    id: "nrldc_table_2A".into(),
                    origin: TableOrigin::Extracted,
                    records,
                },
                empty_table(layout.table("nrldc_table_2C").unwrap()),
            ],
        };
        (report, layout)
    }

    #[test]
    fn test_save_and_upsert() {
        let store = Store::open_in_memory().unwrap();
        let (first, layout) = report(vec![
            state_row(Some("PUNJAB"), dec!(1)),
            state_row(Some("HARYANA"), dec!(2)),
            state_row(None, dec!(3)),
        ]);
        assert_eq!(store.save_report(&first, &layout).unwrap(), 2);

        let (second, _) = report(vec![state_row(Some("PUNJAB"), dec!(10))]);
        assert_eq!(store.save_report(&second, &layout).unwrap(), 1);

        let rows = store.records("nrldc_table_2A", date()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["state"], "PUNJAB");
        assert_eq!(rows[0]["thermal"], 10.0);
        assert!(store.records("nrldc_table_2C", date()).unwrap().is_empty());
    }

    #[test]
    fn test_has_report_and_summary() {
        let store = Store::open_in_memory().unwrap();
        assert!(!store.has_report(Region::Nrldc, date()).unwrap());

        let (r, layout) = report(vec![state_row(Some("PUNJAB"), dec!(1))]);
        store.save_report(&r, &layout).unwrap();
        assert!(store.has_report(Region::Nrldc, date()).unwrap());
        assert!(!store.has_report(Region::Wrldc, date()).unwrap());

        let summary = store.region_summary(Region::Nrldc).unwrap();
        assert_eq!(
            summary,
            vec![TableSummary {
                table_id: "nrldc_table_2A".into(),
                latest_date: Some(date()),
                rows: 1,
            }]
        );
    }

    #[test]
    fn test_undated_report_is_not_stored() {
        let store = Store::open_in_memory().unwrap();
        let (mut r, layout) = report(vec![state_row(Some("PUNJAB"), dec!(1))]);
        r.date = None;
        assert_eq!(store.save_report(&r, &layout).unwrap(), 0);
    }

    #[test]
    fn test_job_lifecycle() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.job("nrldc").unwrap().is_none());

        store.start_job("nrldc").unwrap();
        let job = store.job("nrldc").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.last_run_time.is_some());
        assert!(job.last_success_time.is_none());

        store.finish_job("nrldc", JobStatus::Success, true, "done").unwrap();
        let job = store.job("nrldc").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Success);
        assert!(job.has_data_for_today);
        let success = job.last_success_time.clone();
        assert!(success.is_some());

        store.start_job("nrldc").unwrap();
        store.finish_job("nrldc", JobStatus::Failed, false, "boom").unwrap();
        let job = store.job("nrldc").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.log_message, "boom");
        assert_eq!(job.last_success_time, success);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("psp.sqlite3");
        Store::open(&path).unwrap();
        assert!(path.exists());
    }
}
