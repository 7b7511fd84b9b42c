use chrono::{Duration, NaiveDate};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dating::now_ist;
use crate::error::PspError;
use crate::layout::schema::ReportSource;
use crate::model::Region;

const BROWSER_AGENT: &str = "Mozilla/5.0";

/// A report file saved into its per-run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedReport {
    /// Operating day of the report that was found.
    pub date: NaiveDate,
    pub path: PathBuf,
    pub run_dir: PathBuf,
}

/// Listing returned by a document-index endpoint.
#[derive(Debug, Deserialize)]
struct DocumentList {
    #[serde(rename = "recordsFiltered", default)]
    records_filtered: serde_json::Value,
    #[serde(default)]
    data: Vec<DocumentEntry>,
}

#[derive(Debug, Deserialize)]
struct DocumentEntry {
    file_name: String,
    #[serde(default)]
    title: Option<String>,
}

impl DocumentList {
    fn first(&self) -> Option<&DocumentEntry> {
        let filtered = match &self.records_filtered {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        if filtered == Some(0) {
            return None;
        }
        self.data.first()
    }
}

/// Fetches published reports over HTTP.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(timeout: std::time::Duration) -> Result<Self, PspError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Downloader { client })
    }

    /// Download the newest report available on or before `latest`.
    ///
    /// Days are tried newest first, up to the source's lookback. The file is
    /// saved to `<region_dir>/report_<date>_<HH-MM-SS>/`.
    pub fn fetch(
        &self,
        region: Region,
        source: &ReportSource,
        latest: NaiveDate,
        region_dir: &Path,
    ) -> Result<DownloadedReport, PspError> {
        let dates = candidate_dates(latest, source.lookback_days());

        for &date in &dates {
            let attempt = match source {
                ReportSource::DatedUrl { url, .. } => self.try_dated_url(url, date),
                ReportSource::DocumentIndex {
                    index_url,
                    download_url,
                    referer,
                    ..
                } => self.try_document_index(index_url, download_url, referer.as_deref(), date),
            };

            match attempt {
                Ok(Some((file_name, bytes))) => {
                    let run_dir = region_dir.join(run_dir_name(date));
                    return save_report(&run_dir, &file_name, &bytes).map(|path| {
                        tracing::info!(%region, %date, path = %path.display(), "downloaded report");
                        DownloadedReport { date, path, run_dir }
                    });
                }
                Ok(None) => {
                    tracing::info!(%region, %date, "no report published");
                }
                Err(e) => {
                    tracing::warn!(%region, %date, "download attempt failed: {e}");
                }
            }
        }

        Err(PspError::ReportUnavailable {
            region: region.to_string(),
            tried: dates
                .iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    fn try_dated_url(
        &self,
        template: &str,
        date: NaiveDate,
    ) -> Result<Option<(String, Vec<u8>)>, PspError> {
        let url = dated_url(template, date);
        tracing::debug!(%url, "requesting report");
        let response = self.client.get(&url).headers(browser_headers(None)).send()?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PspError::Download(format!("{} returned {}", url, response.status())));
        }

        let file_name = url_file_name(&url).unwrap_or_else(|| format!("report_{}.pdf", date));
        Ok(Some((file_name, response.bytes()?.to_vec())))
    }

    fn try_document_index(
        &self,
        index_template: &str,
        download_template: &str,
        referer: Option<&str>,
        date: NaiveDate,
    ) -> Result<Option<(String, Vec<u8>)>, PspError> {
        let headers = browser_headers(referer);
        let index_url = index_url(index_template, date);
        tracing::debug!(url = %index_url, "fetching document list");

        let list: DocumentList = self
            .client
            .get(&index_url)
            .headers(headers.clone())
            .send()?
            .error_for_status()?
            .json()?;
        let Some(entry) = list.first() else {
            return Ok(None);
        };

        let url = file_download_url(download_template, &entry.file_name);
        let bytes = self
            .client
            .get(&url)
            .headers(headers)
            .send()?
            .error_for_status()?
            .bytes()?;

        let file_name = match &entry.title {
            Some(title) if !title.trim().is_empty() => format!("{}.pdf", sanitize(title)),
            _ => sanitize(&entry.file_name),
        };
        Ok(Some((file_name, bytes.to_vec())))
    }
}

/// `latest`, then each earlier day up to `lookback` days in total.
pub fn candidate_dates(latest: NaiveDate, lookback: u32) -> Vec<NaiveDate> {
    (0..lookback.max(1))
        .map(|back| latest - Duration::days(i64::from(back)))
        .collect()
}

/// Expand chrono `strftime` specifiers in a URL template.
pub fn dated_url(template: &str, date: NaiveDate) -> String {
    date.format(template).to_string()
}

pub fn index_url(template: &str, date: NaiveDate) -> String {
    template.replace("{date}", &date.format("%Y-%m-%d").to_string())
}

pub fn file_download_url(template: &str, file_name: &str) -> String {
    template.replace("{file_name}", &urlencoding::encode(file_name))
}

/// `report_<YYYY-MM-DD>_<HH-MM-SS>`, stamped with the current IST time.
pub fn run_dir_name(date: NaiveDate) -> String {
    format!(
        "report_{}_{}",
        date.format("%Y-%m-%d"),
        now_ist().format("%H-%M-%S")
    )
}

fn browser_headers(referer: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, application/pdf, */*"));
    headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
    if let Some(value) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
        headers.insert(REFERER, value);
    }
    headers
}

fn url_file_name(url: &str) -> Option<String> {
    let name = url.rsplit('/').next()?.split(['?', '#']).next()?;
    let decoded = urlencoding::decode(name).ok()?;
    let name = sanitize(&decoded);
    (!name.is_empty()).then_some(name)
}

fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect()
}

/// Write the file, removing the run directory again if nothing could be saved.
fn save_report(run_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, PspError> {
    std::fs::create_dir_all(run_dir)?;
    let path = run_dir.join(file_name);
    if let Err(e) = std::fs::write(&path, bytes) {
        remove_if_empty(run_dir);
        return Err(e.into());
    }
    Ok(path)
}

/// Remove a directory that holds no entries. Errors are ignored.
pub fn remove_if_empty(dir: &Path) {
    let empty = std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if empty && std::fs::remove_dir(dir).is_ok() {
        tracing::debug!(dir = %dir.display(), "removed empty run directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_candidate_dates_newest_first() {
        assert_eq!(
            candidate_dates(ymd(2025, 3, 1), 3),
            vec![ymd(2025, 3, 1), ymd(2025, 2, 28), ymd(2025, 2, 27)]
        );
        assert_eq!(candidate_dates(ymd(2025, 3, 1), 0), vec![ymd(2025, 3, 1)]);
    }

    #[test]
    fn test_dated_url() {
        let url = dated_url(
            "https://reporting.wrldc.in:8081/PSP/%Y/%B/WRLDC_PSP_Report_%d-%m-%Y.pdf",
            ymd(2025, 3, 7),
        );
        assert_eq!(
            url,
            "https://reporting.wrldc.in:8081/PSP/2025/March/WRLDC_PSP_Report_07-03-2025.pdf"
        );
        assert_eq!(
            dated_url("https://webcdn.grid-india.in/files/grdw/%Y/%m/%d.%m.%y_NLDC_PSP.pdf", ymd(2025, 3, 7)),
            "https://webcdn.grid-india.in/files/grdw/2025/03/07.03.25_NLDC_PSP.pdf"
        );
    }

    #[test]
    fn test_index_and_download_urls() {
        assert_eq!(
            index_url("https://x/list?start_date={date}&end_date={date}", ymd(2025, 3, 7)),
            "https://x/list?start_date=2025-03-07&end_date=2025-03-07"
        );
        assert_eq!(
            file_download_url("https://x/dl?any=Reports%2F{file_name}", "PSP 07.03.2025.pdf"),
            "https://x/dl?any=Reports%2FPSP%2007.03.2025.pdf"
        );
    }

    #[test]
    fn test_document_list_first() {
        let list: DocumentList = serde_json::from_str(
            r#"{"recordsFiltered": 1, "data": [{"file_name": "a.pdf", "title": "Daily PSP"}]}"#,
        )
        .unwrap();
        assert_eq!(list.first().unwrap().file_name, "a.pdf");

        let empty: DocumentList =
            serde_json::from_str(r#"{"recordsFiltered": "0", "data": []}"#).unwrap();
        assert!(empty.first().is_none());
    }

    #[test]
    fn test_url_file_name() {
        assert_eq!(
            url_file_name("https://x/a/07.03.25_NLDC_PSP.pdf").as_deref(),
            Some("07.03.25_NLDC_PSP.pdf")
        );
        assert_eq!(url_file_name("https://x/a%20b.pdf?x=1").as_deref(), Some("a b.pdf"));
    }

    #[test]
    fn test_run_dir_name_format() {
        let name = run_dir_name(ymd(2025, 3, 7));
        assert!(name.starts_with("report_2025-03-07_"));
        assert_eq!(name.len(), "report_2025-03-07_00-00-00".len());
    }

    #[test]
    fn test_remove_if_empty() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        let full = dir.path().join("full");
        std::fs::create_dir(&empty).unwrap();
        std::fs::create_dir(&full).unwrap();
        std::fs::write(full.join("a.pdf"), b"x").unwrap();
        remove_if_empty(&empty);
        remove_if_empty(&full);
        assert!(!empty.exists());
        assert!(full.exists());
    }
}
