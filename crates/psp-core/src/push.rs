use chrono::NaiveDate;
use reqwest::blocking::Client;
use std::time::Duration;

use crate::error::PspError;
use crate::merge::MergedDocument;

/// Accepted push response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReceipt {
    pub status: u16,
    pub body: String,
}

/// `<api_url>?date=<YYYY-MM-DD>`, appended with `&` when the URL already has a query.
pub fn push_url(api_url: &str, date: NaiveDate) -> String {
    let sep = if api_url.contains('?') { '&' } else { '?' };
    format!("{}{}date={}", api_url, sep, date.format("%Y-%m-%d"))
}

/// POST the merged document as JSON.
///
/// 200 and 201 are success; any other status is `PushRejected` carrying the
/// response body. Connection failures surface as `Http` errors.
pub fn push_merged(
    api_url: &str,
    doc: &MergedDocument,
    timeout: Duration,
) -> Result<PushReceipt, PspError> {
    let url = push_url(api_url, doc.date);
    tracing::info!(%url, "pushing merged document");

    let client = Client::builder().timeout(timeout).build()?;
    let response = client.post(&url).json(doc).send()?;
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();

    match status {
        200 | 201 => {
            tracing::info!(status, "push accepted");
            Ok(PushReceipt { status, body })
        }
        _ => {
            tracing::error!(status, %body, "push rejected");
            Err(PspError::PushRejected { status, body })
        }
    }
}
