use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Asia::Kolkata;
use chrono_tz::Tz;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::PspError;

/// Position of day, month and year capture groups in a date pattern.
struct DatePattern {
    regex: Regex,
    year: usize,
    month: usize,
    day: usize,
}

fn pattern(re: &str, year: usize, month: usize, day: usize) -> DatePattern {
    DatePattern {
        regex: Regex::new(re).expect("built-in date pattern is valid"),
        year,
        month,
        day,
    }
}

/// Date layouts seen in report file and directory names, in priority order.
static DATE_PATTERNS: LazyLock<Vec<DatePattern>> = LazyLock::new(|| {
    vec![
        pattern(r"(\d{4})-(\d{2})-(\d{2})", 1, 2, 3),
        pattern(r"(\d{2})-(\d{2})-(\d{4})", 3, 2, 1),
        pattern(r"(?i)daily(\d{2})(\d{2})(\d{2})", 3, 2, 1),
        pattern(r"(\d{2})(\d{2})(\d{4})", 3, 2, 1),
        pattern(r"(\d{4})(\d{2})(\d{2})", 1, 2, 3),
        pattern(r"(\d{2})\.(\d{2})\.(\d{2})", 3, 2, 1),
    ]
});

/// Current time in IST, the clock the reports follow.
pub fn now_ist() -> DateTime<Tz> {
    Utc::now().with_timezone(&Kolkata)
}

/// Today's date in IST.
pub fn today_ist() -> NaiveDate {
    now_ist().date_naive()
}

/// The day a combined report describes: the explicit date, or yesterday (IST).
pub fn operating_day(explicit: Option<NaiveDate>) -> NaiveDate {
    explicit.unwrap_or_else(|| today_ist() - Duration::days(1))
}

/// The day the report describing `operating_day` is published and fetched.
///
/// `run` names its run directories by this date, `merge` stamps the
/// operating day.
pub fn publication_day(operating_day: NaiveDate) -> NaiveDate {
    operating_day + Duration::days(1)
}

/// Parse a `YYYY-MM-DD` command-line date.
pub fn parse_date_arg(s: &str) -> Result<NaiveDate, PspError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| PspError::InvalidDate(s.to_string()))
}

/// First valid calendar date found in `text`.
pub fn date_in_text(text: &str) -> Option<NaiveDate> {
    DATE_PATTERNS.iter().find_map(|p| {
        p.regex.captures_iter(text).find_map(|caps| {
            let year: i32 = caps.get(p.year)?.as_str().parse().ok()?;
            let year = if year < 100 { 2000 + year } else { year };
            let month: u32 = caps.get(p.month)?.as_str().parse().ok()?;
            let day: u32 = caps.get(p.day)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })
    })
}

/// One way of inferring a report's date from where its file lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStrategy {
    /// Search the file name.
    FileName,
    /// Search the name of the containing directory.
    ParentDir,
    /// Always answer with this date.
    Fixed(NaiveDate),
}

impl DateStrategy {
    pub fn resolve(&self, path: &Path) -> Option<NaiveDate> {
        match self {
            DateStrategy::FileName => path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(date_in_text),
            DateStrategy::ParentDir => path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .and_then(date_in_text),
            DateStrategy::Fixed(date) => Some(*date),
        }
    }
}

/// File name, then directory name, then `fallback`.
pub fn default_chain(fallback: NaiveDate) -> [DateStrategy; 3] {
    [
        DateStrategy::FileName,
        DateStrategy::ParentDir,
        DateStrategy::Fixed(fallback),
    ]
}

/// Try each strategy in order; the first answer wins.
pub fn resolve_report_date(path: &Path, chain: &[DateStrategy]) -> Option<NaiveDate> {
    chain.iter().find_map(|s| {
        let date = s.resolve(path);
        if let Some(d) = date {
            tracing::debug!(strategy = ?s, date = %d, path = %path.display(), "resolved report date");
        }
        date
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(date_in_text("report_2025-03-14_10-20-30"), Some(ymd(2025, 3, 14)));
    }

    #[test]
    fn test_day_month_year() {
        assert_eq!(date_in_text("WRLDC_PSP_Report_14-03-2025.pdf"), Some(ymd(2025, 3, 14)));
    }

    #[test]
    fn test_daily_short_year() {
        assert_eq!(date_in_text("Daily140325.pdf"), Some(ymd(2025, 3, 14)));
    }

    #[test]
    fn test_compact_forms() {
        assert_eq!(date_in_text("nrldc_14032025.json"), Some(ymd(2025, 3, 14)));
        assert_eq!(date_in_text("psp_20250314.json"), Some(ymd(2025, 3, 14)));
    }

    #[test]
    fn test_dotted_short_year() {
        assert_eq!(date_in_text("14.03.25_NLDC_PSP.pdf"), Some(ymd(2025, 3, 14)));
    }

    #[test]
    fn test_invalid_calendar_date_is_skipped() {
        assert_eq!(date_in_text("2025-02-30 and 01-03-2025"), Some(ymd(2025, 3, 1)));
        assert_eq!(date_in_text("no date here"), None);
    }

    #[test]
    fn test_chain_order() {
        let fallback = ymd(2000, 1, 1);
        let chain = default_chain(fallback);
        let in_name = Path::new("report_2025-01-02_00-00-00/nrldc_03012025.json");
        assert_eq!(resolve_report_date(in_name, &chain), Some(ymd(2025, 1, 3)));
        let in_dir = Path::new("report_2025-01-02_00-00-00/psp.pdf");
        assert_eq!(resolve_report_date(in_dir, &chain), Some(ymd(2025, 1, 2)));
        let nowhere = Path::new("downloads/psp.pdf");
        assert_eq!(resolve_report_date(nowhere, &chain), Some(fallback));
    }

    #[test]
    fn test_parse_date_arg() {
        assert_eq!(parse_date_arg("2025-03-14").unwrap(), ymd(2025, 3, 14));
        assert!(matches!(parse_date_arg("14/03/2025"), Err(PspError::InvalidDate(_))));
    }

    #[test]
    fn test_operating_day_explicit() {
        assert_eq!(operating_day(Some(ymd(2025, 3, 14))), ymd(2025, 3, 14));
        assert_eq!(operating_day(None), today_ist() - Duration::days(1));
    }

    #[test]
    fn test_default_operating_day_is_published_today() {
        assert_eq!(publication_day(operating_day(None)), today_ist());
        assert_eq!(publication_day(ymd(2025, 2, 28)), ymd(2025, 3, 1));
    }

    #[test]
    fn test_clock_is_ist() {
        use chrono::Offset;
        assert_eq!(now_ist().offset().fix().local_minus_utc(), 5 * 3600 + 30 * 60);
    }
}
