use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PspError {
    #[error("grid extraction failed: {0}")]
    Extraction(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("no tables found in document (backend: {backend})")]
    NoTables { backend: String },

    #[error("failed to load layout from {path}: {reason}")]
    LayoutLoad { path: PathBuf, reason: String },

    #[error("invalid layout: {0}")]
    LayoutInvalid(String),

    #[error("invalid settings: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("no report available for {region} (tried {tried})")]
    ReportUnavailable { region: String, tried: String },

    #[error("download failed: {0}")]
    Download(String),

    #[error("API rejected push with status {status}: {body}")]
    PushRejected { status: u16, body: String },

    #[error("unknown region '{0}'. Available: NRLDC, SRLDC, WRLDC, POSOCO")]
    UnknownRegion(String),

    #[error("{failed} of {total} file(s) could not be extracted")]
    ExtractionsFailed { failed: usize, total: usize },

    #[error("run failed for {0}")]
    RegionsFailed(String),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
