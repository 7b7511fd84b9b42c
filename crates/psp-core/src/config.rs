use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PspError;
use crate::model::Region;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "PSP_CONFIG";
/// Prefix of environment variables overriding single settings
/// (`PSP_API_URL`, `PSP_DATABASE`, ...).
pub const ENV_PREFIX: &str = "PSP";

/// Runtime settings shared by all commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the per-region run directories and the merged output.
    pub download_dir: PathBuf,
    /// SQLite database file.
    pub database: PathBuf,
    /// Directory of the per-region log files.
    pub log_dir: PathBuf,
    /// Endpoint receiving the merged document. No push when unset.
    pub api_url: Option<String>,
    /// Regions processed by `run` and `merge`, in output order.
    pub regions: Vec<Region>,
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            download_dir: PathBuf::from("downloads"),
            database: PathBuf::from("psp.sqlite3"),
            log_dir: PathBuf::from("logs"),
            api_url: None,
            regions: Region::ALL.to_vec(),
            http_timeout_secs: 30,
        }
    }
}

/// `PSP_<FIELD>` variables; blank values are ignored.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .ignore_empty(true)
}

impl Settings {
    /// Layer an optional JSON settings file and the environment over the
    /// defaults. Missing fields keep their defaults.
    pub fn load(file: Option<&Path>, env: Environment) -> Result<Self, PspError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "loading settings");
            builder = builder.add_source(File::from(path).format(FileFormat::Json));
        }
        let settings = builder.add_source(env).build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Resolve settings: explicit file, then `PSP_CONFIG`, then defaults,
    /// with `PSP_*` variables on top.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, PspError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let file = explicit.map(Path::to_path_buf).or(from_env);
        Settings::load(file.as_deref(), environment())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    /// `<download_dir>/<REGION>`.
    pub fn region_dir(&self, region: Region) -> PathBuf {
        self.download_dir.join(region.to_string())
    }

    /// `<log_dir>/<region>.log`.
    pub fn region_log(&self, region: Region) -> PathBuf {
        self.log_dir.join(format!("{}.log", region.slug()))
    }

    pub fn merge_log(&self) -> PathBuf {
        self.log_dir.join("merge.log")
    }

    pub fn merged_dir(&self) -> PathBuf {
        self.download_dir.join("overall_json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(source))
    }

    fn json_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let s = Settings::load(None, env(&[])).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.regions.len(), 4);
        assert_eq!(s.http_timeout(), Duration::from_secs(30));
        assert_eq!(s.region_dir(Region::Nrldc), PathBuf::from("downloads/NRLDC"));
        assert_eq!(s.region_log(Region::Posoco), PathBuf::from("logs/posoco.log"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = json_file(r#"{"download_dir": "/data/psp", "regions": ["WRLDC", "NRLDC"]}"#);
        let s = Settings::load(Some(file.path()), env(&[])).unwrap();
        assert_eq!(s.download_dir, PathBuf::from("/data/psp"));
        assert_eq!(s.regions, vec![Region::Wrldc, Region::Nrldc]);
        assert_eq!(s.database, PathBuf::from("psp.sqlite3"));
    }

    #[test]
    fn test_bad_file() {
        let file = json_file("not json");
        assert!(matches!(
            Settings::load(Some(file.path()), env(&[])),
            Err(PspError::Settings(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Settings::load(Some(Path::new("/nonexistent/psp.json")), env(&[])),
            Err(PspError::Settings(_))
        ));
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = json_file(r#"{"database": "file.db", "http_timeout_secs": 5}"#);
        let s = Settings::load(
            Some(file.path()),
            env(&[
                ("PSP_API_URL", "https://api.example/psp"),
                ("PSP_DATABASE", "/tmp/x.db"),
                ("PSP_HTTP_TIMEOUT_SECS", "60"),
            ]),
        )
        .unwrap();
        assert_eq!(s.api_url.as_deref(), Some("https://api.example/psp"));
        assert_eq!(s.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(s.http_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_blank_environment_value_ignored() {
        let file = json_file(r#"{"api_url": "https://api.example/psp"}"#);
        let s = Settings::load(Some(file.path()), env(&[("PSP_API_URL", "")])).unwrap();
        assert_eq!(s.api_url.as_deref(), Some("https://api.example/psp"));
    }
}
