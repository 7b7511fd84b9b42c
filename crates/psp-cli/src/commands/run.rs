use chrono::NaiveDate;
use psp_core::config::Settings;
use psp_core::dating::{default_chain, parse_date_arg, resolve_report_date, today_ist};
use psp_core::download::{remove_if_empty, run_dir_name, Downloader};
use psp_core::error::PspError;
use psp_core::layout::template::empty_report;
use psp_core::layout::CompiledLayout;
use psp_core::model::Region;
use psp_core::store::{JobStatus, Store};
use std::path::{Path, PathBuf};

use super::extract::extract_file;
use super::resolve_layout;
use crate::logging::LogFile;

pub struct RunOptions {
    pub regions: Vec<Region>,
    pub date: Option<String>,
    pub pdf: Option<PathBuf>,
    pub layout: Option<PathBuf>,
    pub force: bool,
    pub no_store: bool,
}

/// What a region run produced.
enum Outcome {
    Skipped(NaiveDate),
    Done {
        date: NaiveDate,
        records: usize,
        json: PathBuf,
    },
}

pub fn run(config: Option<&Path>, log_file: &LogFile, options: RunOptions) -> Result<(), PspError> {
    let settings = Settings::resolve(config)?;
    let regions = if options.regions.is_empty() {
        settings.regions.clone()
    } else {
        options.regions.clone()
    };
    if regions.len() > 1 && (options.pdf.is_some() || options.layout.is_some()) {
        return Err(PspError::LayoutInvalid(
            "--pdf and --layout need exactly one region".into(),
        ));
    }

    let store = Store::open(&settings.database)?;
    let explicit = options.date.as_deref().map(parse_date_arg).transpose()?;
    let mut failed = Vec::new();

    for region in regions {
        if let Err(e) = log_file.switch_to(&settings.region_log(region)) {
            tracing::warn!(%region, "cannot open region log file: {e}");
        }
        let job = region.slug();
        store.start_job(job)?;

        match run_region(region, &settings, &store, &options, explicit) {
            Ok(Outcome::Skipped(date)) => {
                let message = format!("Data for {date} already exists.");
                tracing::info!(%region, "{message} Skipping.");
                store.finish_job(job, JobStatus::Success, date == today_ist(), &message)?;
                println!("{region}: data for {date} already stored, skipped");
            }
            Ok(Outcome::Done { date, records, json }) => {
                let message = format!("Processed report for {date}: {records} record(s).");
                tracing::info!(%region, "{message}");
                store.finish_job(job, JobStatus::Success, date == today_ist(), &message)?;
                println!("{region}: {records} record(s) for {date} -> {}", json.display());
            }
            Err(e) => {
                tracing::error!(%region, "run failed: {e}");
                store.finish_job(job, JobStatus::Failed, false, &e.to_string())?;
                eprintln!("{region}: {e}");
                failed.push(region.to_string());
            }
        }
    }
    log_file.close();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(PspError::RegionsFailed(failed.join(", ")))
    }
}

fn run_region(
    region: Region,
    settings: &Settings,
    store: &Store,
    options: &RunOptions,
    explicit: Option<NaiveDate>,
) -> Result<Outcome, PspError> {
    let layout = CompiledLayout::compile(resolve_layout(region, options.layout.as_deref())?)?;
    let region_dir = settings.region_dir(region);

    let (pdf, date, run_dir) = match &options.pdf {
        Some(pdf) => {
            let date = explicit
                .or_else(|| resolve_report_date(pdf, &default_chain(today_ist())))
                .unwrap_or_else(today_ist);
            if !options.force && store.has_report(region, date)? {
                return Ok(Outcome::Skipped(date));
            }
            let run_dir = region_dir.join(run_dir_name(date));
            (pdf.clone(), date, run_dir)
        }
        None => {
            let latest = explicit.unwrap_or_else(today_ist);
            if !options.force && store.has_report(region, latest)? {
                return Ok(Outcome::Skipped(latest));
            }
            let source = layout.layout.source.as_ref().ok_or_else(|| {
                PspError::Download(format!(
                    "{region} publishes no download source; pass --pdf <FILE>"
                ))
            })?;
            let downloader = Downloader::new(settings.http_timeout())?;
            let fetched = downloader.fetch(region, source, latest, &region_dir)?;
            (fetched.path, fetched.date, fetched.run_dir)
        }
    };

    let report = match extract_file(&pdf, &layout, Some(date)) {
        Ok(report) => report,
        Err(e @ PspError::NoTables { .. }) => {
            remove_if_empty(&run_dir);
            return Err(e);
        }
        Err(e) => {
            tracing::error!(%region, file = %pdf.display(), "extraction failed, writing empty templates: {e}");
            empty_report(&layout.layout, Some(date))
        }
    };

    let json = psp_core::write_report(&report, &layout.layout.file_stem, &run_dir)?;
    if !options.no_store {
        store.save_report(&report, &layout.layout)?;
    }

    Ok(Outcome::Done {
        date,
        records: report.record_count(),
        json,
    })
}
