use psp_core::config::Settings;
use psp_core::dating::{operating_day, parse_date_arg};
use psp_core::error::PspError;
use psp_core::layout::builtin::preset_for;
use psp_core::merge::{merge_regions, write_merged, MergeSource};
use psp_core::push::push_merged;
use psp_core::store::{JobStatus, Store};
use std::path::Path;

use crate::logging::LogFile;

const JOB_NAME: &str = "merge";

pub fn run(
    config: Option<&Path>,
    log_file: &LogFile,
    date: Option<String>,
    no_push: bool,
) -> Result<(), PspError> {
    let settings = Settings::resolve(config)?;
    if let Err(e) = log_file.switch_to(&settings.merge_log()) {
        tracing::warn!("cannot open merge log file: {e}");
    }
    let day = operating_day(date.as_deref().map(parse_date_arg).transpose()?);

    let store = Store::open(&settings.database)?;
    store.start_job(JOB_NAME)?;

    let result = merge_and_push(&settings, day, no_push);
    match &result {
        Ok((message, has_data)) => store.finish_job(JOB_NAME, JobStatus::Success, *has_data, message)?,
        Err(e) => store.finish_job(JOB_NAME, JobStatus::Failed, false, &e.to_string())?,
    }
    log_file.close();
    result.map(|_| ())
}

fn merge_and_push(settings: &Settings, day: chrono::NaiveDate, no_push: bool) -> Result<(String, bool), PspError> {
    let layouts = settings
        .regions
        .iter()
        .map(|&region| preset_for(region))
        .collect::<Result<Vec<_>, _>>()?;

    let doc = merge_regions(&settings.download_dir, &layouts, day);
    for region in &doc.regions {
        match &region.source {
            MergeSource::File(path) if region.filled_tables.is_empty() => {
                println!("{}: {}", region.region, path.display())
            }
            MergeSource::File(path) => println!(
                "{}: {} (empty template for {})",
                region.region,
                path.display(),
                region.filled_tables.join(", ")
            ),
            MergeSource::Template => println!("{}: no report, empty template", region.region),
        }
    }

    let has_data = doc
        .regions
        .iter()
        .any(|r| matches!(r.source, MergeSource::File(_)));
    let path = write_merged(&doc, &settings.merged_dir())?;
    println!("\nMerged reports for {day} saved to {}", path.display());

    if no_push {
        return Ok((format!("Merged {day} without push."), has_data));
    }
    let Some(api_url) = settings.api_url.as_deref() else {
        tracing::warn!("no api_url configured, skipping push");
        return Ok((format!("Merged {day}; no API configured."), has_data));
    };

    let receipt = push_merged(api_url, &doc, settings.http_timeout())?;
    println!("Pushed to API (status {})", receipt.status);
    if !receipt.body.trim().is_empty() {
        println!("Response: {}", receipt.body.trim());
    }
    Ok((
        format!("Merged and pushed {day} (status {}).", receipt.status),
        has_data,
    ))
}
