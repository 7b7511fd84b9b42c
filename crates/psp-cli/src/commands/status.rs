use psp_core::config::Settings;
use psp_core::error::PspError;
use psp_core::store::{JobRecord, Store};
use std::path::Path;

pub fn run(config: Option<&Path>, lines: usize) -> Result<(), PspError> {
    let settings = Settings::resolve(config)?;
    let store = Store::open(&settings.database)?;

    for (i, region) in settings.regions.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("=== {} ===\n", region);
        print_job(store.job(region.slug())?.as_ref());

        let summary = store.region_summary(*region)?;
        if summary.is_empty() {
            println!("  No stored rows.");
        }
        for table in &summary {
            let date = table
                .latest_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".into());
            println!("  {:<18} latest {}  {} row(s)", table.table_id, date, table.rows);
        }

        print_log_tail(&settings.region_log(*region), lines);
    }

    println!("\n=== Merge ===\n");
    print_job(store.job("merge")?.as_ref());
    print_log_tail(&settings.merge_log(), lines);

    Ok(())
}

fn print_job(job: Option<&JobRecord>) {
    let Some(job) = job else {
        println!("  Never run.");
        return;
    };
    println!("  Status:        {}", job.status.as_str());
    println!("  Last run:      {}", job.last_run_time.as_deref().unwrap_or("-"));
    println!("  Last success:  {}", job.last_success_time.as_deref().unwrap_or("-"));
    println!(
        "  Data today:    {}",
        if job.has_data_for_today { "yes" } else { "no" }
    );
    if !job.log_message.is_empty() {
        println!("  Message:       {}", job.log_message);
    }
}

fn print_log_tail(path: &Path, lines: usize) {
    if lines == 0 {
        return;
    }
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };
    let all: Vec<&str> = content.lines().collect();
    let tail = &all[all.len().saturating_sub(lines)..];
    if tail.is_empty() {
        return;
    }
    println!("\n  Log ({}):", path.display());
    for line in tail {
        println!("    {line}");
    }
}
