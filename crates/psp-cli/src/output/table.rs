use psp_core::model::{ExtractedTable, RegionReport};

/// Plain-text rendering of a region report, one block per table.
pub fn format_report(report: &RegionReport) -> String {
    let mut out = String::new();
    let date = report
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".into());
    out.push_str(&format!("{} report, date {}\n", report.region, date));

    for table in &report.tables {
        out.push('\n');
        out.push_str(&format_table(table));
    }
    out
}

fn format_table(table: &ExtractedTable) -> String {
    let mut out = String::new();
    let marker = if table.is_template() { " (empty template)" } else { "" };
    out.push_str(&format!("=== {}{} ===\n", table.id, marker));

    let Some(first) = table.records.first() else {
        return out;
    };
    let keys: Vec<&str> = first.keys().collect();
    let cells: Vec<Vec<String>> = table
        .records
        .iter()
        .map(|r| {
            keys.iter()
                .map(|k| r.get(k).map(|v| v.to_string()).unwrap_or_else(|| "-".into()))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = keys
        .iter()
        .enumerate()
        .map(|(i, k)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(k.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<w$}", v, w = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    out.push_str(&line(keys.clone()));
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    out.push('\n');
    for row in &cells {
        out.push_str(&line(row.iter().map(|s| s.as_str()).collect()));
        out.push('\n');
    }
    out
}
