use psp_core::error::PspError;
use psp_core::layout::builtin;
use psp_core::layout::schema::{Orientation, ValueKind};
use std::path::Path;

pub fn list() -> Result<(), PspError> {
    println!("Available predefined layouts:\n");
    for name in builtin::PRESETS {
        let layout = builtin::load_preset(name)?;
        println!("  {:<8} {} (v{})", name, layout.name, layout.version);
        if let Some(ref desc) = layout.description {
            println!("           {}", desc);
        }
        let ids: Vec<_> = layout.tables.iter().map(|t| t.id.as_str()).collect();
        println!("           tables: {}", ids.join(", "));
        println!();
    }
    Ok(())
}

pub fn show(preset: &str, json: bool) -> Result<(), PspError> {
    let layout = builtin::load_preset(preset)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
        return Ok(());
    }

    println!("{} (version {})\n", layout.name, layout.version);
    if let Some(ref desc) = layout.description {
        println!("{}\n", desc);
    }

    for table in &layout.tables {
        println!("{}", table.id);
        if let Some(ref title) = table.title {
            println!("  {}", title);
        }
        println!("  start: {}", table.start_marker);
        if let Some(ref end) = table.end_marker {
            println!("  end:   {}", end);
        }
        let orientation = match table.orientation {
            Orientation::Columns => "",
            Orientation::Rows => ", transposed",
        };
        println!(
            "  {} header row(s){}{}",
            table.header_rows,
            if table.fixed_header { ", fixed captions" } else { "" },
            orientation
        );
        if !table.allowed_rows.is_empty() {
            println!("  rows:  {}", table.allowed_rows.join(", "));
        }
        println!();

        let width = table.columns.iter().map(|c| c.key.len()).max().unwrap_or(10);
        for column in &table.columns {
            let kind = match column.kind {
                ValueKind::Number => "number",
                ValueKind::Text => "text",
            };
            println!("    {:<width$}  {:<6}  {}", column.key, kind, column.caption, width = width);
        }
        println!();
    }

    Ok(())
}

pub fn validate(file: &Path) -> Result<(), PspError> {
    let layout = psp_core::layout::load_layout(file)?;
    println!(
        "Valid layout: {} (v{}) for {}, {} table(s)",
        layout.name,
        layout.version,
        layout.region,
        layout.tables.len()
    );
    Ok(())
}
