mod commands;
mod logging;
mod output;

use clap::{Parser, Subcommand};
use psp_core::model::Region;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "psp",
    version,
    about = "Download, extract, merge and push daily power supply position reports"
)]
struct Cli {
    /// Settings file (JSON). Falls back to $PSP_CONFIG, then built-in defaults
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the tables of one or more local reports (PDF or workbook)
    Extract {
        /// Report files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Region whose layout to apply: nrldc, srldc, wrldc or posoco
        #[arg(short, long)]
        region: Region,

        /// Custom JSON layout file instead of the region's preset
        #[arg(long, value_name = "FILE")]
        layout: Option<PathBuf>,

        /// Report date (YYYY-MM-DD). Default: taken from the file or directory name
        #[arg(long)]
        date: Option<String>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write one JSON file per report into this directory
        #[arg(short = 'O', long = "out-dir", value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
    /// Download, extract and store the latest report of each region
    Run {
        /// Regions to process (default: all configured regions)
        regions: Vec<Region>,

        /// Latest report date to look for (YYYY-MM-DD). Default: today (IST)
        #[arg(long)]
        date: Option<String>,

        /// Use a local PDF instead of downloading (single region only)
        #[arg(long, value_name = "FILE")]
        pdf: Option<PathBuf>,

        /// Custom JSON layout file (single region only)
        #[arg(long, value_name = "FILE")]
        layout: Option<PathBuf>,

        /// Process even if rows for the date are already stored
        #[arg(long)]
        force: bool,

        /// Do not write rows to the database
        #[arg(long)]
        no_store: bool,
    },
    /// Merge the latest region outputs into one document and push it
    Merge {
        /// Operating day (YYYY-MM-DD). Default: yesterday (IST)
        #[arg(long)]
        date: Option<String>,

        /// Only write the merged file, do not push it
        #[arg(long)]
        no_push: bool,
    },
    /// Show job status, stored data and recent log lines per region
    Status {
        /// Number of log lines to show per region
        #[arg(short = 'n', long, default_value = "10")]
        lines: usize,
    },
    /// Inspect and validate table layouts
    Layouts {
        #[command(subcommand)]
        action: LayoutsAction,
    },
}

#[derive(Subcommand)]
enum LayoutsAction {
    /// List predefined layouts
    List,
    /// Show the tables and columns of a layout
    Show {
        /// Preset name (e.g., "nrldc")
        preset: String,

        /// Print the layout as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a custom layout file
    Validate {
        /// Path to JSON layout file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let log_file = logging::init();

    let result = match cli.command {
        Commands::Extract {
            files,
            region,
            layout,
            date,
            output,
            out_dir,
        } => commands::extract::run(files, region, layout, date, &output, out_dir),
        Commands::Run {
            regions,
            date,
            pdf,
            layout,
            force,
            no_store,
        } => commands::run::run(
            cli.config.as_deref(),
            &log_file,
            commands::run::RunOptions {
                regions,
                date,
                pdf,
                layout,
                force,
                no_store,
            },
        ),
        Commands::Merge { date, no_push } => {
            commands::merge::run(cli.config.as_deref(), &log_file, date, no_push)
        }
        Commands::Status { lines } => commands::status::run(cli.config.as_deref(), lines),
        Commands::Layouts { action } => match action {
            LayoutsAction::List => commands::layouts::list(),
            LayoutsAction::Show { preset, json } => commands::layouts::show(&preset, json),
            LayoutsAction::Validate { file } => commands::layouts::validate(&file),
        },
    };

    log_file.close();
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
