// Entry point and high-level CLI flow.
//
// A run is one straight pass: load the CSV, enrich each row, aggregate the
// five views and the summary, then write the workbook. Any failure stops the
// run with a non-zero exit code.
mod error;
mod loader;
mod output;
mod preprocess;
mod report;
mod reports;
mod types;
mod util;
mod xlsx;

use clap::Parser;
use error::Result;
use report::ReportOptions;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dairy_report")]
#[command(about = "Builds a multi-sheet dairy sales analysis workbook from a CSV export", long_about = None)]
struct Cli {
    /// Input CSV of dairy sales transactions
    #[arg(long, default_value = "dairy_dataset.csv")]
    input: PathBuf,

    /// Path of the generated workbook
    #[arg(long, default_value = "dairy_analysis_report.xlsx")]
    output: PathBuf,

    /// Rows of each view to print after generation (0 disables previews)
    #[arg(long, default_value_t = 3)]
    preview_rows: usize,

    /// Also export every view as CSV into this directory
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Also write the enriched rows (with derived fields) as CSV
    #[arg(long)]
    enriched_csv: Option<PathBuf>,

    /// Also write the executive summary as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dairy_report={}", level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<PathBuf> {
    let (records, load_report) = loader::load_records(&cli.input)?;
    println!(
        "Processing dataset... ({} rows loaded)",
        util::format_int(load_report.total_rows)
    );

    let data = preprocess::enrich(records)?;
    let analysis = reports::analyze(&data)?;

    let options = ReportOptions {
        output_path: cli.output.clone(),
        ..ReportOptions::default()
    };
    let path = report::generate_report(&analysis, &options)?;

    if let Some(enriched_path) = &cli.enriched_csv {
        output::export_enriched(enriched_path, &data)?;
    }
    if let Some(dir) = &cli.csv_dir {
        output::export_views(dir, &analysis)?;
    }
    if let Some(json_path) = &cli.summary_json {
        output::write_json(json_path, &analysis.summary)?;
        info!(path = %json_path.display(), "wrote summary JSON");
    }
    println!();
    output::preview_analysis(&analysis, cli.preview_rows);
    Ok(path)
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(&cli) {
        Ok(path) => {
            println!("Report saved to {}", path.display());
        }
        Err(e) => {
            error!(error = %e, "report generation failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
