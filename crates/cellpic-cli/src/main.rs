use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use cellpic::{ConcurrencyPolicy, Config, FileReport, NoProgress, Progress, SheetReport};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "cellpic",
    version,
    about = "Download the images referenced by a spreadsheet URL column and embed them next to it."
)]
struct Args {
    /// Spreadsheets to process (appended to `sources` from --config).
    inputs: Vec<PathBuf>,

    /// JSON configuration file; command-line flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Header naming the URL column (repeatable; replaces the defaults).
    #[arg(long = "column", value_name = "NAME")]
    columns: Vec<String>,

    /// Header written into the inserted image column.
    #[arg(long, value_name = "TEXT")]
    label: Option<String>,

    /// Bounding box width in pixels.
    #[arg(long, value_name = "PX")]
    max_width: Option<u32>,

    /// Bounding box height in pixels.
    #[arg(long, value_name = "PX")]
    max_height: Option<u32>,

    /// Keep images smaller than the bounding box at their natural size.
    #[arg(long)]
    no_upscale: bool,

    /// Marker inserted before the output file's extension.
    #[arg(long, value_name = "TEXT")]
    suffix: Option<String>,

    /// Fetch one row at a time.
    #[arg(long, conflicts_with = "max_in_flight")]
    sequential: bool,

    /// Maximum concurrent downloads per worksheet (default: unbounded).
    #[arg(long, value_name = "N")]
    max_in_flight: Option<usize>,

    /// Per-request timeout in milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Attempts per URL, including the first.
    #[arg(long, value_name = "N")]
    max_attempts: Option<u32>,

    /// Output format for the run summary.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Only log warnings and errors; no progress bars.
    #[arg(long, short)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;
    if config.sources.is_empty() {
        bail!("no input files given (pass paths or set `sources` in --config)");
    }

    let reports = if args.quiet {
        cellpic::run(&config, &NoProgress).await?
    } else {
        cellpic::run(&config, &SheetBars::default()).await?
    };

    print_reports(&reports, &args.format)
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    config.sources.extend(args.inputs.iter().cloned());
    if !args.columns.is_empty() {
        config.url_column_names = args.columns.clone();
    }
    if let Some(label) = &args.label {
        config.image_column_label = label.clone();
    }
    if let Some(width) = args.max_width {
        config.max_image_width = width;
    }
    if let Some(height) = args.max_height {
        config.max_image_height = height;
    }
    if args.no_upscale {
        config.allow_upscale = false;
    }
    if let Some(suffix) = &args.suffix {
        config.output_suffix = suffix.clone();
    }
    if args.sequential {
        config.concurrency = ConcurrencyPolicy::Sequential;
    } else if let Some(limit) = args.max_in_flight {
        config.concurrency = ConcurrencyPolicy::Concurrent {
            max_in_flight: Some(limit),
        };
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.http.timeout_ms = timeout_ms;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.http.max_attempts = max_attempts;
    }

    config.validate()?;
    Ok(config)
}

fn print_reports(reports: &[FileReport], format: &OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, reports).context("serialize run report")?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for report in reports {
                writeln!(
                    out,
                    "{} -> {} ({} embedded, {} skipped)",
                    report.input.display(),
                    report.output.display(),
                    report.embedded_count(),
                    report.skipped_count()
                )?;
            }
        }
    }
    Ok(())
}

/// One progress bar per worksheet; sheets are processed one after another.
#[derive(Default)]
struct SheetBars {
    current: Mutex<Option<ProgressBar>>,
}

impl Progress for SheetBars {
    fn sheet_started(&self, sheet: &str, rows: u64) {
        let bar = ProgressBar::new(rows);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(sheet.to_string());
        if let Ok(mut current) = self.current.lock() {
            *current = Some(bar);
        }
    }

    fn row_finished(&self, _sheet: &str) {
        if let Ok(current) = self.current.lock() {
            if let Some(bar) = current.as_ref() {
                bar.inc(1);
            }
        }
    }

    fn sheet_finished(&self, report: &SheetReport) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(bar) = current.take() {
                bar.finish_with_message(format!(
                    "{}: {} embedded, {} skipped",
                    report.sheet,
                    report.embedded_count(),
                    report.skipped_count()
                ));
            }
        }
    }
}
