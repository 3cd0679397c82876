//! Download the images referenced by a spreadsheet column and embed them in a
//! new column right next to it.
//!
//! For every configured source file, each worksheet is searched for a header
//! naming the URL column. A labelled image column is inserted to its right and
//! every data row gets the image its URL points to, scaled into a fixed
//! bounding box. The result is saved as a sibling file; inputs are never
//! modified.

pub mod config;
mod error;
pub mod fetch;
pub mod layout;
pub mod locate;
mod pipeline;
mod progress;
pub mod retry;
pub mod scale;

pub use config::{ConcurrencyPolicy, Config, ConfigError, HttpConfig};
pub use error::{RunError, SkipReason};
pub use fetch::{FetchError, HttpFetcher};
pub use pipeline::{
    process_file, process_worksheet, FileReport, RowOutcome, RowStatus, SheetOutcome, SheetReport,
};
pub use progress::{NoProgress, Progress};

/// Process every file in `config.sources`, in order.
///
/// Row and worksheet problems are reported and logged; a file that cannot be
/// loaded or saved aborts the run.
pub async fn run(config: &Config, progress: &dyn Progress) -> Result<Vec<FileReport>, RunError> {
    config.validate()?;
    if config.sources.is_empty() {
        log::warn!("no input files given");
        return Ok(Vec::new());
    }

    let fetcher = HttpFetcher::new(&config.http).map_err(RunError::Client)?;

    let mut reports = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        let report = process_file(source, config, &fetcher, progress).await?;
        log::info!(
            "{}: {} images embedded, {} rows skipped",
            report.output.display(),
            report.embedded_count(),
            report.skipped_count()
        );
        reports.push(report);
    }
    Ok(reports)
}
