//! Per-worksheet and per-file processing.
//!
//! A worksheet is handled in three phases:
//! 1. locate the URL column and insert the image column next to it;
//! 2. read every data row's URL and fetch/decode them (sequentially or as a
//!    concurrent batch, per [`ConcurrencyPolicy`]);
//! 3. place the results in row order. Only this phase mutates the sheet.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use cellpic_model::{col_to_name, CellRef, CellValue, EmbeddedImage, Worksheet};
use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use serde::{Serialize, Serializer};

use crate::config::{Config, ConcurrencyPolicy};
use crate::error::{RunError, SkipReason};
use crate::fetch::{parse_image_url, HttpFetcher};
use crate::layout::prepare_image_column;
use crate::locate::find_url_column;
use crate::progress::Progress;
use crate::scale::{decode_and_fit, ScaledImage};

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub sheets: Vec<SheetReport>,
}

impl FileReport {
    pub fn embedded_count(&self) -> usize {
        self.sheets.iter().map(SheetReport::embedded_count).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.sheets.iter().map(SheetReport::skipped_count).sum()
    }
}

#[derive(Debug, Serialize)]
pub struct SheetReport {
    pub sheet: String,
    #[serde(flatten)]
    pub outcome: SheetOutcome,
}

impl SheetReport {
    pub fn rows(&self) -> &[RowOutcome] {
        match &self.outcome {
            SheetOutcome::Processed { rows, .. } => rows,
            _ => &[],
        }
    }

    pub fn embedded_count(&self) -> usize {
        self.rows().iter().filter(|r| r.is_embedded()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.rows().iter().filter(|r| !r.is_embedded()).count()
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SheetOutcome {
    /// No header matched; the sheet is saved unchanged.
    ColumnNotFound,
    /// The image column could not be inserted; the sheet is saved unchanged.
    InsertFailed { reason: String },
    Processed {
        url_column: String,
        image_column: String,
        rows: Vec<RowOutcome>,
    },
}

#[derive(Debug, Serialize)]
pub struct RowOutcome {
    /// Cell the image is (or would have been) anchored at.
    #[serde(serialize_with = "serialize_a1")]
    pub cell: CellRef,
    #[serde(flatten)]
    pub status: RowStatus,
}

impl RowOutcome {
    pub fn is_embedded(&self) -> bool {
        matches!(self.status, RowStatus::Embedded { .. })
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    Embedded {
        width: u32,
        height: u32,
    },
    Skipped {
        #[serde(serialize_with = "serialize_display")]
        reason: SkipReason,
    },
}

fn serialize_a1<S: Serializer>(cell: &CellRef, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&cell.to_a1())
}

fn serialize_display<T: Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

struct RowJob {
    target: CellRef,
    url: CellValue,
}

struct Fetched {
    alt_text: String,
    image: ScaledImage,
}

#[derive(Clone, Copy)]
struct RowContext<'a> {
    sheet: &'a str,
    config: &'a Config,
    fetcher: &'a HttpFetcher,
    progress: &'a dyn Progress,
}

/// Embed the images referenced by `sheet`'s URL column.
///
/// Row-level failures are recorded in the report; the sheet is never left
/// half-modified by a failing row.
pub async fn process_worksheet(
    sheet: &mut Worksheet,
    config: &Config,
    fetcher: &HttpFetcher,
    progress: &dyn Progress,
) -> SheetReport {
    let name = sheet.name().to_string();

    let Some(url_col) = find_url_column(sheet.header_cells(), &config.url_column_names) else {
        log::warn!(
            "sheet `{name}`: no header matches {:?}; left unchanged",
            config.url_column_names
        );
        return SheetReport {
            sheet: name,
            outcome: SheetOutcome::ColumnNotFound,
        };
    };

    let layout = match prepare_image_column(sheet, url_col, config) {
        Ok(layout) => layout,
        Err(err) => {
            log::warn!("sheet `{name}`: cannot insert image column: {err}");
            return SheetReport {
                sheet: name,
                outcome: SheetOutcome::InsertFailed {
                    reason: err.to_string(),
                },
            };
        }
    };
    log::info!(
        "sheet `{name}`: URLs in column {}, images in column {}, {} data rows",
        col_to_name(layout.url_col),
        col_to_name(layout.image_col),
        layout.rows.len()
    );

    let jobs: Vec<RowJob> = layout
        .rows
        .clone()
        .map(|row| RowJob {
            target: CellRef::new(row, layout.image_col),
            url: sheet.value(CellRef::new(row, layout.url_col)).clone(),
        })
        .collect();

    progress.sheet_started(&name, jobs.len() as u64);
    let ctx = RowContext {
        sheet: &name,
        config,
        fetcher,
        progress,
    };
    let results = fetch_rows(jobs, ctx).await;

    let mut rows = Vec::with_capacity(results.len());
    for (job, result) in results {
        let status = match result {
            Ok(fetched) => {
                let (width, height) = (fetched.image.width, fetched.image.height);
                sheet.add_image(
                    EmbeddedImage::new(job.target, width, height, fetched.image.png)
                        .with_alt_text(fetched.alt_text),
                );
                RowStatus::Embedded { width, height }
            }
            Err(reason) => RowStatus::Skipped { reason },
        };
        rows.push(RowOutcome {
            cell: job.target,
            status,
        });
    }

    let report = SheetReport {
        sheet: name,
        outcome: SheetOutcome::Processed {
            url_column: col_to_name(layout.url_col),
            image_column: col_to_name(layout.image_col),
            rows,
        },
    };
    log::info!(
        "sheet `{}`: {} embedded, {} skipped",
        report.sheet,
        report.embedded_count(),
        report.skipped_count()
    );
    report
}

/// Run every job according to the concurrency policy; results come back in
/// row order.
async fn fetch_rows(
    jobs: Vec<RowJob>,
    ctx: RowContext<'_>,
) -> Vec<(RowJob, Result<Fetched, SkipReason>)> {
    let run = move |job: RowJob| async move {
        let result = fetch_row(&job, ctx).await;
        if let Err(reason) = &result {
            log::warn!(
                "sheet `{}` {}: skipped: {reason}",
                ctx.sheet,
                job.target.to_a1()
            );
        }
        ctx.progress.row_finished(ctx.sheet);
        (job, result)
    };

    let mut results = match ctx.config.concurrency {
        ConcurrencyPolicy::Sequential => {
            let mut out = Vec::with_capacity(jobs.len());
            for job in jobs {
                out.push(run(job).await);
            }
            out
        }
        ConcurrencyPolicy::Concurrent { max_in_flight: None } => {
            join_all(jobs.into_iter().map(run)).await
        }
        ConcurrencyPolicy::Concurrent {
            max_in_flight: Some(limit),
        } => {
            stream::iter(jobs)
                .map(run)
                .buffer_unordered(limit.max(1))
                .collect::<Vec<_>>()
                .await
        }
    };
    results.sort_by_key(|(job, _)| job.target.row);
    results
}

async fn fetch_row(job: &RowJob, ctx: RowContext<'_>) -> Result<Fetched, SkipReason> {
    let url = parse_image_url(&job.url)?;
    let bytes = ctx.fetcher.fetch(&url).await.map_err(SkipReason::Fetch)?;
    let image = decode_and_fit(&bytes, ctx.config.bounding_box(), ctx.config.allow_upscale)
        .map_err(SkipReason::Decode)?;
    log::debug!(
        "{url}: {}x{} -> {}x{}",
        image.natural_width,
        image.natural_height,
        image.width,
        image.height
    );
    Ok(Fetched {
        alt_text: url.to_string(),
        image,
    })
}

/// Load `input`, process every worksheet, and save the result next to it.
///
/// `.xlsx`/`.xlsm` inputs are edited in place, so formatting survives; other
/// formats are rebuilt as `.xlsx` from the loaded values.
pub async fn process_file(
    input: &Path,
    config: &Config,
    fetcher: &HttpFetcher,
    progress: &dyn Progress,
) -> Result<FileReport, RunError> {
    log::info!("processing {}", input.display());
    let mut workbook = cellpic_io::open_workbook(input).map_err(RunError::Load)?;
    log::debug!("sheets: {:?}", workbook.sheet_names());

    let mut sheets = Vec::with_capacity(workbook.sheets.len());
    for sheet in &mut workbook.sheets {
        let report = process_worksheet(sheet, config, fetcher, progress).await;
        progress.sheet_finished(&report);
        sheets.push(report);
    }

    let output = cellpic_io::output_path(input, &config.output_suffix);
    cellpic_io::save_edited(input, &workbook, &output).map_err(RunError::Save)?;
    log::info!("saved {}", output.display());

    Ok(FileReport {
        input: input.to_path_buf(),
        output,
        sheets,
    })
}
