use crate::pipeline::SheetReport;

/// Observer for row-level progress of a run.
///
/// Callbacks may arrive in any row order while a worksheet is fetched
/// concurrently.
pub trait Progress {
    fn sheet_started(&self, _sheet: &str, _rows: u64) {}
    fn row_finished(&self, _sheet: &str) {}
    fn sheet_finished(&self, _report: &SheetReport) {}
}

/// Progress sink that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}
