//! Workbook loading and saving for cellpic.
//!
//! - Loading goes through `calamine`, so `.xlsx`, `.xlsm`, `.xlsb`, `.xls` and
//!   `.ods` inputs are all accepted.
//! - Saving edits `.xlsx`/`.xlsm` sources in place through
//!   `umya_spreadsheet`, so formatting the model does not carry survives.
//!   Other formats are rebuilt from the model as `.xlsx` via
//!   `rust_xlsxwriter`. Either way the destination is replaced atomically.

use std::path::{Path, PathBuf};

use cellpic_model::{ModelError, Workbook};

mod atomic;
mod export;
mod import;
mod patch;
mod path;

pub use path::{output_path, OUTPUT_EXTENSION};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open workbook `{path}`: {source}")]
    OpenIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse workbook `{path}`: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("failed to read sheet `{sheet}` of `{path}`: {source}")]
    ReadSheet {
        path: PathBuf,
        sheet: String,
        #[source]
        source: calamine::Error,
    },
    #[error("invalid workbook structure in `{path}`: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
    #[error("failed to serialize workbook for `{path}`: {source}")]
    SaveXlsx {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
    #[error("failed to reopen workbook `{path}` for editing: {source}")]
    Reopen {
        path: PathBuf,
        #[source]
        source: umya_spreadsheet::XlsxError,
    },
    #[error("failed to stage an image for `{path}`: {source}")]
    StageImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize edited workbook `{path}`: {source}")]
    Patch {
        path: PathBuf,
        #[source]
        source: umya_spreadsheet::XlsxError,
    },
    #[error("failed to save workbook `{path}`: {source}")]
    SaveIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Open a spreadsheet from disk.
///
/// Fails when the file is missing/unreadable or is not a recognised
/// spreadsheet format.
pub fn open_workbook(path: impl AsRef<Path>) -> Result<Workbook, Error> {
    import::import_path(path.as_ref())
}

/// Save a workbook to `path` as `.xlsx`, rebuilt from the model alone.
///
/// The package is built fully in memory first, so a serialization error never
/// touches the filesystem; the write itself is atomic.
pub fn save_workbook(workbook: &Workbook, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let bytes = export::write_xlsx_bytes(workbook).map_err(|source| Error::SaveXlsx {
        path: path.to_path_buf(),
        source,
    })?;
    atomic::write_atomic(path, &bytes).map_err(|source| Error::SaveIo {
        path: path.to_path_buf(),
        source,
    })
}

/// Save the edits made to a workbook loaded from `source` into `dest`.
///
/// `.xlsx`/`.xlsm` sources are patched, keeping everything the model does not
/// represent. Any other source format falls back to [`save_workbook`].
pub fn save_edited(
    source: impl AsRef<Path>,
    workbook: &Workbook,
    dest: impl AsRef<Path>,
) -> Result<(), Error> {
    let (source, dest) = (source.as_ref(), dest.as_ref());
    if !patch::is_patchable(source) {
        log::debug!("{} cannot be edited in place; rebuilding", source.display());
        return save_workbook(workbook, dest);
    }

    let bytes = patch::patch_xlsx_bytes(source, workbook)?;
    atomic::write_atomic(dest, &bytes).map_err(|err| Error::SaveIo {
        path: dest.to_path_buf(),
        source: err,
    })
}
