//! In-place editing of `.xlsx`/`.xlsm` packages.
//!
//! The source package is reopened with `umya_spreadsheet` and the edits held
//! by the model are replayed onto it: column insertions (which also shift
//! same-sheet formula references, merges and hyperlinks), the contents of the
//! inserted columns, layout overrides and images. Everything the model does
//! not carry (styles, number formats, merges, hyperlinks, existing drawings)
//! is left as the source had it.

use std::io::{self, Cursor};
use std::path::Path;

use cellpic_model::{col_to_name, CellValue, Workbook, Worksheet};
use umya_spreadsheet::structs::drawing::spreadsheet::MarkerType;
use umya_spreadsheet::structs::Image;

use crate::Error;

const PATCHABLE_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

/// Whether `path` names a package that can be edited in place.
pub(crate) fn is_patchable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PATCHABLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Reopen `source`, apply `workbook`'s edits to it and serialize the result.
///
/// Column widths and row heights are never imported, so every one the model
/// holds is an edit and is written back.
pub(crate) fn patch_xlsx_bytes(source: &Path, workbook: &Workbook) -> Result<Vec<u8>, Error> {
    let mut book =
        umya_spreadsheet::reader::xlsx::read(source).map_err(|err| Error::Reopen {
            path: source.to_path_buf(),
            source: err,
        })?;

    // umya embeds pictures from files, so the PNGs are staged on disk first.
    let staging = tempfile::tempdir().map_err(|err| Error::StageImage {
        path: source.to_path_buf(),
        source: err,
    })?;
    let mut staged = 0usize;

    for sheet in &workbook.sheets {
        let Some(target) = book.get_sheet_by_name_mut(sheet.name()) else {
            log::warn!(
                "sheet `{}` is missing from {}; left unchanged",
                sheet.name(),
                source.display()
            );
            continue;
        };
        apply_sheet(target, sheet, staging.path(), &mut staged).map_err(|err| {
            Error::StageImage {
                path: source.to_path_buf(),
                source: err,
            }
        })?;
    }

    let mut out = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out).map_err(|err| {
        Error::Patch {
            path: source.to_path_buf(),
            source: err,
        }
    })?;
    log::debug!(
        "patched {} ({staged} images added)",
        source.display()
    );
    Ok(out.into_inner())
}

fn apply_sheet(
    target: &mut umya_spreadsheet::Worksheet,
    sheet: &Worksheet,
    staging: &Path,
    staged: &mut usize,
) -> io::Result<()> {
    for &(at, count) in sheet.inserted_cols() {
        target.insert_new_column(&col_to_name(at), &count);
    }

    // umya coordinates are 1-based (col, row).
    let new_cols = sheet.new_cols();
    for (at, cell) in sheet.iter_cells() {
        if new_cols.binary_search(&at.col).is_err() {
            continue;
        }
        let target_cell = target.get_cell_mut((at.col + 1, at.row + 1));
        match &cell.value {
            CellValue::Empty => {}
            CellValue::String(s) => {
                target_cell.set_value_string(s.as_str());
            }
            CellValue::Number(n) | CellValue::DateTime(n) => {
                target_cell.set_value_number(*n);
            }
            CellValue::Boolean(b) => {
                target_cell.set_value_bool(*b);
            }
            CellValue::Error(e) => {
                target_cell.set_value_string(e.as_str());
            }
        }
        if let Some(formula) = &cell.formula {
            target_cell.set_formula(formula.trim_start_matches('=').to_string());
        }
    }

    for (col, width) in sheet.col_widths() {
        let dimension = target.get_column_dimension_by_number_mut(&(col + 1));
        dimension.set_width(width);
        dimension.set_auto_width(false);
    }
    for (row, height) in sheet.row_heights() {
        target.get_row_dimension_mut(&(row + 1)).set_height(height);
    }

    for embedded in sheet.images() {
        *staged += 1;
        let file = staging.join(format!("image{staged}.png"));
        std::fs::write(&file, &embedded.data)?;
        let file = file.to_str().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "staging path is not UTF-8")
        })?;

        let mut marker = MarkerType::default();
        marker.set_coordinate(embedded.anchor.to_a1());
        let mut image = Image::default();
        image.new_image(file, marker);
        target.add_image(image);
    }

    Ok(())
}
