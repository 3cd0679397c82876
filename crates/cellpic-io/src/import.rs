use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use cellpic_model::{
    normalize_formula, CellRef, CellValue, ErrorValue, Workbook, EXCEL_MAX_COLS, EXCEL_MAX_ROWS,
};

use crate::Error;

/// Read every worksheet of `path` into the model.
///
/// Values come from the cached cell data; formulas are attached as text when
/// the reader can provide them. A sheet whose formulas cannot be read is still
/// imported (values only) with a warning.
pub(crate) fn import_path(path: &Path) -> Result<Workbook, Error> {
    // Surface a plain I/O error (e.g. "No such file") rather than a format error.
    std::fs::metadata(path).map_err(|source| Error::OpenIo {
        path: path.to_path_buf(),
        source,
    })?;

    let mut workbook = open_workbook_auto(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let sheet_names = workbook.sheet_names().to_owned();

    let mut out = Workbook::new();
    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|source| Error::ReadSheet {
                path: path.to_path_buf(),
                sheet: sheet_name.clone(),
                source,
            })?;

        let sheet = out
            .add_sheet(sheet_name.clone())
            .map_err(|source| Error::Model {
                path: path.to_path_buf(),
                source,
            })?;

        let range_start = range.start().unwrap_or((0, 0));
        for (row, col, value) in range.used_cells() {
            let Some(cell_ref) = to_cell_ref(range_start, row, col) else {
                log::warn!("skipping out-of-bounds cell in sheet `{sheet_name}` at ({row},{col})");
                continue;
            };
            if let Some(value) = convert_value(value) {
                sheet.set_value(cell_ref, value);
            }
        }

        match workbook.worksheet_formula(&sheet_name) {
            Ok(formulas) => {
                let formula_start = formulas.start().unwrap_or((0, 0));
                for (row, col, formula) in formulas.used_cells() {
                    let Some(cell_ref) = to_cell_ref(formula_start, row, col) else {
                        continue;
                    };
                    if let Some(normalized) = normalize_formula(formula) {
                        sheet.set_formula(cell_ref, Some(normalized));
                    }
                }
            }
            Err(err) => {
                log::warn!("failed to read formulas for sheet `{sheet_name}`: {err}");
            }
        }

        log::debug!(
            "imported sheet `{sheet_name}` ({} cells) from {}",
            sheet.cell_count(),
            path.display()
        );
    }

    Ok(out)
}

fn to_cell_ref(start: (u32, u32), row: usize, col: usize) -> Option<CellRef> {
    // calamine `Range` iterators are relative to `range.start()`.
    let row: u32 = row.try_into().ok()?;
    let col: u32 = col.try_into().ok()?;

    let row = start.0.checked_add(row)?;
    let col = start.1.checked_add(col)?;

    if row >= EXCEL_MAX_ROWS || col >= EXCEL_MAX_COLS {
        return None;
    }
    Some(CellRef::new(row, col))
}

fn convert_value(value: &Data) -> Option<CellValue> {
    match value {
        Data::Empty => None,
        Data::Bool(v) => Some(CellValue::Boolean(*v)),
        Data::Int(v) => Some(CellValue::Number(*v as f64)),
        Data::Float(v) => Some(CellValue::Number(*v)),
        Data::String(v) => Some(CellValue::String(v.clone())),
        Data::Error(e) => Some(CellValue::Error(convert_error(e))),
        Data::DateTime(v) => Some(CellValue::DateTime(v.as_f64())),
        Data::DateTimeIso(v) => Some(CellValue::String(v.clone())),
        Data::DurationIso(v) => Some(CellValue::String(v.clone())),
    }
}

fn convert_error(err: &calamine::CellErrorType) -> ErrorValue {
    use calamine::CellErrorType;

    match err {
        CellErrorType::Div0 => ErrorValue::Div0,
        CellErrorType::NA => ErrorValue::NA,
        CellErrorType::Name => ErrorValue::Name,
        CellErrorType::Null => ErrorValue::Null,
        CellErrorType::Num => ErrorValue::Num,
        CellErrorType::Ref => ErrorValue::Ref,
        CellErrorType::Value => ErrorValue::Value,
        CellErrorType::GettingData => ErrorValue::GettingData,
    }
}
