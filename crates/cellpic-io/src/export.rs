use cellpic_model::{Cell, CellValue, EmbeddedImage, Workbook, Worksheet};
use rust_xlsxwriter::{ColNum, Format, Formula, Image, RowNum, XlsxError};

const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Serialize the model as an `.xlsx` package held in memory.
///
/// Column indices are bounded by `EXCEL_MAX_COLS` in the model, so the `u16`
/// conversions below cannot truncate.
pub(crate) fn write_xlsx_bytes(workbook: &Workbook) -> Result<Vec<u8>, XlsxError> {
    let mut out = rust_xlsxwriter::Workbook::new();
    let date_format = Format::new().set_num_format(DATE_TIME_FORMAT);

    for sheet in &workbook.sheets {
        let worksheet = out.add_worksheet();
        worksheet.set_name(sheet.name())?;
        write_sheet(worksheet, sheet, &date_format)?;
    }

    out.save_to_buffer()
}

fn write_sheet(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    sheet: &Worksheet,
    date_format: &Format,
) -> Result<(), XlsxError> {
    for (cell_ref, cell) in sheet.iter_cells() {
        write_cell(worksheet, cell_ref.row, col_num(cell_ref.col), cell, date_format)?;
    }

    for (col, width) in sheet.col_widths() {
        worksheet.set_column_width(col_num(col), width)?;
    }
    for (row, height) in sheet.row_heights() {
        worksheet.set_row_height(row, height)?;
    }

    for image in sheet.images() {
        insert_image(worksheet, image)?;
    }

    Ok(())
}

fn write_cell(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    row: RowNum,
    col: ColNum,
    cell: &Cell,
    date_format: &Format,
) -> Result<(), XlsxError> {
    if let Some(formula) = &cell.formula {
        let mut formula = Formula::new(formula);
        if let Some(result) = cached_result(&cell.value) {
            formula = formula.set_result(result);
        }
        match cell.value {
            CellValue::DateTime(_) => {
                worksheet.write_formula_with_format(row, col, formula, date_format)?
            }
            _ => worksheet.write_formula(row, col, formula)?,
        };
        return Ok(());
    }

    match &cell.value {
        CellValue::Empty => {}
        CellValue::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        CellValue::DateTime(serial) => {
            worksheet.write_number_with_format(row, col, *serial, date_format)?;
        }
        CellValue::String(s) => {
            worksheet.write_string(row, col, s)?;
        }
        CellValue::Boolean(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        // rust_xlsxwriter has no literal error cells; keep the visible text.
        CellValue::Error(e) => {
            worksheet.write_string(row, col, e.as_str())?;
        }
    }
    Ok(())
}

fn cached_result(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Empty => None,
        CellValue::Number(n) | CellValue::DateTime(n) => Some(n.to_string()),
        CellValue::String(s) => Some(s.clone()),
        CellValue::Boolean(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        CellValue::Error(e) => Some(e.as_str().to_string()),
    }
}

fn insert_image(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    embedded: &EmbeddedImage,
) -> Result<(), XlsxError> {
    let mut image = Image::new_from_buffer(&embedded.data)?;

    // Display size is driven by the model, not by the encoded pixel size.
    let (natural_w, natural_h) = (image.width(), image.height());
    if natural_w > 0.0 && natural_h > 0.0 {
        image = image
            .set_scale_width(f64::from(embedded.width_px) / natural_w)
            .set_scale_height(f64::from(embedded.height_px) / natural_h);
    }
    if let Some(alt_text) = &embedded.alt_text {
        image = image.set_alt_text(alt_text);
    }

    worksheet.insert_image(embedded.anchor.row, col_num(embedded.anchor.col), &image)?;
    Ok(())
}

fn col_num(col: u32) -> ColNum {
    col as ColNum
}
