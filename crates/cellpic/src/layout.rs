//! Making room for the images next to the URL column.

use std::ops::Range;

use cellpic_model::{CellRef, ModelError, Worksheet};

use crate::config::Config;

/// Where images go once the column has been inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageColumn {
    pub url_col: u32,
    pub image_col: u32,
    /// Data rows (0-indexed, header excluded) present before insertion.
    pub rows: Range<u32>,
}

/// Insert the image column immediately right of `url_col`, label it, and size
/// it and every data row to the bounding box.
///
/// On error the worksheet is left untouched.
pub fn prepare_image_column(
    sheet: &mut Worksheet,
    url_col: u32,
    config: &Config,
) -> Result<ImageColumn, ModelError> {
    let rows = 1..sheet.last_row().map_or(1, |last| last + 1);
    let image_col = url_col + 1;

    sheet.insert_cols(image_col, 1)?;
    sheet.set_value(CellRef::new(0, image_col), config.image_column_label.as_str());
    sheet.set_col_width(image_col, config.column_width());
    for row in rows.clone() {
        sheet.set_row_height(row, config.row_height());
    }

    Ok(ImageColumn {
        url_col,
        image_col,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellpic_model::{CellValue, EXCEL_MAX_COLS};
    use pretty_assertions::assert_eq;

    fn sheet_with(rows: &[&[&str]]) -> Worksheet {
        let mut sheet = Worksheet::new("Sheet1");
        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                if !text.is_empty() {
                    sheet.set_value(CellRef::new(r as u32, c as u32), *text);
                }
            }
        }
        sheet
    }

    #[test]
    fn inserts_labelled_column_right_of_urls() {
        let mut sheet = sheet_with(&[
            &["商品主图", "价格"],
            &["http://x/a.png", "1"],
            &["", "2"],
        ]);

        let layout = prepare_image_column(&mut sheet, 0, &Config::default()).unwrap();
        assert_eq!(
            layout,
            ImageColumn {
                url_col: 0,
                image_col: 1,
                rows: 1..3,
            }
        );

        assert_eq!(sheet.value(CellRef::new(0, 1)), &CellValue::from("图片预览"));
        assert_eq!(sheet.value(CellRef::new(0, 2)), &CellValue::from("价格"));
        assert_eq!(sheet.value(CellRef::new(1, 0)), &CellValue::from("http://x/a.png"));
        assert_eq!(sheet.value(CellRef::new(1, 1)), &CellValue::Empty);
        assert_eq!(sheet.value(CellRef::new(2, 2)), &CellValue::from("2"));

        assert_eq!(sheet.col_width(1), Some(150.0 / 7.0));
        assert_eq!(sheet.row_height(0), None);
        assert_eq!(sheet.row_height(1), Some(112.5));
        assert_eq!(sheet.row_height(2), Some(112.5));
        assert_eq!(sheet.row_height(3), None);
    }

    #[test]
    fn header_only_sheet_has_no_data_rows() {
        let mut sheet = sheet_with(&[&["商品主图"]]);
        let layout = prepare_image_column(&mut sheet, 0, &Config::default()).unwrap();
        assert!(layout.rows.is_empty());
        assert_eq!(sheet.row_heights().count(), 0);
    }

    #[test]
    fn overflow_leaves_the_sheet_untouched() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_value(CellRef::new(0, EXCEL_MAX_COLS - 1), "商品主图");

        let err = prepare_image_column(&mut sheet, EXCEL_MAX_COLS - 1, &Config::default());
        assert!(err.is_err());
        assert_eq!(sheet.cell_count(), 1);
        assert_eq!(sheet.col_widths().count(), 0);
    }
}
