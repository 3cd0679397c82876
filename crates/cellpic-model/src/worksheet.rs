use std::collections::BTreeMap;

use crate::cell::{Cell, CellKey, EXCEL_MAX_COLS};
use crate::{CellRef, CellValue, EmbeddedImage, ModelError};

static EMPTY: CellValue = CellValue::Empty;

/// A single worksheet: sparse cells plus the layout and drawing state the
/// image pipeline touches.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<CellKey, Cell>,
    /// Column widths in Excel character units.
    col_widths: BTreeMap<u32, f64>,
    /// Row heights in points.
    row_heights: BTreeMap<u32, f64>,
    images: Vec<EmbeddedImage>,
    /// `(at, count)` of every column insertion, oldest first.
    inserted_cols: Vec<(u32, u32)>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell(&self, cell: CellRef) -> Option<&Cell> {
        self.cells.get(&CellKey::from(cell))
    }

    /// Cached value at `cell` ([`CellValue::Empty`] when unset).
    pub fn value(&self, cell: CellRef) -> &CellValue {
        self.cell(cell).map(|c| &c.value).unwrap_or(&EMPTY)
    }

    pub fn set_value(&mut self, cell: CellRef, value: impl Into<CellValue>) {
        let key = CellKey::from(cell);
        let value = value.into();
        match self.cells.get_mut(&key) {
            Some(existing) => {
                existing.value = value;
                if existing.is_blank() {
                    self.cells.remove(&key);
                }
            }
            None if value.is_empty() => {}
            None => {
                self.cells.insert(key, Cell::new(value));
            }
        }
    }

    /// Set (or clear) the formula for `cell`, keeping its cached value.
    pub fn set_formula(&mut self, cell: CellRef, formula: Option<String>) {
        let key = CellKey::from(cell);
        let entry = self.cells.entry(key).or_default();
        entry.formula = formula;
        if entry.is_blank() {
            self.cells.remove(&key);
        }
    }

    /// Stored cells in row-major order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells.iter().map(|(key, cell)| (key.to_ref(), cell))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Highest row index holding a cell.
    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().next_back().map(|key| key.row())
    }

    /// Header row (row 0) values, left to right.
    pub fn header_cells(&self) -> impl Iterator<Item = (u32, &CellValue)> {
        self.cells
            .range(CellKey::new(0, 0)..=CellKey::new(0, EXCEL_MAX_COLS - 1))
            .map(|(key, cell)| (key.col(), &cell.value))
    }

    /// Insert `count` empty columns before column `at`.
    ///
    /// Cells, column widths and image anchors at or right of `at` move right.
    /// Formula text is left as-is. The insertion is recorded so it can be
    /// replayed onto the source package when saving.
    pub fn insert_cols(&mut self, at: u32, count: u32) -> Result<(), ModelError> {
        if count == 0 {
            return Ok(());
        }
        let overflow = ModelError::ColumnOverflow { at, count };
        if at >= EXCEL_MAX_COLS {
            return Err(overflow);
        }

        let rightmost = self
            .cells
            .keys()
            .map(|key| key.col())
            .chain(self.col_widths.keys().copied())
            .chain(self.images.iter().map(|img| img.anchor.col))
            .filter(|col| *col >= at)
            .max();
        if let Some(rightmost) = rightmost {
            if rightmost as u64 + count as u64 >= EXCEL_MAX_COLS as u64 {
                return Err(overflow);
            }
        }

        let shift = |col: u32| if col >= at { col + count } else { col };

        self.cells = std::mem::take(&mut self.cells)
            .into_iter()
            .map(|(key, cell)| (CellKey::new(key.row(), shift(key.col())), cell))
            .collect();
        self.col_widths = std::mem::take(&mut self.col_widths)
            .into_iter()
            .map(|(col, width)| (shift(col), width))
            .collect();
        for image in &mut self.images {
            image.anchor.col = shift(image.anchor.col);
        }
        self.inserted_cols.push((at, count));

        Ok(())
    }

    /// Column insertions applied so far, as `(at, count)`, oldest first.
    pub fn inserted_cols(&self) -> &[(u32, u32)] {
        &self.inserted_cols
    }

    /// Columns that did not exist when the sheet was loaded, ascending.
    pub fn new_cols(&self) -> Vec<u32> {
        let mut cols: Vec<u32> = Vec::new();
        for &(at, count) in &self.inserted_cols {
            for col in &mut cols {
                if *col >= at {
                    *col += count;
                }
            }
            cols.extend(at..at + count);
        }
        cols.sort_unstable();
        cols
    }

    pub fn set_col_width(&mut self, col: u32, width: f64) {
        self.col_widths.insert(col, width);
    }

    pub fn col_width(&self, col: u32) -> Option<f64> {
        self.col_widths.get(&col).copied()
    }

    pub fn col_widths(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.col_widths.iter().map(|(col, width)| (*col, *width))
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    pub fn row_heights(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.row_heights.iter().map(|(row, height)| (*row, *height))
    }

    /// Hand an image over to the worksheet.
    pub fn add_image(&mut self, image: EmbeddedImage) {
        self.images.push(image);
    }

    pub fn images(&self) -> &[EmbeddedImage] {
        &self.images
    }

    /// First image anchored at `cell`, if any.
    pub fn image_at(&self, cell: CellRef) -> Option<&EmbeddedImage> {
        self.images.iter().find(|img| img.anchor == cell)
    }
}
