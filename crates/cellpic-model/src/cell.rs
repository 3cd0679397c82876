use crate::{CellRef, CellValue};

/// Excel-compatible maximum rows per worksheet (1,048,576).
pub const EXCEL_MAX_ROWS: u32 = 1_048_576;

/// Excel-compatible maximum columns per worksheet (16,384).
pub const EXCEL_MAX_COLS: u32 = 16_384;

const COL_BITS: u32 = 14; // 2^14 = 16,384 columns.
const COL_MASK: u64 = (1u64 << COL_BITS) - 1;

/// Compact key used for sparse cell storage.
///
/// The key packs `(row, col)` into a `u64` as `(row << 14) | col`, so ordering
/// by key is row-major ordering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CellKey(u64);

impl CellKey {
    /// Encode a `(row, col)` coordinate.
    ///
    /// Panics if the coordinate is outside Excel bounds.
    #[inline]
    pub fn new(row: u32, col: u32) -> Self {
        assert!(row < EXCEL_MAX_ROWS, "row out of Excel bounds: {row}");
        assert!(col < EXCEL_MAX_COLS, "col out of Excel bounds: {col}");
        Self(((row as u64) << COL_BITS) | (col as u64))
    }

    #[inline]
    pub const fn row(self) -> u32 {
        (self.0 >> COL_BITS) as u32
    }

    #[inline]
    pub const fn col(self) -> u32 {
        (self.0 & COL_MASK) as u32
    }

    #[inline]
    pub const fn to_ref(self) -> CellRef {
        CellRef::new(self.row(), self.col())
    }
}

impl From<CellRef> for CellKey {
    fn from(value: CellRef) -> Self {
        Self::new(value.row, value.col)
    }
}

/// A stored cell: its cached value and, optionally, the formula that produced it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    /// Formula text, always starting with `=`.
    pub formula: Option<String>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            formula: None,
        }
    }

    /// A cell with neither value nor formula does not need to be stored.
    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.formula.is_none()
    }
}

/// Normalize formula text so it begins with `=`; blank input yields `None`.
pub fn normalize_formula(formula: &str) -> Option<String> {
    let trimmed = formula.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('=') {
        Some(trimmed.to_owned())
    } else {
        Some(format!("={trimmed}"))
    }
}
