//! `cellpic-model` defines the in-memory spreadsheet structures the image
//! column pipeline works on.
//!
//! The model is deliberately small: cached cell values (plus formula text),
//! column widths, row heights and floating images. Loading and saving live in
//! `cellpic-io`; nothing here touches the filesystem.

mod address;
mod cell;
mod error;
mod image;
mod value;
mod workbook;
mod worksheet;

pub use address::{col_to_name, CellRef};
pub use cell::{normalize_formula, Cell, CellKey, EXCEL_MAX_COLS, EXCEL_MAX_ROWS};
pub use error::ModelError;
pub use image::EmbeddedImage;
pub use value::{CellValue, ErrorValue};
pub use workbook::Workbook;
pub use worksheet::Worksheet;
