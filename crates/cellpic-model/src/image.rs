use crate::CellRef;

/// A picture floating over the grid, anchored by its top-left corner.
///
/// Embedded images are drawing objects rather than cell values: an image larger
/// than its anchor cell visually overlaps neighbouring cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbeddedImage {
    /// Cell under the image's top-left corner.
    pub anchor: CellRef,
    /// Display width in pixels.
    pub width_px: u32,
    /// Display height in pixels.
    pub height_px: u32,
    /// Encoded PNG bytes.
    pub data: Vec<u8>,
    pub alt_text: Option<String>,
}

impl EmbeddedImage {
    pub fn new(anchor: CellRef, width_px: u32, height_px: u32, data: Vec<u8>) -> Self {
        Self {
            anchor,
            width_px,
            height_px,
            data,
            alt_text: None,
        }
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = Some(alt_text.into());
        self
    }
}
