//! Finding the URL column in a worksheet's header row.

use cellpic_model::CellValue;

/// A header matches when its text equals, or contains, one of `names`.
///
/// Only string cells are considered; surrounding whitespace is ignored.
pub fn header_matches(header: &CellValue, names: &[String]) -> bool {
    let Some(text) = header.as_str() else {
        return false;
    };
    let text = text.trim();
    !text.is_empty() && names.iter().any(|name| text.contains(name.as_str()))
}

/// Column index of the first header (left to right) matching `names`.
pub fn find_url_column<'a>(
    headers: impl IntoIterator<Item = (u32, &'a CellValue)>,
    names: &[String],
) -> Option<u32> {
    headers
        .into_iter()
        .find(|(_, header)| header_matches(header, names))
        .map(|(col, _)| col)
}
