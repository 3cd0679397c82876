use std::path::{Path, PathBuf};

use crate::patch::is_patchable;

/// Extension of workbooks rebuilt from the model.
pub const OUTPUT_EXTENSION: &str = "xlsx";

/// Derive the output file for `input` by inserting `marker` before the extension.
///
/// `shop/商品.xlsx` with marker `-图片已下载` becomes `shop/商品-图片已下载.xlsx`.
/// `.xlsx`/`.xlsm` inputs keep their extension since they are edited in place;
/// every other format (`.xls`, `.xlsb`, `.ods`, ...) is rebuilt as `.xlsx`.
pub fn output_path(input: &Path, marker: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = match input.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if is_patchable(input) => ext,
        _ => OUTPUT_EXTENSION,
    };
    let file_name = format!("{stem}{marker}.{extension}");
    match input.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}
