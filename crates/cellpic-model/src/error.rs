/// Structural errors raised while mutating the model.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("inserting {count} column(s) at index {at} would push content past the last Excel column")]
    ColumnOverflow { at: u32, count: u32 },
    #[error("worksheet `{0}` already exists")]
    DuplicateSheetName(String),
}
