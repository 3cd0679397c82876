use crate::{ModelError, Worksheet};

/// An ordered collection of named worksheets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty worksheet and return it for population.
    ///
    /// Sheet names are compared case-insensitively, as Excel does.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> Result<&mut Worksheet, ModelError> {
        let name = name.into();
        if self
            .sheets
            .iter()
            .any(|s| s.name().to_lowercase() == name.to_lowercase())
        {
            return Err(ModelError::DuplicateSheetName(name));
        }
        self.sheets.push(Worksheet::new(name));
        let idx = self.sheets.len() - 1;
        Ok(&mut self.sheets[idx])
    }

    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.name() == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }
}
