use crate::column::column_label;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnHeader {
    pub label: String,
    pub header: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SheetDescription {
    pub name: String,
    pub columns: Vec<ColumnHeader>,
    /// First data row, truncated to the number of headers
    pub sample_row: Option<Vec<String>>,
}

impl SheetDescription {
    /// Build a description from rows of cell text, first row as headers.
    ///
    /// Returns `None` when there are no rows at all. `first_column` is the
    /// zero-based index of the column the rows start at.
    pub fn from_rows(name: &str, rows: &[Vec<String>], first_column: usize) -> Option<Self> {
        let (headers, data) = rows.split_first()?;

        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| ColumnHeader {
                label: column_label(first_column + idx),
                header: header.clone(),
            })
            .collect();

        let sample_row = data
            .first()
            .map(|row| row.iter().take(headers.len()).cloned().collect());

        Some(Self {
            name: name.to_string(),
            columns,
            sample_row,
        })
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[cfg(test)]
    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    #[cfg(test)]
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }

    /// Header and value pairs of the sample row
    pub fn sample_pairs(&self) -> Vec<(&str, &str)> {
        match &self.sample_row {
            Some(row) => self
                .columns
                .iter()
                .zip(row)
                .map(|(c, v)| (c.header.as_str(), v.as_str()))
                .collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SheetOutcome {
    Described(SheetDescription),
    NoData,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SheetReport {
    pub name: String,
    pub outcome: SheetOutcome,
}

/// Result of inspecting every sheet of one data source
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InspectionReport {
    pub source: String,
    pub sheet_names: Vec<String>,
    pub sheets: Vec<SheetReport>,
}

impl InspectionReport {
    pub fn failures(&self) -> impl Iterator<Item = &SheetReport> {
        self.sheets
            .iter()
            .filter(|s| matches!(s.outcome, SheetOutcome::Failed { .. }))
    }
}
