use super::SheetsApi;
use crate::column::column_label;
use crate::error::{AppError, Result};
use crate::models::{InspectionReport, SheetDescription, SheetOutcome, SheetReport};
use indicatif::ProgressStyle;
use tracing::{Span, debug, info, instrument, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Rows fetched per sheet: headers plus a few data rows
pub const FETCH_ROWS: usize = 5;

/// Columns fetched per sheet, A through ZZ
pub const FETCH_COLUMNS: usize = 702;

/// A1-notation range covering the leading block of a sheet, e.g. `'Foo'!A1:ZZ5`.
///
/// The name is always quoted so names such as `A1` are not read as cell references.
pub fn sheet_range(sheet_name: &str) -> String {
    format!(
        "'{}'!A1:{}{}",
        sheet_name.replace('\'', "''"),
        column_label(FETCH_COLUMNS - 1),
        FETCH_ROWS
    )
}

pub struct RemoteSheetInspector<C> {
    client: C,
    source: String,
}

impl<C> RemoteSheetInspector<C>
where
    C: SheetsApi + Sync,
{
    pub fn new(source: impl Into<String>, client: C) -> Self {
        Self {
            client,
            source: source.into(),
        }
    }

    #[instrument(name = "Listing sheets", skip(self))]
    pub async fn list_sheets(&self) -> Result<Vec<String>> {
        let titles = self.client.sheet_titles().await?;
        debug!(count = titles.len(), "Listed sheets");
        Ok(titles)
    }

    /// Describe one sheet from its leading block of cells.
    ///
    /// API failures are returned as errors; `inspect` records them per sheet.
    #[instrument(name = "Describing sheet", skip(self))]
    pub async fn describe_sheet(&self, name: &str) -> Result<SheetOutcome> {
        let rows = self.client.values(&sheet_range(name)).await?;

        Ok(match SheetDescription::from_rows(name, &rows, 0) {
            Some(description) => SheetOutcome::Described(description),
            None => SheetOutcome::NoData,
        })
    }

    /// List every sheet and describe each one, isolating per-sheet failures
    #[instrument(name = "Inspecting spreadsheet", skip_all)]
    pub async fn inspect(&self) -> Result<InspectionReport> {
        let span = Span::current();
        span.pb_set_style(
            &ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
            )
            .map_err(|e| AppError::Other(e.into()))?,
        );
        span.pb_set_message("Describing sheets");

        let sheet_names = self.list_sheets().await?;
        span.pb_set_length(sheet_names.len() as u64);

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in &sheet_names {
            let outcome = match self.describe_sheet(name).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(sheet = %name, error = %e, "Failed to describe sheet");
                    SheetOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            sheets.push(SheetReport {
                name: name.clone(),
                outcome,
            });
            span.pb_inc(1);
        }

        let report = InspectionReport {
            source: self.source.clone(),
            sheet_names,
            sheets,
        };
        info!(
            sheets = report.sheets.len(),
            failed = report.failures().count(),
            "Inspection finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod mocks {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub(crate) struct MockSheetsClient {
        pub titles: Vec<String>,
        pub ranges: HashMap<String, Vec<Vec<String>>>,
        pub failing_ranges: Vec<String>,
        pub fail_listing: bool,
        pub requested: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SheetsApi for MockSheetsClient {
        async fn sheet_titles(&self) -> Result<Vec<String>> {
            if self.fail_listing {
                return Err(AppError::Sheets("Failed to get spreadsheet: 403".to_string()));
            }
            Ok(self.titles.clone())
        }

        async fn values(&self, range: &str) -> Result<Vec<Vec<String>>> {
            self.requested.lock().unwrap().push(range.to_string());
            if self.failing_ranges.iter().any(|r| r == range) {
                return Err(AppError::Sheets(format!(
                    "Failed to read range '{}': 400 Bad Request",
                    range
                )));
            }
            Ok(self.ranges.get(range).cloned().unwrap_or_default())
        }
    }
}
