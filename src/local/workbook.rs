use crate::config::LocalConfig;
use crate::error::{AppError, Result};
use crate::models::{InspectionReport, SheetDescription, SheetOutcome, SheetReport};
use calamine::{Data, ExcelDateTime, Range, Reader, Sheets, open_workbook_auto};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

type Workbook = Sheets<BufReader<File>>;

/// Number of leading rows read from each sheet: headers plus one sample row
const DESCRIBE_ROWS: usize = 2;

pub struct LocalWorkbookInspector {
    path: PathBuf,
    workbook: Option<Workbook>,
}

impl LocalWorkbookInspector {
    pub fn new(config: &LocalConfig) -> Self {
        Self {
            path: config.workbook_path.clone(),
            workbook: None,
        }
    }

    fn workbook(&mut self) -> Result<&mut Workbook> {
        if self.workbook.is_none() {
            self.workbook = Some(Self::open(&self.path)?);
        }

        self.workbook
            .as_mut()
            .ok_or_else(|| AppError::Workbook("Workbook not open".to_string()))
    }

    #[instrument(name = "Opening workbook", skip_all, fields(path = %path.display()))]
    fn open(path: &Path) -> Result<Workbook> {
        if !path.exists() {
            return Err(AppError::NotFound(path.display().to_string()));
        }

        let workbook = open_workbook_auto(path)
            .map_err(|e| AppError::Workbook(format!("{}: {}", path.display(), e)))?;
        debug!("Opened workbook");

        Ok(workbook)
    }

    /// Sheet names in workbook order
    pub fn list_sheets(&mut self) -> Result<Vec<String>> {
        Ok(self.workbook()?.sheet_names())
    }

    #[instrument(name = "Describing sheet", skip(self))]
    pub fn describe_sheet(&mut self, name: &str) -> Result<SheetOutcome> {
        let range = self
            .workbook()?
            .worksheet_range(name)
            .map_err(|e| AppError::Workbook(format!("Failed to read sheet '{}': {}", name, e)))?;

        Ok(describe_range(name, &range))
    }

    pub fn inspect(&mut self) -> Result<InspectionReport> {
        let sheet_names = self.list_sheets()?;

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in &sheet_names {
            let outcome = self.describe_sheet(name)?;
            sheets.push(SheetReport {
                name: name.clone(),
                outcome,
            });
        }

        Ok(InspectionReport {
            source: self.path.display().to_string(),
            sheet_names,
            sheets,
        })
    }
}

/// Describe the used range of a sheet, first row as headers
pub(crate) fn describe_range(name: &str, range: &Range<Data>) -> SheetOutcome {
    let first_column = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let rows: Vec<Vec<String>> = range
        .rows()
        .take(DESCRIBE_ROWS)
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    match SheetDescription::from_rows(name, &rows, first_column) {
        Some(description) => SheetOutcome::Described(description),
        None => SheetOutcome::NoData,
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERROR: {:?}", e),
        Data::DateTime(dt) => datetime_to_string(dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Time-only serials print as a time, whole-day serials as a date
fn datetime_to_string(dt: &ExcelDateTime) -> String {
    let serial = dt.as_f64();
    match dt.as_datetime() {
        Some(_) if dt.is_duration() => dt.to_string(),
        Some(datetime) if serial < 1.0 => datetime.time().to_string(),
        Some(datetime) if serial.fract() == 0.0 => datetime.date().to_string(),
        Some(datetime) => datetime.to_string(),
        None => dt.to_string(),
    }
}
