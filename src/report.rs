//! Console rendering of inspection reports.

use crate::models::{InspectionReport, SheetDescription, SheetOutcome};
use std::io::{self, Write};

const RULE_WIDTH: usize = 50;

/// Layout used for local workbooks
pub fn render_local<W: Write>(report: &InspectionReport, out: &mut W) -> io::Result<()> {
    let rule = "-".repeat(RULE_WIDTH);

    writeln!(out, "\nSheet Names:")?;
    writeln!(out, "{}", rule)?;
    for name in &report.sheet_names {
        writeln!(out, "- {}", name)?;
    }

    writeln!(out, "\nDetailed Sheet Analysis:")?;
    writeln!(out, "{}", rule)?;
    for sheet in &report.sheets {
        writeln!(out, "\n=== {} ===", sheet.name)?;
        match &sheet.outcome {
            SheetOutcome::Described(desc) => {
                writeln!(out, "Columns ({}):", desc.column_count())?;
                write_columns(desc, out)?;
                write_sample(desc, out)?;
            }
            SheetOutcome::NoData => writeln!(out, "No data found.")?,
            SheetOutcome::Failed { error } => writeln!(out, "Error reading sheet: {}", error)?,
        }
    }

    Ok(())
}

/// Layout used for hosted spreadsheets
pub fn render_remote<W: Write>(report: &InspectionReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n=== Sheet Names ===")?;
    for name in &report.sheet_names {
        writeln!(out, "- {}", name)?;
    }

    writeln!(out, "\n=== Analyzing Sheet Structure ===")?;
    for sheet in &report.sheets {
        writeln!(out, "\nAnalyzing '{}':", sheet.name)?;
        match &sheet.outcome {
            SheetOutcome::Described(desc) => {
                writeln!(out, "\nFound {} columns:", desc.column_count())?;
                write_columns(desc, out)?;
                write_sample(desc, out)?;
            }
            SheetOutcome::NoData => writeln!(out, "No data found.")?,
            SheetOutcome::Failed { error } => {
                writeln!(out, "Error accessing sheet '{}': {}", sheet.name, error)?
            }
        }
    }

    Ok(())
}

fn write_columns<W: Write>(desc: &SheetDescription, out: &mut W) -> io::Result<()> {
    for column in &desc.columns {
        writeln!(out, "{}: {}", column.label, column.header)?;
    }
    Ok(())
}

fn write_sample<W: Write>(desc: &SheetDescription, out: &mut W) -> io::Result<()> {
    if desc.sample_row.is_none() {
        return Ok(());
    }

    writeln!(out, "\nSample data row:")?;
    for (header, value) in desc.sample_pairs() {
        writeln!(out, "{}: {}", header, value)?;
    }
    Ok(())
}
