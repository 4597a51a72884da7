use super::print_report;
use crate::config::Config;
use crate::error::Result;
use crate::local::LocalWorkbookInspector;
use crate::report::render_local;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct LocalArgs {
    /// Workbook to inspect, overrides the configured path
    pub path: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl LocalArgs {
    pub fn execute(&self) -> Result<()> {
        let mut config = Config::load()?.local;
        if let Some(path) = &self.path {
            config.workbook_path = path.clone();
        }

        let mut inspector = LocalWorkbookInspector::new(&config);
        let report = inspector.inspect()?;
        info!(path = ?config.workbook_path, sheets = report.sheets.len(), "Workbook inspected");

        print_report(&report, self.json, render_local)
    }
}
