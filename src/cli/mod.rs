mod auth;
mod local;
mod remote;
mod show;

use crate::error::Result;
use crate::models::InspectionReport;
use clap::{Parser, Subcommand};
use std::io::Write;

pub use auth::AuthArgs;
pub use local::LocalArgs;
pub use remote::RemoteArgs;
pub use show::ShowResource;

#[derive(Parser, Debug)]
#[command(name = "sheet-inspector")]
#[command(about = "Print the sheets, column headers and a sample row of a spreadsheet", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Local(args) => args.execute(),
            Commands::Remote(args) => args.execute().await,
            Commands::Auth(args) => args.execute().await,
            Commands::Show { resource } => resource.execute(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect a workbook file on local storage
    Local(LocalArgs),
    /// Inspect a Google Sheets spreadsheet
    Remote(RemoteArgs),
    /// Authenticate with Google without inspecting anything
    Auth(AuthArgs),
    Show {
        #[command(subcommand)]
        resource: ShowResource,
    },
}

/// Print a report as text with the given layout, or as JSON
fn print_report(
    report: &InspectionReport,
    json: bool,
    render: fn(&InspectionReport, &mut std::io::StdoutLock<'static>) -> std::io::Result<()>,
) -> Result<()> {
    let mut out = std::io::stdout().lock();

    if json {
        serde_json::to_writer_pretty(&mut out, report)?;
        writeln!(out)?;
    } else {
        render(report, &mut out)?;
    }

    out.flush()?;
    Ok(())
}
