use super::auth::{AuthArgs, authenticate};
use super::print_report;
use crate::config::Config;
use crate::error::Result;
use crate::report::render_remote;
use crate::sheets::{RemoteSheetInspector, SheetsClient};
use clap::Args;
use tracing::info;

#[derive(Args, Debug)]
pub struct RemoteArgs {
    /// Spreadsheet to inspect, overrides the configured id
    #[arg(long)]
    pub spreadsheet_id: Option<String>,

    #[command(flatten)]
    pub auth: AuthArgs,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RemoteArgs {
    pub async fn execute(&self) -> Result<()> {
        let mut config = Config::load()?.google;
        if let Some(id) = &self.spreadsheet_id {
            config.spreadsheet_id = id.clone();
        }

        let credential = authenticate(&config, &self.auth).await?;
        let client = SheetsClient::new(&credential, &config.spreadsheet_id)?;
        let url = client.spreadsheet_url();

        let inspector = RemoteSheetInspector::new(url.clone(), client);
        let report = inspector.inspect().await?;
        info!(url = url, "Spreadsheet inspected");

        print_report(&report, self.json, render_remote)
    }
}
