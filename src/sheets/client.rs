use super::SheetsApi;
use crate::error::{AppError, Result};
use crate::sheets::credential::Credential;
use async_trait::async_trait;
use google_sheets4::api::{Scope, Sheets};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use tracing::instrument;

// Read-only access to spreadsheets
pub(crate) const AUTH_SCOPE: Scope = Scope::SpreadsheetReadonly;

pub struct SheetsClient {
    hub: Sheets<HttpsConnector<HttpConnector>>,
    spreadsheet_id: String,
}

impl SheetsClient {
    /// Create a SheetsClient for one spreadsheet using an acquired credential
    pub fn new(credential: &Credential, spreadsheet_id: &str) -> Result<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| AppError::Sheets(format!("Failed to load native root certificates: {}", e)))?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);

        // A plain access token is enough: scopes were granted during consent
        let hub = Sheets::new(client, credential.access_token.clone());

        Ok(Self {
            hub,
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    pub fn spreadsheet_url(&self) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}", self.spreadsheet_id)
    }
}

/// Render a cell value returned by the values API as text
pub(crate) fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    #[instrument(name = "Fetching spreadsheet metadata", skip(self))]
    async fn sheet_titles(&self) -> Result<Vec<String>> {
        let (_, spreadsheet) = self
            .hub
            .spreadsheets()
            .get(&self.spreadsheet_id)
            .include_grid_data(false)
            .add_scope(AUTH_SCOPE)
            .doit()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to get spreadsheet: {}", e)))?;

        let titles = spreadsheet
            .sheets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|sheet| sheet.properties.and_then(|props| props.title))
            .collect();

        Ok(titles)
    }

    #[instrument(name = "Fetching range", skip(self))]
    async fn values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let (_, response) = self
            .hub
            .spreadsheets()
            .values_get(&self.spreadsheet_id, range)
            .major_dimension("ROWS")
            .value_render_option("FORMATTED_VALUE")
            .add_scope(AUTH_SCOPE)
            .doit()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to read range '{}': {}", range, e)))?;

        // Values are Option<Vec<Vec<serde_json::Value>>>
        let rows = response
            .values
            .unwrap_or_default()
            .iter()
            .map(|row| row.iter().map(value_to_string).collect())
            .collect();

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("Alice")), "Alice");
        assert_eq!(value_to_string(&json!(42)), "42");
        assert_eq!(value_to_string(&json!(1.5)), "1.5");
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&json!(null)), "");
    }
}
