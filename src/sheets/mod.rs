mod auth;
mod client;
mod credential;
mod inspector;

pub use auth::GoogleOAuthFlow;
pub use client::SheetsClient;
pub use credential::{Credential, FileCredentialStore, MemoryCredentialStore, acquire_credential};
pub use inspector::RemoteSheetInspector;

use crate::error::Result;
use async_trait::async_trait;

/// Read-only access to one hosted spreadsheet
#[async_trait]
pub trait SheetsApi {
    /// Titles of all sheets, in spreadsheet order
    async fn sheet_titles(&self) -> Result<Vec<String>>;

    /// Cell text of an A1-notation range, row by row
    async fn values(&self, range: &str) -> Result<Vec<Vec<String>>>;
}
