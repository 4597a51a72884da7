use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

/// Refresh this long before the reported expiry
const EXPIRY_MARGIN_SECS: i64 = 300;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry time as seconds since Unix epoch
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Credential {
    /// Check if the access token is expired or about to expire (within 5 minutes)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at < chrono::Utc::now().timestamp() + EXPIRY_MARGIN_SECS,
            None => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }
}

/// Where credentials live between runs
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>>;

    fn save(&self, credential: &Credential) -> Result<()>;

    fn is_valid(&self, credential: &Credential) -> bool {
        credential.is_valid()
    }
}

/// Obtains new credentials from the authorization server
#[async_trait]
pub trait OAuthFlow {
    /// Run the interactive consent flow
    async fn authorize(&self) -> Result<Credential>;

    async fn refresh(&self, refresh_token: &str) -> Result<Credential>;
}

/// Load a usable credential, refreshing or re-authorizing as needed.
///
/// A cached credential that is still valid is returned as is. Anything newly
/// obtained is written back to the store.
pub async fn acquire_credential<S, F>(store: &S, flow: &F) -> Result<Credential>
where
    S: CredentialStore + ?Sized,
    F: OAuthFlow + Sync + ?Sized,
{
    let cached = store.load()?;

    let credential = match cached {
        Some(credential) if store.is_valid(&credential) => {
            debug!("Using cached Google credential");
            return Ok(credential);
        }
        Some(Credential {
            refresh_token: Some(refresh_token),
            ..
        }) => {
            debug!("Access token expired, refreshing...");
            let mut refreshed = flow.refresh(&refresh_token).await?;
            if refreshed.refresh_token.is_none() {
                refreshed.refresh_token = Some(refresh_token);
            }
            refreshed
        }
        _ => {
            debug!("No usable cached credential, starting consent flow...");
            flow.authorize().await?
        }
    };

    store.save(&credential)?;

    Ok(credential)
}

/// JSON token cache on disk, readable by the owner only
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Delete the token cache file
    #[instrument(name = "Clearing auth tokens for Google Sheets", skip_all)]
    pub fn clear(&self) -> Result<()> {
        if !self.path.exists() {
            debug!("No Google Sheets tokens to clear");
            return Ok(());
        }

        fs::remove_file(&self.path)
            .map_err(|e| AppError::Auth(format!("Failed to delete tokens file: {}", e)))?;
        info!("Cleared Google Sheets cached tokens");

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| AppError::Auth(format!("Failed to read tokens file: {}", e)))?;

        let credential: Credential = serde_json::from_str(&contents)
            .map_err(|e| AppError::Auth(format!("Failed to parse tokens: {}", e)))?;

        Ok(Some(credential))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Auth(format!("Failed to create token cache directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(credential)
            .map_err(|e| AppError::Auth(format!("Failed to serialize tokens: {}", e)))?;

        // Create file with owner-only permissions from the start
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)
            .map_err(|e| AppError::Auth(format!("Failed to create tokens file: {}", e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| AppError::Auth(format!("Failed to write tokens file: {}", e)))?;

        Ok(())
    }
}

/// Keeps credentials for the lifetime of the process only
#[derive(Default)]
pub struct MemoryCredentialStore {
    credential: Mutex<Option<Credential>>,
    saves: Mutex<usize>,
}

impl MemoryCredentialStore {
    #[cfg(test)]
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
            saves: Mutex::new(0),
        }
    }

    #[cfg(test)]
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or_default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        let credential = self
            .credential
            .lock()
            .map_err(|_| AppError::Auth("Credential store lock poisoned".to_string()))?;
        Ok(credential.clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let mut stored = self
            .credential
            .lock()
            .map_err(|_| AppError::Auth("Credential store lock poisoned".to_string()))?;
        *stored = Some(credential.clone());

        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn credential(token: &str, refresh: Option<&str>, expires_in: i64) -> Credential {
        Credential {
            access_token: token.to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at: Some(chrono::Utc::now().timestamp() + expires_in),
        }
    }

    #[derive(Default)]
    pub(crate) struct MockFlow {
        pub authorizations: AtomicUsize,
        pub refreshes: AtomicUsize,
        pub fail_refresh: bool,
    }

    #[async_trait]
    impl OAuthFlow for MockFlow {
        async fn authorize(&self) -> Result<Credential> {
            self.authorizations.fetch_add(1, Ordering::SeqCst);
            Ok(credential("authorized", Some("new-refresh"), 3600))
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<Credential> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail_refresh {
                return Err(AppError::Auth("refresh rejected".to_string()));
            }
            Ok(credential("refreshed", None, 3600))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::{MockFlow, credential};
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_expiry() {
        assert!(!credential("t", None, 3600).is_expired());
        assert!(credential("t", None, 60).is_expired());
        assert!(credential("t", None, -10).is_expired());

        let no_expiry = Credential {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: None,
        };
        assert!(no_expiry.is_valid());
    }

    #[test]
    fn test_empty_token_invalid() {
        assert!(!credential("", None, 3600).is_valid());
    }

    #[tokio::test]
    async fn test_valid_cache_is_reused() {
        let store = MemoryCredentialStore::with_credential(credential("cached", None, 3600));
        let flow = MockFlow::default();

        let cred = acquire_credential(&store, &flow).await.unwrap();

        assert_eq!(cred.access_token, "cached");
        assert_eq!(store.save_count(), 0);
        assert_eq!(flow.authorizations.load(Ordering::SeqCst), 0);
        assert_eq!(flow.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_with_refresh_token_refreshes() {
        let store =
            MemoryCredentialStore::with_credential(credential("old", Some("keep-me"), -10));
        let flow = MockFlow::default();

        let cred = acquire_credential(&store, &flow).await.unwrap();

        assert_eq!(cred.access_token, "refreshed");
        assert_eq!(
            cred.refresh_token.as_deref(),
            Some("keep-me"),
            "refresh token should be carried over when the response has none"
        );
        assert_eq!(flow.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(flow.authorizations.load(Ordering::SeqCst), 0);
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().unwrap(), Some(cred));
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token_authorizes() {
        let store = MemoryCredentialStore::with_credential(credential("old", None, -10));
        let flow = MockFlow::default();

        let cred = acquire_credential(&store, &flow).await.unwrap();

        assert_eq!(cred.access_token, "authorized");
        assert_eq!(flow.authorizations.load(Ordering::SeqCst), 1);
        assert_eq!(flow.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_cache_authorizes() {
        let store = MemoryCredentialStore::default();
        let flow = MockFlow::default();

        let cred = acquire_credential(&store, &flow).await.unwrap();

        assert_eq!(cred.access_token, "authorized");
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_propagates() {
        let store = MemoryCredentialStore::with_credential(credential("old", Some("r"), -10));
        let flow = MockFlow {
            fail_refresh: true,
            ..Default::default()
        };

        let result = acquire_credential(&store, &flow).await;

        assert!(matches!(result, Err(AppError::Auth(_))));
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");
        let store = FileCredentialStore::new(path.clone());

        assert_eq!(store.load().unwrap(), None);

        let cred = credential("token", Some("refresh"), 3600);
        store.save(&cred).unwrap();
        assert_eq!(store.load().unwrap(), Some(cred));

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        store.clear().unwrap();
        assert!(!path.exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::new(path);
        assert!(matches!(store.load(), Err(AppError::Auth(_))));
    }
}
