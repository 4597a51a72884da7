use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR_PREFIX: &str = "sheet-inspector";

const DEFAULT_WORKBOOK_PATH: &str = "1PWR PR MASTER TRACKING_New.xlsx";
const DEFAULT_SPREADSHEET_ID: &str = "12QgLxtavdCa9FkfTeMDogXA0COYBCxmUZKHDXybOzaU";
const DEFAULT_CLIENT_SECRET_PATH: &str = "credentials.json";
pub(crate) const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub local: LocalConfig,
    pub google: GoogleConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LocalConfig {
    pub workbook_path: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            workbook_path: PathBuf::from(DEFAULT_WORKBOOK_PATH),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GoogleConfig {
    pub spreadsheet_id: String,
    /// Installed-app client secret downloaded from the Google Cloud console
    pub client_secret_path: PathBuf,
    /// Overrides the token cache location under the XDG cache directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_cache_path: Option<PathBuf>,
    pub scopes: Vec<String>,
    /// Loopback port for the consent callback, 0 picks a free port
    pub callback_port: u16,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: DEFAULT_SPREADSHEET_ID.to_string(),
            client_secret_path: PathBuf::from(DEFAULT_CLIENT_SECRET_PATH),
            token_cache_path: None,
            scopes: vec![READONLY_SCOPE.to_string()],
            callback_port: 0,
        }
    }
}

impl GoogleConfig {
    /// Resolve the token cache path, falling back to the XDG cache directory
    pub fn token_cache_file(&self) -> Result<PathBuf> {
        match &self.token_cache_path {
            Some(path) => Ok(path.clone()),
            None => Config::cache_file("google_tokens.json"),
        }
    }
}

impl Config {
    /// Load the config file, or the built-in defaults when there is none
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.local.workbook_path.as_os_str().is_empty() {
            return Err(AppError::Config(
                "local.workbook_path must not be empty".to_string(),
            ));
        }

        if self.google.spreadsheet_id.is_empty() {
            return Err(AppError::Config(
                "google.spreadsheet_id must not be empty".to_string(),
            ));
        }

        if self.google.scopes.is_empty() {
            return Err(AppError::Config(
                "google.scopes must list at least one scope".to_string(),
            ));
        }

        Ok(())
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        let xdg_dirs = Self::xdg_dirs();
        xdg_dirs
            .place_config_file("config.toml")
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))
    }

    /// Get the cache directory path
    pub fn cache_dir() -> Result<PathBuf> {
        let xdg = Self::xdg_dirs();
        xdg.get_cache_home()
            .ok_or_else(|| AppError::Config("Failed to determine cache directory".to_string()))
    }

    /// Get a cache file path
    pub fn cache_file(filename: &str) -> Result<PathBuf> {
        let xdg = Self::xdg_dirs();
        xdg.place_cache_file(filename)
            .map_err(|e| AppError::Config(format!("Failed to create cache file path: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            local: LocalConfig {
                workbook_path: PathBuf::from("book.xlsx"),
            },
            google: GoogleConfig {
                spreadsheet_id: "abc123".to_string(),
                token_cache_path: Some(PathBuf::from("/tmp/tokens.json")),
                ..Default::default()
            },
        };

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(
            config.local.workbook_path,
            PathBuf::from(DEFAULT_WORKBOOK_PATH)
        );
        assert_eq!(config.google.spreadsheet_id, DEFAULT_SPREADSHEET_ID);
        assert_eq!(config.google.scopes, vec![READONLY_SCOPE.to_string()]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[google]\nspreadsheet_id = \"other\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.google.spreadsheet_id, "other");
        assert_eq!(
            config.google.client_secret_path,
            PathBuf::from(DEFAULT_CLIENT_SECRET_PATH)
        );
        assert_eq!(config.local, LocalConfig::default());
    }

    #[test]
    fn test_empty_values_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[google]\nspreadsheet_id = \"\"").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(AppError::Config(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[google]\nscopes = []").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[local\nworkbook_path = 1").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_token_cache_override() {
        let config = GoogleConfig {
            token_cache_path: Some(PathBuf::from("/tmp/custom.json")),
            ..Default::default()
        };
        assert_eq!(
            config.token_cache_file().unwrap(),
            PathBuf::from("/tmp/custom.json")
        );
    }
}
