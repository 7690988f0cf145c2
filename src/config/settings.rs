//! Configuration settings management
//!
//! This module handles loading configuration from multiple sources,
//! validation, and persistence.

use crate::error::{Result, StorageTourError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use zeroize::Zeroizing;

/// Upper bound the Queue service accepts for one receive call
pub const MAX_MESSAGES_PER_RECEIVE: u8 = 32;

/// Connection string kept out of logs and wiped on drop
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionSecret(Zeroizing<String>);

impl ConnectionSecret {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ConnectionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<unset>")
        } else {
            f.write_str("<redacted>")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub connection_string: ConnectionSecret,
    pub local_file: PathBuf,
    pub download_file: PathBuf,
    pub container_name: String,
    pub blob_name: String,
    pub table_name: String,
    pub partition_key: String,
    pub row_key: String,
    pub share_name: String,
    pub file_name: String,
    pub queue_name: String,
    pub max_messages: u8,
    pub messages: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let properties = BTreeMap::from([
            ("Property1".to_string(), "Value1".to_string()),
            ("Property2".to_string(), "Value2".to_string()),
        ]);

        Self {
            debug: false,
            connection_string: ConnectionSecret::default(),
            local_file: PathBuf::from("sample.txt"),
            download_file: PathBuf::from("downloaded-sample.txt"),
            container_name: "sample-container".to_string(),
            blob_name: "sample.txt".to_string(),
            table_name: "SampleTable".to_string(),
            partition_key: "PartitionKey".to_string(),
            row_key: "RowKey".to_string(),
            share_name: "sampleshare".to_string(),
            file_name: "sample.txt".to_string(),
            queue_name: "samplequeue".to_string(),
            max_messages: 10,
            messages: vec!["First Message".to_string(), "Second Message".to_string()],
            properties,
        }
    }
}

/// One row of `config show` output
#[derive(Debug, Tabled)]
pub struct SettingRow {
    #[tabled(rename = "Setting")]
    pub setting: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.connection_string.is_empty() {
            return Err(StorageTourError::config(
                "A storage connection string is required. Set AZURE_STORAGE_CONNECTION_STRING or pass --connection-string",
            ));
        }

        let names = [
            ("container_name", &self.container_name),
            ("blob_name", &self.blob_name),
            ("table_name", &self.table_name),
            ("partition_key", &self.partition_key),
            ("row_key", &self.row_key),
            ("share_name", &self.share_name),
            ("file_name", &self.file_name),
            ("queue_name", &self.queue_name),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(StorageTourError::config(format!("{field} must not be empty")));
            }
        }

        if self.max_messages == 0 || self.max_messages > MAX_MESSAGES_PER_RECEIVE {
            return Err(StorageTourError::config(format!(
                "max_messages must be between 1 and {MAX_MESSAGES_PER_RECEIVE}, got {}",
                self.max_messages
            )));
        }

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            use std::env;
            let config_dir = if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
                PathBuf::from(xdg_config_home)
            } else {
                let home_dir = env::var("HOME")
                    .map_err(|_| StorageTourError::config("HOME environment variable not set"))?;
                PathBuf::from(home_dir).join(".config")
            };
            Ok(config_dir.join("storage-tour").join("config.toml"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let config_dir = dirs::config_dir()
                .ok_or_else(|| StorageTourError::config("Unable to determine config directory"))?;
            Ok(config_dir.join("storage-tour").join("config.toml"))
        }
    }

    /// Rows for `config show`, secrets redacted
    pub fn summary_rows(&self) -> Vec<SettingRow> {
        let row = |setting, value: String| SettingRow { setting, value };
        let properties = self
            .properties
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");

        vec![
            row("Connection String", format!("{:?}", self.connection_string)),
            row("Debug", self.debug.to_string()),
            row("Local File", self.local_file.display().to_string()),
            row("Download File", self.download_file.display().to_string()),
            row("Container", self.container_name.clone()),
            row("Blob", self.blob_name.clone()),
            row("Table", self.table_name.clone()),
            row("Partition Key", self.partition_key.clone()),
            row("Row Key", self.row_key.clone()),
            row("Properties", properties),
            row("Share", self.share_name.clone()),
            row("File", self.file_name.clone()),
            row("Queue", self.queue_name.clone()),
            row("Messages", self.messages.join(" | ")),
            row("Max Messages", self.max_messages.to_string()),
        ]
    }

    pub fn render_table(&self) -> String {
        Table::new(self.summary_rows())
            .with(Style::rounded())
            .to_string()
    }
}

/// Load configuration from multiple sources with priority order:
/// 1. Command-line flags (applied by the caller)
/// 2. Environment variables
/// 3. Configuration file
/// 4. Default values
pub async fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    let config_path = match path {
        Some(path) => {
            if !path.exists() {
                return Err(StorageTourError::config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => Config::get_config_path()?,
    };

    if config_path.exists() {
        config = load_from_file(&config_path).await?;
        tracing::debug!("Loaded configuration from {}", config_path.display());
    }

    load_from_env(&mut config);

    Ok(config)
}

async fn load_from_file(path: &Path) -> Result<Config> {
    let contents = tokio::fs::read_to_string(path).await?;
    parse_config(&contents)
}

/// Parse as TOML first, then JSON as fallback
pub fn parse_config(contents: &str) -> Result<Config> {
    match toml::from_str::<Config>(contents) {
        Ok(config) => Ok(config),
        Err(toml_error) => match serde_json::from_str::<Config>(contents) {
            Ok(config) => Ok(config),
            Err(_) => Err(toml_error.into()),
        },
    }
}

fn load_from_env(config: &mut Config) {
    apply_env(config, |key| std::env::var(key).ok());
}

/// Overlay environment values onto `config` using `lookup` to read variables
pub fn apply_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("DEBUG") {
        config.debug = value.to_lowercase() == "true" || value == "1";
    }

    if let Some(value) = lookup("AZURE_STORAGE_CONNECTION_STRING") {
        config.connection_string = ConnectionSecret::new(value);
    }

    if let Some(value) = lookup("STORAGE_TOUR_LOCAL_FILE") {
        config.local_file = PathBuf::from(value);
    }

    if let Some(value) = lookup("STORAGE_TOUR_DOWNLOAD_FILE") {
        config.download_file = PathBuf::from(value);
    }

    if let Some(value) = lookup("STORAGE_TOUR_MAX_MESSAGES") {
        match value.parse::<u8>() {
            Ok(max) => config.max_messages = max,
            Err(_) => tracing::warn!("Ignoring STORAGE_TOUR_MAX_MESSAGES={value}: not a number"),
        }
    }
}

pub async fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| StorageTourError::serialization(e.to_string()))?;

    tokio::fs::write(path, contents).await?;

    Ok(())
}

/// Write a default configuration file; returns false if one already exists
pub async fn init_default_config(path: &Path) -> Result<bool> {
    // Don't overwrite existing configuration
    if path.exists() {
        return Ok(false);
    }

    save_config(&Config::default(), path).await?;
    Ok(true)
}
