//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap
//! and dispatches each command to the runner or the config helpers.

use crate::auth::StorageAccount;
use crate::config::{apply_env, init_default_config, load_config, Config, ConnectionSecret};
use crate::error::Result;
use crate::runner::{seed_local_file, Group, RunSettings, StorageClients, StorageRunner};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "storage-tour")]
#[command(about = "Walk through Azure Blob, Table, File Share and Queue storage")]
#[command(version, author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Storage account connection string
    #[arg(
        long,
        global = true,
        value_name = "CONNECTION_STRING",
        env = "AZURE_STORAGE_CONNECTION_STRING",
        hide_env_values = true
    )]
    pub connection_string: Option<String>,

    /// Create the local sample file if it does not exist
    #[arg(long, global = true)]
    pub seed: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run every operation group: blob, table, file share, queue (default)
    Run,
    /// Upload and download a blob
    Blob,
    /// Insert and query a table entity
    Table,
    /// Upload and download a file in a file share
    Share,
    /// Send, receive and delete queue messages
    Queue,
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default configuration file
    Init,
}

impl Cli {
    /// Groups selected by the command, `None` for config commands
    pub fn groups(&self) -> Option<Vec<Group>> {
        match &self.command {
            None | Some(Commands::Run) => Some(Group::ALL.to_vec()),
            Some(Commands::Blob) => Some(vec![Group::Blob]),
            Some(Commands::Table) => Some(vec![Group::Table]),
            Some(Commands::Share) => Some(vec![Group::Share]),
            Some(Commands::Queue) => Some(vec![Group::Queue]),
            Some(Commands::Config { .. }) => None,
        }
    }

    /// Effective configuration: file, then environment, then flags.
    ///
    /// `config init` ignores any existing file since the target may not
    /// exist yet.
    pub async fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.command {
            Some(Commands::Config {
                command: ConfigCommands::Init,
            }) => {
                let mut config = Config::default();
                apply_env(&mut config, |key| std::env::var(key).ok());
                config
            }
            _ => load_config(self.config.as_deref()).await?,
        };

        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Apply command-line flags on top of file and environment settings
    pub fn apply_overrides(&self, config: &mut Config) {
        if self.debug {
            config.debug = true;
        }

        if let Some(connection_string) = &self.connection_string {
            config.connection_string = ConnectionSecret::new(connection_string.clone());
        }
    }

    pub async fn execute(self, config: Config) -> Result<()> {
        if let Some(Commands::Config { command }) = &self.command {
            return execute_config_command(command, &self.config, &config).await;
        }

        let groups = self.groups().unwrap_or_else(|| Group::ALL.to_vec());
        config.validate()?;

        if self.seed {
            seed_local_file(&config.local_file).await?;
        }

        let account = StorageAccount::from_connection_string(config.connection_string.expose())?;
        debug!("Using storage account '{}'", account.name);

        let runner = StorageRunner::new(
            StorageClients::from_account(&account),
            RunSettings::from(&config),
        );

        let mut out = std::io::stdout();
        runner.run_groups(&groups, &mut out).await?;

        info!("Completed {} operation group(s)", groups.len());
        Ok(())
    }
}

async fn execute_config_command(
    command: &ConfigCommands,
    path: &Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let path = match path {
        Some(path) => path.clone(),
        None => Config::get_config_path()?,
    };

    match command {
        ConfigCommands::Show => {
            println!("{}", config.render_table());
        }
        ConfigCommands::Init => {
            if init_default_config(&path).await? {
                println!("Wrote default configuration to {}", path.display());
            } else {
                println!("Configuration already exists at {}", path.display());
            }
        }
    }

    Ok(())
}
