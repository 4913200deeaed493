//! CLI structure and command definitions

use clap::{Args, Parser, Subcommand};
use sqlrestore_core::config::credential::{
    CLIENT_ID_ENV, CLIENT_SECRET_ENV, SUBSCRIPTION_ID_ENV, TENANT_ID_ENV,
};
use sqlrestore_core::{ConfigError, Credentials};
use std::fmt;

/// Azure SQL restore walkthrough
#[derive(Parser, Debug)]
#[command(name = "sqlrestore")]
#[command(
    version,
    about = "Walk through Azure SQL point-in-time and dropped-database restores"
)]
#[command(long_about = "
Walk through Azure SQL point-in-time and dropped-database restores

Creates a throwaway resource group with a SQL server and two databases,
restores one database to a point in time, deletes the other and restores it
from its dropped-database backup, then deletes everything again. The whole
run can take well over an hour while backups become available.

Credentials are read from CLIENT_ID, CLIENT_SECRET, TENANT_ID and
SUBSCRIPTION_ID unless passed as flags.

EXAMPLES:
    # Run in the default region
    sqlrestore run

    # Run in another region with more log output
    sqlrestore run --region westeurope -v

    # Show the effective settings
    sqlrestore show-config
")]
pub struct Cli {
    /// Path to alternate configuration file
    #[arg(long, global = true, env = "SQLRESTORE_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Increase log output (-v debug, -vv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision, restore and tear down
    Run(RunArgs),

    /// Print the effective settings as TOML
    #[command(name = "show-config")]
    ShowConfig,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Azure region for every resource (overrides the config file)
    #[arg(long)]
    pub region: Option<String>,

    /// Do not show a spinner while waiting on backups
    #[arg(long)]
    pub no_progress: bool,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Service principal used to talk to the resource manager
#[derive(Args)]
pub struct CredentialArgs {
    /// Application (client) ID
    #[arg(long, env = CLIENT_ID_ENV)]
    pub client_id: Option<String>,

    /// Client secret
    #[arg(long, env = CLIENT_SECRET_ENV, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Directory (tenant) ID
    #[arg(long, env = TENANT_ID_ENV)]
    pub tenant_id: Option<String>,

    /// Subscription to create resources in
    #[arg(long, env = SUBSCRIPTION_ID_ENV)]
    pub subscription_id: Option<String>,
}

impl fmt::Debug for CredentialArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialArgs")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("tenant_id", &self.tenant_id)
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

impl CredentialArgs {
    /// Every value has to be present and non-empty
    pub fn resolve(&self) -> Result<Credentials, ConfigError> {
        Ok(Credentials::new(
            required(&self.client_id, CLIENT_ID_ENV)?,
            required(&self.client_secret, CLIENT_SECRET_ENV)?,
            required(&self.tenant_id, TENANT_ID_ENV)?,
            required(&self.subscription_id, SUBSCRIPTION_ID_ENV)?,
        ))
    }
}

fn required(value: &Option<String>, env_var: &str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingCredential {
            env_var: env_var.to_string(),
        })
}
