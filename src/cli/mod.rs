pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::context::{LoadOutcome, TenantContext};
use crate::directory;
use crate::identity::identity_from_access_token;
use crate::models::Identity;
use crate::storage::FileStore;

#[derive(Parser)]
#[command(name = "dashboard")]
#[command(about = "Dashboard CLI - list and switch the companies you belong to")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "DASHBOARD_TOKEN", hide_env_values = true, help = "Access token issued by the identity provider")]
    pub token: Option<String>,

    #[arg(long, global = true, env = "DASHBOARD_USER_ID", help = "User id, when signing in without a token")]
    pub user_id: Option<String>,

    #[arg(long, global = true, env = "DASHBOARD_EMAIL", help = "User email, when signing in without a token")]
    pub email: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Companies you belong to and the current selection")]
    Company {
        #[command(subcommand)]
        cmd: commands::company::CompanyCommands,
    },

    #[command(about = "Show the signed-in identity")]
    Whoami,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

impl Cli {
    /// Identity from `--token`, or from `--user-id` / `--email`
    pub fn identity(&self, config: &AppConfig) -> anyhow::Result<Identity> {
        if let Some(token) = &self.token {
            return Ok(identity_from_access_token(token, &config.auth)?);
        }

        match (&self.user_id, &self.email) {
            (Some(id), Some(email)) => Ok(Identity::new(id.clone(), email.clone())),
            (Some(id), None) => Ok(Identity::new(id.clone(), String::new())),
            _ => Err(anyhow::anyhow!(
                "Not signed in. Pass --token (or DASHBOARD_TOKEN), or --user-id and --email"
            )),
        }
    }
}

/// Tenant context loaded for one CLI invocation, selection persisted on disk
pub async fn open_context(config: &AppConfig, identity: Identity) -> anyhow::Result<TenantContext> {
    let directory = directory::connect(&config.directory).await?;
    let store = FileStore::in_dir(&config.selection.state_dir()?)?;

    let context = TenantContext::new(directory, Arc::new(store)).with_selection_key(config.selection.selection_key());
    ensure_loaded(context.load(Some(identity)).await)?;

    Ok(context)
}

/// Turn a failed directory query into a command error
pub fn ensure_loaded(outcome: LoadOutcome) -> anyhow::Result<()> {
    match outcome {
        LoadOutcome::Failed(error) => Err(anyhow::anyhow!("Failed to load companies: {}", error)),
        _ => Ok(()),
    }
}

pub async fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let identity = cli.identity(config)?;

    match cli.command {
        Commands::Company { cmd } => {
            let context = open_context(config, identity).await?;
            commands::company::handle(cmd, &context, output_format).await
        }
        Commands::Whoami => commands::whoami::handle(&identity, output_format),
    }
}
