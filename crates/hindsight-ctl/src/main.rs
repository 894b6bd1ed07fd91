// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hindsight Ctl - Deployment Command Line
//!
//! - `synth` / `order`: render the declared stacks and their provisioning order
//! - `db-url` / `enable-extension` / `llm-key`: run one bootstrap function on
//!   a provisioning event read from a file or stdin
//! - `reflect`: run the scheduled reflect job once
//!
//! Command output goes to stdout as JSON; logs go to stderr.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use hindsight_bootstrap::extension::DatabaseConnector;
use hindsight_bootstrap::{
    DbUrlPopulator, ExtensionEnabler, LlmKeyPopulator, ProvisioningEvent, ReflectConfig,
    ReflectJob, ReflectResponse, SecretStore,
};
use hindsight_stack::{AppSettings, DeployParams, Stack, Tier, TierTable, synthesize_all};

const DEFAULT_LOG_FILTER: &str = "hindsight_ctl=info,hindsight_bootstrap=info,hindsight_stack=info";

#[derive(Parser, Debug)]
#[command(
    name = "hindsight-ctl",
    version,
    about = "Deploy and operate the Hindsight memory service"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the synthesized stack(s) as JSON
    Synth {
        /// Only this tier (default: every tier)
        #[arg(long)]
        tier: Option<Tier>,

        /// LLM API key; the output references it as `${param.LlmApiKey}` and
        /// marks the parameter as supplied
        #[arg(long, env = "HINDSIGHT_LLM_API_KEY", hide_env_values = true)]
        llm_api_key: Option<String>,
    },

    /// Print the provisioning order of a tier, one resource per line
    Order {
        /// Tier to order
        #[arg(long)]
        tier: Tier,
    },

    /// Populate the database connection URL secret
    DbUrl(EventArgs),

    /// Enable the vector extension in the application database
    EnableExtension(EventArgs),

    /// Populate the LLM API key secret
    LlmKey(EventArgs),

    /// Run the reflect job once
    Reflect,
}

#[derive(Args, Debug)]
struct EventArgs {
    /// Provisioning event file (default: read stdin)
    #[arg(long)]
    event: Option<PathBuf>,
}

impl EventArgs {
    fn read(&self) -> anyhow::Result<ProvisioningEvent> {
        let json = match &self.event {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("reading event from {}", path.display()))?,
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("reading event from stdin")?;
                buf
            }
        };
        Ok(ProvisioningEvent::from_json(&json)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let dotenv = dotenvy::dotenv();

    init_tracing();

    if let Err(e) = dotenv {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Synth { tier, llm_api_key } => {
            let params = DeployParams { llm_api_key };
            synth(tier, &params)?;
        }
        Command::Order { tier } => {
            let (settings, table) = load_settings()?;
            let stack = Stack::synthesize(table.get(tier)?, &settings, &DeployParams::default())?;
            for resource in stack.provisioning_order()? {
                println!("{}", resource);
            }
        }
        Command::DbUrl(args) => {
            let event = args.read()?;
            let populator = DbUrlPopulator::new(secret_store().await?);
            print_json(&populator.handle(&event).await?)?;
        }
        Command::EnableExtension(args) => {
            let event = args.read()?;
            let enabler = ExtensionEnabler::new(secret_store().await?, database_connector());
            print_json(&enabler.handle(&event).await?)?;
        }
        Command::LlmKey(args) => {
            let event = args.read()?;
            let populator = LlmKeyPopulator::new(secret_store().await?);
            print_json(&populator.handle(&event).await?)?;
        }
        Command::Reflect => {
            let response = match ReflectConfig::from_env() {
                Ok(config) => {
                    info!(endpoint = %config.endpoint(), "Starting reflect job");
                    ReflectResponse::from(ReflectJob::new(config)?.run().await)
                }
                Err(e) => {
                    warn!(error = %e, "Reflect job is not configured");
                    ReflectResponse::config_error(&e)
                }
            };
            print_json(&response)?;
            if !response.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let json = std::env::var("HINDSIGHT_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_settings() -> anyhow::Result<(AppSettings, TierTable)> {
    let settings = AppSettings::from_env()?;
    let table = TierTable::standard().with_region(&settings.region);
    Ok((settings, table))
}

fn synth(tier: Option<Tier>, params: &DeployParams) -> anyhow::Result<()> {
    let (settings, table) = load_settings()?;

    match tier {
        Some(tier) => {
            let stack = Stack::synthesize(table.get(tier)?, &settings, params)?;
            println!("{}", stack.to_json()?);
        }
        None => {
            let stacks = synthesize_all(&table, &settings, params)?;
            println!("{}", serde_json::to_string_pretty(&stacks)?);
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(feature = "aws")]
async fn secret_store() -> anyhow::Result<Arc<dyn SecretStore>> {
    Ok(Arc::new(
        hindsight_bootstrap::secrets::AwsSecretStore::from_env().await,
    ))
}

#[cfg(not(feature = "aws"))]
async fn secret_store() -> anyhow::Result<Arc<dyn SecretStore>> {
    anyhow::bail!("hindsight-ctl was built without the `aws` feature; no secret store is available")
}

#[cfg(feature = "postgres")]
fn database_connector() -> Option<Arc<dyn DatabaseConnector>> {
    Some(Arc::new(hindsight_bootstrap::extension::PgConnector::new()))
}

#[cfg(not(feature = "postgres"))]
fn database_connector() -> Option<Arc<dyn DatabaseConnector>> {
    None
}
