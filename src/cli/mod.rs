pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;

#[derive(Parser)]
#[command(name = "chanakya")]
#[command(about = "Chanakya CLI - sign in and onboard against the Chanakya backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Backend base URL (overrides CHANAKYA_API_URL)")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Sign in, sign out and account recovery")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Access requests, invitations and profile completion")]
    Onboarding {
        #[command(subcommand)]
        cmd: commands::onboarding::OnboardingCommands,
    },
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

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    let mut client_config: ClientConfig = crate::config::config().clone();
    if let Some(url) = cli.api_url {
        client_config.api.base_url = url;
    }
    let client = config::Client::build(client_config)?;

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &client, output_format).await,
        Commands::Onboarding { cmd } => commands::onboarding::handle(cmd, &client, output_format).await,
    }
}
