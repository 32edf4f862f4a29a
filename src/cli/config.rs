use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::gateway::AuthGateway;
use crate::guard::Bootstrapper;
use crate::session::{token_store_for, AuthController, OnboardingController, SessionStore};

/// Non-secret bits the CLI remembers between runs. The token itself lives in
/// the token store, never here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliState {
    pub last_email: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

pub fn get_config_dir(config: &ClientConfig) -> anyhow::Result<PathBuf> {
    let config_dir = match &config.config_dir {
        Some(dir) => dir.clone(),
        None => {
            let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
            PathBuf::from(home).join(".config").join("chanakya")
        }
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_cli_state(config: &ClientConfig) -> anyhow::Result<CliState> {
    let state_file = get_config_dir(config)?.join("cli.json");

    if !state_file.exists() {
        return Ok(CliState::default());
    }

    let content = fs::read_to_string(state_file)?;
    let state: CliState = serde_json::from_str(&content)?;
    Ok(state)
}

pub fn save_cli_state(config: &ClientConfig, state: &CliState) -> anyhow::Result<()> {
    let state_file = get_config_dir(config)?.join("cli.json");

    let content = serde_json::to_string_pretty(state)?;
    fs::write(state_file, content)?;
    Ok(())
}

/// Everything a command needs, wired once per invocation around one store.
pub struct Client {
    pub config: ClientConfig,
    pub store: Arc<SessionStore>,
    pub auth: AuthController,
    pub onboarding: OnboardingController,
    pub bootstrapper: Bootstrapper,
}

impl Client {
    pub fn build(config: ClientConfig) -> anyhow::Result<Self> {
        let config_dir = get_config_dir(&config)?;
        let tokens = token_store_for(config.platform, &config_dir);
        let store = Arc::new(SessionStore::new(tokens));
        let gateway = Arc::new(AuthGateway::new(&config.api)?);

        tracing::debug!(
            base_url = %gateway.base_url(),
            platform = ?config.platform,
            "client composed"
        );

        Ok(Self {
            auth: AuthController::new(gateway.clone(), store.clone(), config.validation.clone()),
            onboarding: OnboardingController::new(gateway.clone(), store.clone(), config.validation.clone()),
            bootstrapper: Bootstrapper::new(gateway, store.clone()),
            store,
            config,
        })
    }

    pub fn load_state(&self) -> anyhow::Result<CliState> {
        load_cli_state(&self.config)
    }

    pub fn save_state(&self, state: &CliState) -> anyhow::Result<()> {
        save_cli_state(&self.config, state)
    }
}
