use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub environment: Environment,
    pub platform: Platform,
    pub api: ApiConfig,
    pub validation: ValidationRules,
    pub config_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Where the client runs. Decides which token store gets composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Native,
    Web,
}

impl Platform {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "native" | "ios" | "android" | "desktop" => Some(Platform::Native),
            "web" | "browser" => Some(Platform::Web),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub enable_request_logging: bool,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Form rules applied before anything reaches the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRules {
    pub password_min_length: usize,
    pub password_require_uppercase: bool,
    pub password_require_lowercase: bool,
    pub password_require_number: bool,
    pub name_min_length: usize,
    pub verification_code_length: usize,
    pub access_reason_min_length: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            password_min_length: 8,
            password_require_uppercase: true,
            password_require_lowercase: true,
            password_require_number: true,
            name_min_length: 2,
            verification_code_length: 6,
            access_reason_min_length: 10,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    /// Config pointing at an explicit backend, used by tests and embedders.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::development();
        config.api.base_url = base_url.into();
        config
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("CHANAKYA_API_URL").or_else(|_| env::var("EXPO_PUBLIC_API_URL")) {
            if !v.trim().is_empty() {
                self.api.base_url = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("CHANAKYA_API_TIMEOUT_SECS") {
            self.api.request_timeout_secs = parse_timeout_secs(&v).unwrap_or(self.api.request_timeout_secs);
        }
        if let Ok(v) = env::var("CHANAKYA_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("CHANAKYA_PLATFORM") {
            self.platform = Platform::parse(&v).unwrap_or(self.platform);
        }
        if let Ok(v) = env::var("CHANAKYA_CONFIG_DIR") {
            self.config_dir = Some(PathBuf::from(v));
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            platform: Platform::Native,
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                request_timeout_secs: 30,
                enable_request_logging: true,
            },
            validation: ValidationRules::default(),
            config_dir: None,
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            platform: Platform::Native,
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                request_timeout_secs: 30,
                enable_request_logging: true,
            },
            validation: ValidationRules::default(),
            config_dir: None,
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            platform: Platform::Native,
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                request_timeout_secs: 30,
                enable_request_logging: false,
            },
            validation: ValidationRules::default(),
            config_dir: None,
        }
    }
}

/// A zero timeout would fail every request before it is sent.
fn parse_timeout_secs(value: &str) -> Option<u64> {
    value.trim().parse().ok().filter(|secs| *secs > 0)
}

// Global config for the binary; library types take a ClientConfig explicitly
pub static CONFIG: Lazy<ClientConfig> = Lazy::new(ClientConfig::from_env);

pub fn config() -> &'static ClientConfig {
    &CONFIG
}
