use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock, time::Duration};
use url::Url;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core settings (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Companion microservice settings (see `service` table in config.toml).
    #[serde(default)]
    pub service: ServiceConfig,

    /// Twitch sign-in flow settings (see `auth` table in config.toml).
    #[serde(default)]
    pub auth: AuthConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and `config.toml` if present.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml): {err}")
        })
    }
}

/// Basic (core) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Database URL for SQLite.
    /// TOML: `basic.database_url`. Default: `sqlite://charades.db`.
    #[serde(default)]
    pub database_url: String,

    /// Log level for tracing subscriber initialization
    /// (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default)]
    pub loglevel: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://charades.db".to_string(),
            loglevel: "info".to_string(),
        }
    }
}

/// Companion microservice configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Base URL of the companion microservice; the health probe hits
    /// `{base_url}/health`.
    /// TOML: `service.base_url`. Default: `http://localhost:3000`.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Maximum boot health-check attempts before giving up.
    /// TOML: `service.health_max_attempts`. Default: `10`.
    #[serde(default = "default_health_max_attempts")]
    pub health_max_attempts: u32,

    /// Fixed delay between health-check attempts, in milliseconds.
    /// The boot check targets a co-located service, so there is no backoff.
    /// TOML: `service.health_retry_delay_ms`. Default: `2000`.
    #[serde(default = "default_health_retry_delay_ms")]
    pub health_retry_delay_ms: u64,
}

impl ServiceConfig {
    pub fn health_retry_delay(&self) -> Duration {
        Duration::from_millis(self.health_retry_delay_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            health_max_attempts: default_health_max_attempts(),
            health_retry_delay_ms: default_health_retry_delay_ms(),
        }
    }
}

/// Twitch sign-in flow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Login URL the sign-in window is pointed at.
    /// TOML: `auth.login_url`. Default: `http://localhost:3000/auth/login`.
    #[serde(default = "default_login_url")]
    pub login_url: Url,

    /// Callback URL prefix; a page load under this prefix is where the
    /// token payload is read from.
    /// TOML: `auth.callback_prefix`. Default: `http://localhost:3000/auth/callback`.
    #[serde(default = "default_callback_prefix")]
    pub callback_prefix: Url,

    /// Overall deadline for one sign-in attempt, in seconds.
    /// TOML: `auth.sign_in_timeout_secs`. Default: `300`.
    #[serde(default = "default_sign_in_timeout_secs")]
    pub sign_in_timeout_secs: u64,
}

impl AuthConfig {
    pub fn sign_in_timeout(&self) -> Duration {
        Duration::from_secs(self.sign_in_timeout_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            callback_prefix: default_callback_prefix(),
            sign_in_timeout_secs: default_sign_in_timeout_secs(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse("http://localhost:3000").expect("default base_url is valid")
}

fn default_login_url() -> Url {
    Url::parse("http://localhost:3000/auth/login").expect("default login_url is valid")
}

fn default_callback_prefix() -> Url {
    Url::parse("http://localhost:3000/auth/callback").expect("default callback_prefix is valid")
}

fn default_health_max_attempts() -> u32 {
    10
}

fn default_health_retry_delay_ms() -> u64 {
    2000
}

fn default_sign_in_timeout_secs() -> u64 {
    300
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_optional_toml);
