//! Application configuration
//!
//! Configuration is assembled with the `config` crate from built-in defaults,
//! optional `config/*` files and environment variables. Everything the engine
//! needs to reach the switch (host, port, user, password) comes from here.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::fmt;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ami: AmiConfig,
    #[serde(default)]
    pub spam: SpamConfig,
}

/// HTTP server configuration (admission API)
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Asterisk Manager Interface session configuration
///
/// There is no reconnect delay setting; the connector uses a fixed one.
#[derive(Deserialize, Clone)]
pub struct AmiConfig {
    /// Switch hostname or IP
    pub host: String,

    /// Manager port
    #[serde(default = "default_ami_port")]
    pub port: u16,

    /// Manager user (`[user]` section in manager.conf)
    pub username: String,

    /// Manager secret
    pub password: String,

    /// Identifier stamped on every call record produced by this connection
    pub server_id: Option<String>,
}

fn default_ami_port() -> u16 {
    5038
}

impl AmiConfig {
    /// `host:port` dial address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configured server id, falling back to the dial address
    pub fn server_id(&self) -> String {
        self.server_id.clone().unwrap_or_else(|| self.address())
    }
}

impl fmt::Debug for AmiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server_id", &self.server_id)
            .finish()
    }
}

/// Spam screening configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SpamConfig {
    /// Offset of the gateway's local time from UTC, in minutes, used by the
    /// off-hours heuristic. None = the host's local offset.
    pub utc_offset_minutes: Option<i32>,

    /// Lifetime of auto-detected blacklist entries in hours
    #[serde(default = "default_auto_blacklist_hours")]
    pub auto_blacklist_hours: i64,
}

fn default_auto_blacklist_hours() -> i64 {
    24
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: None,
            auto_blacklist_hours: default_auto_blacklist_hours(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        tracing::debug!("Loading configuration for run mode {}", run_mode);

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 9000)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 10)?
            .set_default("ami.port", 5038)?
            .set_default("spam.auto_blacklist_hours", 24)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with GSMGW_ prefix
            .add_source(
                Environment::with_prefix("GSMGW")
                    .separator("__")
                    .try_parsing(true),
            )
            // Support flat legacy environment variables
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("ami.host", env::var("AMI_HOST").ok())?
            .set_override_option("ami.port", env::var("AMI_PORT").ok())?
            .set_override_option("ami.username", env::var("AMI_USERNAME").ok())?
            .set_override_option("ami.password", env::var("AMI_PASSWORD").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// Get the HTTP bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
