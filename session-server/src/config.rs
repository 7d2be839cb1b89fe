//! Service configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer};
use tracing_subscriber::filter::Directive;

/// Logging output format
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Logging {
    /// Additional filtering directives
    #[serde(default, deserialize_with = "Logging::deserialize_filters")]
    pub filters: Vec<Directive>,

    /// Logging format
    #[serde(default)]
    pub format: LogFormat,
}

impl Logging {
    fn deserialize_filters<'de, D>(deserializer: D) -> Result<Vec<Directive>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let dirs: Vec<String> = Deserialize::deserialize(deserializer)?;
        dirs.into_iter()
            .map(|dir| dir.parse().map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Database backend
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Database {
    /// In-memory SQLite, migrated on startup
    Memory {
        #[serde(default = "Database::default_max_connections")]
        max_connections: u32,
    },
    /// File based SQLite
    #[serde(rename = "sqlite")]
    SqLite {
        path: PathBuf,
        #[serde(default = "Database::default_max_connections")]
        max_connections: u32,
        /// Run migrations on startup
        #[serde(default)]
        migrate: bool,
    },
}

impl Database {
    fn default_max_connections() -> u32 {
        1
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::Memory {
            max_connections: Self::default_max_connections(),
        }
    }
}

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Hashing {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for Hashing {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Auth {
    /// Lifetime of newly issued sessions
    pub session_lifetime_days: u32,

    /// Production deployment; session cookies are marked `Secure`
    pub production: bool,

    /// How often expired sessions are swept from the database. Zero disables the sweep.
    pub sweep_interval_secs: u64,

    /// Password hashing cost
    pub hashing: Hashing,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            session_lifetime_days: 7,
            production: false,
            sweep_interval_secs: 300,
            hashing: Hashing::default(),
        }
    }
}

/// Top level service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address where to host the service
    #[serde(default = "Config::default_host")]
    pub host: SocketAddr,

    /// Logging configuration
    #[serde(default)]
    pub logging: Logging,

    /// Database configuration
    #[serde(default)]
    pub db: Database,

    /// Authentication configuration
    #[serde(default)]
    pub auth: Auth,
}

impl Config {
    fn default_host() -> SocketAddr {
        ([127, 0, 0, 1], 3030).into()
    }
}
