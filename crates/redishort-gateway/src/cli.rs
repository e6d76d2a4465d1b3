use clap::{Parser, ValueEnum};
use redishort_generator::Disambiguator;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "REDISHORT_LISTEN_ADDR";
pub const PUBLIC_BASE_URL_ENV: &str = "REDISHORT_PUBLIC_BASE_URL";
pub const CACHE_LIMIT_ENV: &str = "REDISHORT_CACHE_LIMIT";
pub const STORAGE_BACKEND_ENV: &str = "REDISHORT_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "REDISHORT_MYSQL_DSN";
pub const VISIT_TIMEOUT_MS_ENV: &str = "REDISHORT_VISIT_TIMEOUT_MS";
pub const DISAMBIGUATOR_ENV: &str = "REDISHORT_DISAMBIGUATOR";
pub const LOG_JSON_ENV: &str = "REDISHORT_LOG_JSON";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_CACHE_LIMIT: &str = "1000";
pub const DEFAULT_VISIT_TIMEOUT_MS: &str = "2000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DisambiguatorArg {
    Counter,
    Random,
}

impl From<DisambiguatorArg> for Disambiguator {
    fn from(value: DisambiguatorArg) -> Self {
        match value {
            DisambiguatorArg::Counter => Disambiguator::Counter,
            DisambiguatorArg::Random => Disambiguator::Random,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "redishort-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Base URL short links are served under.
    #[arg(long, env = PUBLIC_BASE_URL_ENV, default_value = DEFAULT_PUBLIC_BASE_URL)]
    pub public_base_url: String,

    /// Maximum number of links kept in the scored cache.
    #[arg(long, env = CACHE_LIMIT_ENV, default_value = DEFAULT_CACHE_LIMIT)]
    pub cache_limit: usize,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Upper bound for a background visit increment, in milliseconds.
    #[arg(long, env = VISIT_TIMEOUT_MS_ENV, default_value = DEFAULT_VISIT_TIMEOUT_MS)]
    pub visit_timeout_ms: u64,

    #[arg(
        long,
        env = DISAMBIGUATOR_ENV,
        value_enum,
        default_value_t = DisambiguatorArg::Counter
    )]
    pub disambiguator: DisambiguatorArg,

    /// Emit logs as JSON lines.
    #[arg(long, env = LOG_JSON_ENV)]
    pub log_json: bool,
}
