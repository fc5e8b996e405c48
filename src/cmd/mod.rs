pub mod query;
pub mod serve;

use clap::{Parser, Subcommand};
use std::fmt::Display;
use std::path::PathBuf;

/// Authoritative DNS server with forwarding and caching
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        default_value = "/etc/corvid/corvid.toml",
        env = "CONFIG_PATH"
    )]
    config_path: PathBuf,
    #[command(subcommand)]
    inner: Commands,
}

impl Args {
    pub async fn run(self) -> Result<(), StartupError> {
        match self.inner {
            Commands::Serve(inner) => {
                let config = crate::config::Config::load(&self.config_path)?;
                inner.run(config).await
            }
            Commands::Query(inner) => inner.run().await,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    Serve(serve::Command),
    Query(query::Command),
}

#[derive(Debug)]
pub enum StartupError {
    Config(::config::ConfigError),
    UnknownStorage(String),
    NoTransport,
    Bind(std::io::Error),
    Invalid(String),
    Lookup(String),
}

impl Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "configuration invalid: {error}"),
            Self::UnknownStorage(kind) => write!(f, "unknown storage type {kind:?}"),
            Self::NoTransport => write!(f, "both transports are disabled"),
            Self::Bind(error) => write!(f, "unable to bind: {error}"),
            Self::Invalid(reason) => write!(f, "invalid request: {reason}"),
            Self::Lookup(reason) => write!(f, "lookup failed: {reason}"),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<::config::ConfigError> for StartupError {
    fn from(value: ::config::ConfigError) -> Self {
        Self::Config(value)
    }
}
