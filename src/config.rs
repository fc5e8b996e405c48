use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub validation: corvid_store::validator::Config,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ::config::ConfigError> {
        let conf = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(::config::Environment::default().separator("_"))
            .build()?;
        conf.try_deserialize()
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_address")]
    pub address: SocketAddr,
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
    #[serde(default)]
    pub write_timeout_ms: Option<u64>,
    #[serde(default = "ServerConfig::default_enabled")]
    pub enable_udp: bool,
    #[serde(default = "ServerConfig::default_enabled")]
    pub enable_tcp: bool,
    #[serde(default = "ServerConfig::default_max_connections")]
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: Self::default_address(),
            read_timeout_ms: None,
            write_timeout_ms: None,
            enable_udp: Self::default_enabled(),
            enable_tcp: Self::default_enabled(),
            max_connections: Self::default_max_connections(),
        }
    }
}

impl ServerConfig {
    fn default_address() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 53))
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_max_connections() -> usize {
        128
    }

    pub fn options(&self) -> corvid_server::ServerOptions {
        corvid_server::ServerOptions {
            max_connections: self.max_connections,
            read_timeout: self.read_timeout_ms.map(Duration::from_millis),
            write_timeout: self.write_timeout_ms.map(Duration::from_millis),
            ..Default::default()
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ResolverConfig {
    /// Local address the outbound resolver sockets bind to.
    #[serde(default = "ResolverConfig::default_bind_address")]
    pub bind_address: SocketAddr,
    #[serde(default = "ResolverConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Additional attempts per upstream after the first one.
    #[serde(default = "ResolverConfig::default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "ResolverConfig::default_forward_servers")]
    pub forward_servers: Vec<String>,
    /// Consumed by the stub recursive resolver only.
    #[serde(default)]
    pub root_servers: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            bind_address: Self::default_bind_address(),
            timeout_ms: Self::default_timeout_ms(),
            max_retries: Self::default_max_retries(),
            forward_servers: Self::default_forward_servers(),
            root_servers: Vec::new(),
        }
    }
}

impl ResolverConfig {
    fn default_bind_address() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 0))
    }

    fn default_timeout_ms() -> u64 {
        5000
    }

    fn default_max_retries() -> usize {
        2
    }

    fn default_forward_servers() -> Vec<String> {
        vec!["1.1.1.1".to_string(), "1.0.0.1".to_string()]
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured upstreams with the default port filled in.
    pub fn forward_servers(&self) -> Vec<String> {
        Self::with_default_port(&self.forward_servers)
    }

    pub fn root_servers(&self) -> Vec<String> {
        Self::with_default_port(&self.root_servers)
    }

    fn with_default_port(servers: &[String]) -> Vec<String> {
        servers
            .iter()
            .map(|server| {
                if server.contains(':') {
                    server.clone()
                } else {
                    format!("{server}:53")
                }
            })
            .collect()
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "CacheConfig::default_size")]
    pub size: u64,
    #[serde(default = "CacheConfig::default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            size: Self::default_size(),
            ttl_secs: Self::default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_size() -> u64 {
        1000
    }

    fn default_ttl_secs() -> u64 {
        300
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type", default = "StorageConfig::default_kind")]
    pub kind: String,
    /// Backend specific connection string, unused by the memory store.
    #[serde(default)]
    pub dsn: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: Self::default_kind(),
            dsn: String::new(),
        }
    }
}

impl StorageConfig {
    fn default_kind() -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ResolverConfig};

    #[test]
    fn defaults_should_be_sensible() {
        let config = Config::default();
        assert!(config.server.enable_udp);
        assert!(config.server.enable_tcp);
        assert_eq!(config.server.address.port(), 53);
        assert!(config.cache.enabled);
        assert_eq!(config.storage.kind, "memory");
    }

    #[test]
    fn forward_servers_should_gain_default_port() {
        let config = ResolverConfig {
            forward_servers: vec!["1.1.1.1".into(), "9.9.9.9:5353".into()],
            ..Default::default()
        };
        assert_eq!(
            config.forward_servers(),
            vec!["1.1.1.1:53".to_string(), "9.9.9.9:5353".to_string()]
        );
    }
}
