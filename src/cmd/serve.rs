use super::StartupError;
use crate::config::{CacheConfig, Config, ResolverConfig, StorageConfig};
use crate::dns::{QueryHandler, Transport};
use crate::service::DnsService;
use clap::Args;
use corvid_resolver::cache::CacheResolver;
use corvid_resolver::forward::ForwardResolver;
use corvid_resolver::prelude::Resolver;
use corvid_resolver::recursive::RecursiveResolver;
use corvid_resolver::ChainResolver;
use corvid_server::{TcpServer, UdpServer};
use corvid_store::{MemoryStore, RecordStore, RecordValidator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Starts the DNS server, the core of the machine
#[derive(Args, Debug)]
pub struct Command;

fn build_store(
    config: &StorageConfig,
    validator: RecordValidator,
) -> Result<Arc<dyn RecordStore>, StartupError> {
    match config.kind.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new(validator))),
        other => Err(StartupError::UnknownStorage(other.to_string())),
    }
}

/// Assembles the resolver chain: the forwarder first, the stub recursive
/// resolver behind it, a cache in front of everything when enabled.
async fn build_resolver(
    config: &ResolverConfig,
    cache: &CacheConfig,
) -> std::io::Result<Option<Arc<dyn Resolver>>> {
    let mut builder = ChainResolver::builder();

    if !config.forward_servers.is_empty() {
        let forward = ForwardResolver::new(
            config.bind_address,
            config.forward_servers(),
            config.max_retries,
        )
        .await?;
        builder.add_link(Box::new(forward), "forward", true, config.timeout());
    }
    if !config.root_servers.is_empty() {
        let recursive = RecursiveResolver::new(config.bind_address, config.root_servers()).await?;
        builder.add_link(Box::new(recursive), "recursive", true, config.timeout());
    }

    let Ok(chain) = builder.build() else {
        return Ok(None);
    };
    let resolver: Arc<dyn Resolver> = if cache.enabled {
        Arc::new(CacheResolver::new(chain, cache.size, cache.ttl()))
    } else {
        Arc::new(chain)
    };
    Ok(Some(resolver))
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut terminate = match signal(SignalKind::terminate()) {
                Ok(terminate) => terminate,
                Err(error) => {
                    tracing::error!("unable to install signal handler: {error}");
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        tracing::info!("shutdown signal received");
        shutdown.cancel();
    });
}

impl Command {
    pub async fn run(&self, config: Config) -> Result<(), StartupError> {
        tracing::info!("preparing dns server");

        let validator = config.validation.clone().build();
        let store = build_store(&config.storage, validator)?;
        let resolver = build_resolver(&config.resolver, &config.cache)
            .await
            .map_err(StartupError::Bind)?;

        let shutdown = CancellationToken::new();
        let service = Arc::new(DnsService::new(
            store.clone(),
            resolver.clone(),
            config.server.address,
            shutdown.clone(),
        ));
        spawn_signal_listener(shutdown.clone());

        let options = config.server.options();
        let timeout = config.resolver.timeout();

        let udp = if config.server.enable_udp {
            let handler = Arc::new(QueryHandler::new(
                store.clone(),
                resolver.clone(),
                timeout,
                Transport::Udp,
            ));
            Some(
                UdpServer::bind(
                    config.server.address,
                    handler,
                    options.clone(),
                    shutdown.clone(),
                )
                .await
                .map_err(StartupError::Bind)?,
            )
        } else {
            None
        };
        let tcp = if config.server.enable_tcp {
            let handler = Arc::new(QueryHandler::new(
                store.clone(),
                resolver,
                timeout,
                Transport::Tcp,
            ));
            Some(
                TcpServer::bind(
                    config.server.address,
                    handler,
                    options.clone(),
                    shutdown.clone(),
                )
                .await
                .map_err(StartupError::Bind)?,
            )
        } else {
            None
        };
        if udp.is_none() && tcp.is_none() {
            return Err(StartupError::NoTransport);
        }

        let udp_loop = async {
            if let Some(server) = &udp {
                if let Err(error) = server.run().await {
                    tracing::error!("udp server failed: {error}");
                }
            }
        };
        let tcp_loop = async {
            if let Some(server) = &tcp {
                if let Err(error) = server.run().await {
                    tracing::error!("tcp server failed: {error}");
                }
            }
        };
        tokio::join!(udp_loop, tcp_loop);

        if let Err(error) = service.close().await {
            tracing::warn!("store did not close cleanly: {error}");
        }
        tracing::info!("shutdown complete");
        Ok(())
    }
}
