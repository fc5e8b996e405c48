use futures::stream::StreamExt;
use prelude::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

pub mod prelude;
pub mod receiver;
pub mod sender;
pub mod tcp;

pub use tcp::TcpServer;

/// Produces at most one response for an inbound message; `None` drops it.
#[async_trait::async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, message: Message) -> Option<Message>;
}

/// Transport-level knobs shared by both server loops.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Cap on concurrent in-flight requests (UDP) and open connections
    /// (TCP); work beyond it waits in the kernel queues.
    pub max_connections: usize,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    /// How long in-flight tasks may keep running after shutdown.
    pub grace_period: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_connections: 128,
            read_timeout: None,
            write_timeout: None,
            grace_period: Duration::from_secs(5),
        }
    }
}

pub struct UdpServer<H> {
    socket: Arc<UdpSocket>,
    handler: Arc<H>,
    options: ServerOptions,
    shutdown: CancellationToken,
}

impl<H: Handler> UdpServer<H> {
    /// Binds the socket right away so startup failures surface before
    /// the serve loop starts.
    pub async fn bind(
        address: SocketAddr,
        handler: Arc<H>,
        options: ServerOptions,
        shutdown: CancellationToken,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(address).await?;
        Ok(Self {
            socket: Arc::new(socket),
            handler,
            options,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serves datagrams until the shutdown token fires, then drains the
    /// in-flight handlers within the grace period.
    pub async fn run(&self) -> std::io::Result<()> {
        tracing::info!("udp server listening on {:?}", self.local_addr()?);

        let receiver = receiver::Receiver::new(self.socket.clone());
        let sender = sender::Sender::new(self.socket.clone());

        let stream = receiver
            .into_stream(self.shutdown.clone())
            .map(|item| async { self.handler.handle(item).await })
            .buffer_unordered(self.options.max_connections);

        tokio::pin!(stream);

        let drain = async {
            while let Some(item) = stream.next().await {
                let Some(response) = item else { continue };
                if let Err(error) = sender.send(&response).await {
                    tracing::error!("couldn't send message to {:?}: {error:?}", response.address);
                }
            }
        };
        let expired = async {
            self.shutdown.cancelled().await;
            tokio::time::sleep(self.options.grace_period).await;
        };
        tokio::select! {
            _ = drain => {}
            _ = expired => {
                tracing::warn!("grace period elapsed, abandoning in-flight requests");
            }
        }

        tracing::info!("udp server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Handler, ServerOptions, UdpServer};
    use crate::prelude::Message;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::UdpSocket;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug)]
    struct EchoHandler;

    #[async_trait::async_trait]
    impl Handler for EchoHandler {
        async fn handle(&self, message: Message) -> Option<Message> {
            if message.bytes.is_empty() {
                return None;
            }
            Some(message)
        }
    }

    #[tokio::test]
    async fn should_echo_datagrams_and_stop_on_cancel() {
        let shutdown = CancellationToken::new();
        let server = UdpServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(EchoHandler),
            ServerOptions::default(),
            shutdown.clone(),
        )
        .await
        .unwrap();
        let address = server.local_addr().unwrap();
        let task = tokio::spawn(async move { server.run().await });

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"hello", address).await.unwrap();
        let mut buffer = [0u8; 16];
        let (size, _) = tokio::time::timeout(
            Duration::from_secs(2),
            client.recv_from(&mut buffer),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(&buffer[..size], b"hello");

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
