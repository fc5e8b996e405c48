use crate::prelude::Message;
use crate::{Handler, ServerOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

async fn with_deadline<T>(
    limit: Option<Duration>,
    operation: impl std::future::Future<Output = std::io::Result<T>>,
) -> std::io::Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "i/o deadline elapsed"))?,
        None => operation.await,
    }
}

/// One request per connection: a 2 byte big endian length prefix, that
/// many bytes of query, the response framed the same way, then the
/// connection closes.
async fn serve_connection<H: Handler>(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<H>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
) -> std::io::Result<()> {
    let bytes = with_deadline(read_timeout, async {
        let length = stream.read_u16().await? as usize;
        let mut bytes = vec![0u8; length];
        stream.read_exact(&mut bytes).await?;
        Ok(bytes)
    })
    .await?;

    let message = Message {
        address: peer,
        bytes,
    };
    let Some(response) = handler.handle(message).await else {
        return Ok(());
    };

    with_deadline(write_timeout, async {
        stream.write_u16(response.bytes.len() as u16).await?;
        stream.write_all(&response.bytes).await?;
        stream.shutdown().await
    })
    .await
}

pub struct TcpServer<H> {
    listener: TcpListener,
    handler: Arc<H>,
    options: ServerOptions,
    shutdown: CancellationToken,
}

impl<H: Handler> TcpServer<H> {
    /// Binds the listener right away so startup failures surface before
    /// the accept loop starts.
    pub async fn bind(
        address: SocketAddr,
        handler: Arc<H>,
        options: ServerOptions,
        shutdown: CancellationToken,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self {
            listener,
            handler,
            options,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the shutdown token fires, then waits for
    /// open connections within the grace period. Accepts are throttled by
    /// the connection cap.
    pub async fn run(&self) -> std::io::Result<()> {
        tracing::info!("tcp server listening on {:?}", self.local_addr()?);

        let limiter = Arc::new(Semaphore::new(self.options.max_connections));
        let tracker = TaskTracker::new();

        loop {
            let permit = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                permit = limiter.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                }
            };
            let (stream, peer) = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(error) => {
                        tracing::warn!("unable to accept connection: {error}");
                        continue;
                    }
                }
            };
            tracing::debug!("accepted connection from {peer:?}");

            let handler = self.handler.clone();
            let read_timeout = self.options.read_timeout;
            let write_timeout = self.options.write_timeout;
            tracker.spawn(async move {
                let _permit = permit;
                if let Err(error) =
                    serve_connection(stream, peer, handler, read_timeout, write_timeout).await
                {
                    tracing::debug!("connection from {peer:?} ended early: {error}");
                }
            });
        }

        tracker.close();
        if tokio::time::timeout(self.options.grace_period, tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!("grace period elapsed, abandoning open connections");
        }

        tracing::info!("tcp server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TcpServer;
    use crate::prelude::Message;
    use crate::{Handler, ServerOptions};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug)]
    struct EchoHandler;

    #[async_trait::async_trait]
    impl Handler for EchoHandler {
        async fn handle(&self, message: Message) -> Option<Message> {
            Some(message)
        }
    }

    #[tokio::test]
    async fn should_serve_one_framed_request_per_connection() {
        let shutdown = CancellationToken::new();
        let server = TcpServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(EchoHandler),
            ServerOptions::default(),
            shutdown.clone(),
        )
        .await
        .unwrap();
        let address = server.local_addr().unwrap();
        let task = tokio::spawn(async move { server.run().await });

        let mut client = TcpStream::connect(address).await.unwrap();
        client.write_u16(5).await.unwrap();
        client.write_all(b"hello").await.unwrap();

        let length = client.read_u16().await.unwrap() as usize;
        let mut bytes = vec![0u8; length];
        client.read_exact(&mut bytes).await.unwrap();
        assert_eq!(&bytes, b"hello");

        // the server closes after one exchange
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn should_close_idle_connection_on_read_timeout() {
        let shutdown = CancellationToken::new();
        let options = ServerOptions {
            read_timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        };
        let server = TcpServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(EchoHandler),
            options,
            shutdown.clone(),
        )
        .await
        .unwrap();
        let address = server.local_addr().unwrap();
        let task = tokio::spawn(async move { server.run().await });

        let mut client = TcpStream::connect(address).await.unwrap();
        // never send anything; the server should give up on us
        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert!(rest.is_empty());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
