use crate::prelude::Message;
use async_stream::stream;
use futures_core::stream::Stream;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

/// Covers common EDNS datagram sizes even though EDNS options are not
/// processed.
const READ_BUFFER_SIZE: usize = 4096;

#[derive(Debug)]
pub struct Receiver {
    socket: Arc<UdpSocket>,
}

impl Receiver {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }

    async fn receive(&self) -> std::io::Result<Message> {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let (size, address) = self.socket.recv_from(&mut buffer).await?;
        Ok(Message {
            address,
            bytes: buffer[..size].to_vec(),
        })
    }

    /// Turns the socket into a stream of messages that ends when the
    /// shutdown token fires. Receive failures do not end the stream.
    pub fn into_stream(self, shutdown: CancellationToken) -> impl Stream<Item = Message> {
        stream! {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    received = self.receive() => match received {
                        Ok(message) => {
                            tracing::debug!("received message from {:?}", message.address);
                            yield message;
                        }
                        Err(error) => {
                            tracing::warn!("unable to receive datagram: {error}");
                        }
                    }
                }
            }
        }
    }
}
