use std::net::SocketAddr;

/// A raw message travelling through a transport, still or already
/// serialized.
#[derive(Debug, Clone)]
pub struct Message {
    pub address: SocketAddr,
    pub bytes: Vec<u8>,
}
