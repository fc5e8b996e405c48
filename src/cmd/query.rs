use super::StartupError;
use clap::Args;
use corvid_proto::buffer::BytePacketBuffer;
use corvid_proto::packet::header::{Header, ResponseCode};
use corvid_proto::packet::question::Question;
use corvid_proto::packet::{DnsPacket, QueryType};
use rand::random;
use std::time::Duration;
use tokio::net::UdpSocket;

/// Sends a single question to a server and prints the answers
#[derive(Args, Debug)]
pub struct Command {
    /// Domain to query
    domain: String,
    /// Record type to ask for
    #[arg(short, long, default_value = "A")]
    qtype: String,
    /// Server to address
    #[arg(short, long, default_value = "127.0.0.1:53")]
    server: String,
    /// Give up after that many milliseconds
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
}

impl Command {
    pub async fn run(&self) -> Result<(), StartupError> {
        let name = self
            .domain
            .parse()
            .map_err(|_| StartupError::Invalid(format!("not a domain name: {}", self.domain)))?;
        let qtype = QueryType::from_name(&self.qtype)
            .ok_or_else(|| StartupError::Invalid(format!("unknown record type: {}", self.qtype)))?;

        let mut query = DnsPacket::new(Header::question(random()))
            .with_question(Question::new(name, qtype));
        query.header.recursion_desired = true;
        let request = query
            .create_buffer()
            .map_err(|error| StartupError::Invalid(error.to_string()))?;

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(StartupError::Bind)?;
        socket
            .send_to(request.filled(), self.server.as_str())
            .await
            .map_err(StartupError::Bind)?;

        let mut buffer = [0u8; 4096];
        let receive = socket.recv_from(&mut buffer);
        let (size, _) = tokio::time::timeout(Duration::from_millis(self.timeout_ms), receive)
            .await
            .map_err(|_| {
                StartupError::Lookup(format!("no answer from {} in time", self.server))
            })?
            .map_err(StartupError::Bind)?;

        let response = DnsPacket::try_from(BytePacketBuffer::from_bytes(
            buffer[..size].to_vec(),
        ))
        .map_err(|error| StartupError::Lookup(error.to_string()))?;

        println!(
            "; id {} rcode {:?} answers {}",
            response.header.id,
            response.header.response_code,
            response.answers.len()
        );
        for record in &response.answers {
            println!("{record}");
        }
        for record in &response.authorities {
            println!("; authority: {record}");
        }

        if response.header.response_code != ResponseCode::NoError {
            return Err(StartupError::Lookup(format!(
                "server answered with {:?}",
                response.header.response_code
            )));
        }
        Ok(())
    }
}
