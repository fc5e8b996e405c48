use crate::prelude::{ResolveError, Resolver};
use corvid_proto::buffer::{BytePacketBuffer, UDP_MESSAGE_SIZE};
use corvid_proto::packet::header::{Header, ResponseCode};
use corvid_proto::packet::question::Question;
use corvid_proto::packet::record::Record;
use corvid_proto::packet::DnsPacket;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::{sleep_until, timeout_at, Duration, Instant};

const BACKOFF_STEP: Duration = Duration::from_millis(100);

/// One query/response exchange with an upstream server, bounded by the
/// deadline. Responses with a foreign id are ignored, they belong to a
/// concurrent exchange on the same socket.
pub(crate) async fn exchange(
    socket: &UdpSocket,
    server: &str,
    question: &Question,
    deadline: Instant,
) -> Result<DnsPacket, ResolveError> {
    let id: u16 = rand::random();
    let mut packet = DnsPacket::new(Header::question(id))
        .with_question(question.clone());
    packet.header.recursion_desired = true;

    let request = packet
        .create_buffer_with_limit(UDP_MESSAGE_SIZE)
        .map_err(ResolveError::network)?;
    timeout_at(deadline, socket.send_to(request.filled(), server))
        .await
        .map_err(|_| ResolveError::DeadlineExceeded)?
        .map_err(ResolveError::network)?;

    loop {
        let mut buffer = [0u8; UDP_MESSAGE_SIZE];
        let (size, _) = timeout_at(deadline, socket.recv_from(&mut buffer))
            .await
            .map_err(|_| ResolveError::DeadlineExceeded)?
            .map_err(ResolveError::network)?;

        tracing::trace!("received {size} bytes from upstream");

        let response = match DnsPacket::try_from(BytePacketBuffer::from_bytes(
            buffer[..size].to_vec(),
        )) {
            Ok(found) => found,
            Err(error) => {
                tracing::debug!("unable to parse upstream response: {error}");
                continue;
            }
        };
        if response.header.id == id && response.header.response {
            return Ok(response);
        }
    }
}

/// Sends questions to an ordered list of upstream servers over UDP,
/// retrying with a growing backoff before moving to the next server.
pub struct ForwardResolver {
    socket: UdpSocket,
    servers: Vec<String>,
    max_retries: usize,
}

impl std::fmt::Debug for ForwardResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardResolver")
            .field("servers", &self.servers)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ForwardResolver {
    /// Binds an owned socket; upstream exchanges never share socket
    /// state with other resolver instances.
    pub async fn new(
        bind: SocketAddr,
        servers: Vec<String>,
        max_retries: usize,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(bind).await?;
        Ok(Self {
            socket,
            servers,
            max_retries,
        })
    }

    async fn try_server(
        &self,
        server: &str,
        question: &Question,
        deadline: Instant,
    ) -> Result<Vec<Record>, ResolveError> {
        let mut last_error = ResolveError::NoAnswer;
        for attempt in 0..=self.max_retries {
            if Instant::now() >= deadline {
                return Err(ResolveError::DeadlineExceeded);
            }
            match exchange(&self.socket, server, question, deadline).await {
                Ok(response) => match response.header.response_code {
                    ResponseCode::NoError => return Ok(response.answers),
                    // a name error is an authoritative answer, retrying
                    // will not change it
                    ResponseCode::NameError => {
                        return Err(ResolveError::Upstream {
                            rcode: ResponseCode::NameError,
                        })
                    }
                    rcode => {
                        last_error = ResolveError::Upstream { rcode };
                    }
                },
                Err(ResolveError::DeadlineExceeded) => {
                    return Err(ResolveError::DeadlineExceeded)
                }
                Err(error) => {
                    last_error = error;
                }
            }
            if attempt < self.max_retries {
                let backoff = Instant::now() + BACKOFF_STEP * (attempt as u32 + 1);
                if backoff >= deadline {
                    return Err(ResolveError::DeadlineExceeded);
                }
                sleep_until(backoff).await;
            }
        }
        Err(last_error)
    }
}

#[async_trait::async_trait]
impl Resolver for ForwardResolver {
    fn kind(&self) -> &'static str {
        "forward"
    }

    #[tracing::instrument(skip(self, question), fields(name = %question.name))]
    async fn resolve(
        &self,
        question: &Question,
        deadline: Instant,
    ) -> Result<Vec<Record>, ResolveError> {
        let mut last_error = ResolveError::Network("no upstream server configured".into());
        for server in &self.servers {
            match self.try_server(server, question, deadline).await {
                Ok(answers) => return Ok(answers),
                Err(error) => {
                    tracing::debug!("upstream {server} failed: {error}");
                    last_error = error;
                }
            }
            if Instant::now() >= deadline {
                break;
            }
        }
        Err(last_error)
    }
}
