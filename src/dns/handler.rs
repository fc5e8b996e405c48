use super::error::HandleError;
use corvid_proto::buffer::writer::WriterError;
use corvid_proto::buffer::{BytePacketBuffer, MAX_MESSAGE_SIZE, UDP_MESSAGE_SIZE};
use corvid_proto::packet::header::{Header, ResponseCode, OPCODE_STANDARD};
use corvid_proto::packet::DnsPacket;
use corvid_resolver::prelude::Resolver;
use corvid_server::prelude::Message;
use corvid_store::{RecordStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// The transport a handler serves decides how large its responses may
/// get and whether oversized answers are truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    fn limit(&self) -> usize {
        match self {
            Self::Udp => UDP_MESSAGE_SIZE,
            Self::Tcp => MAX_MESSAGE_SIZE,
        }
    }
}

/// The per-message query pipeline: authoritative store first, resolver
/// chain second, response flags derived from where the answers came from.
pub struct QueryHandler {
    store: Arc<dyn RecordStore>,
    resolver: Option<Arc<dyn Resolver>>,
    resolver_timeout: Duration,
    transport: Transport,
}

impl QueryHandler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        resolver: Option<Arc<dyn Resolver>>,
        resolver_timeout: Duration,
        transport: Transport,
    ) -> Self {
        Self {
            store,
            resolver,
            resolver_timeout,
            transport,
        }
    }

    async fn try_handle(&self, request: &DnsPacket) -> Result<DnsPacket, HandleError> {
        let mut response = DnsPacket::response_from(request);
        response.header.recursion_available = self.resolver.is_some();

        // response_from already primed NOTIMP and echoed the questions
        if request.header.opcode != OPCODE_STANDARD {
            return Ok(response);
        }

        let mut all_authoritative = true;
        for question in &request.questions {
            match self.store.get(&question.name, question.qtype).await {
                Ok(records) => {
                    response.answers.extend(records);
                    continue;
                }
                Err(StoreError::NotFound) => {}
                Err(StoreError::Closed) => return Err(HandleError::Closed),
                Err(error) => {
                    tracing::warn!("store lookup failed for {}: {error}", question.name);
                    continue;
                }
            }

            let Some(resolver) = &self.resolver else {
                continue;
            };
            let deadline = Instant::now() + self.resolver_timeout;
            match resolver.resolve(question, deadline).await {
                Ok(answers) => {
                    if !answers.is_empty() {
                        all_authoritative = false;
                    }
                    response.answers.extend(answers);
                }
                // a failing question does not fail the message
                Err(error) => {
                    tracing::warn!("skipping question {}: {error}", question.name);
                }
            }
        }

        if response.answers.is_empty() && !request.questions.is_empty() {
            response.header.response_code = ResponseCode::NameError;
        }
        response.header.authoritative_answer =
            !response.answers.is_empty() && all_authoritative;
        Ok(response)
    }

    fn encode(&self, message: &Message, mut response: DnsPacket) -> Option<Message> {
        match response.create_buffer_with_limit(self.transport.limit()) {
            Ok(buffer) => Some(Message {
                address: message.address,
                bytes: buffer.filled().to_vec(),
            }),
            Err(WriterError::EndOfBuffer) if self.transport == Transport::Udp => {
                tracing::debug!("response over {UDP_MESSAGE_SIZE} bytes, truncating");
                let mut truncated = DnsPacket::new(response.header.clone());
                truncated.header.truncated_message = true;
                truncated.questions = response.questions.clone();
                match truncated.create_buffer_with_limit(UDP_MESSAGE_SIZE) {
                    Ok(buffer) => Some(Message {
                        address: message.address,
                        bytes: buffer.filled().to_vec(),
                    }),
                    Err(error) => {
                        tracing::error!("unable to encode truncated response: {error}");
                        None
                    }
                }
            }
            Err(error) => {
                tracing::error!("unable to encode response: {error}");
                None
            }
        }
    }

    /// Header-only FORMERR reply, sent when the packet was unparseable
    /// but at least carried an id.
    fn format_error_reply(&self, message: &Message) -> Option<Message> {
        if message.bytes.len() < 2 {
            return None;
        }
        let id = u16::from_be_bytes([message.bytes[0], message.bytes[1]]);
        let reply =
            DnsPacket::new(Header::response(id).with_response_code(ResponseCode::FormatError));
        self.encode(message, reply)
    }
}

#[async_trait::async_trait]
impl corvid_server::Handler for QueryHandler {
    #[tracing::instrument(skip_all, fields(origin = ?message.address, id = tracing::field::Empty))]
    async fn handle(&self, message: Message) -> Option<Message> {
        let request = match DnsPacket::try_from(BytePacketBuffer::from_bytes(
            message.bytes.clone(),
        )) {
            Ok(found) => found,
            Err(error) => {
                tracing::debug!("unable to read packet: {error}");
                return self.format_error_reply(&message);
            }
        };

        tracing::Span::current().record("id", request.header.id);

        // the server answers queries, it does not accept responses
        if request.header.response {
            tracing::debug!("dropping inbound response packet");
            return None;
        }

        match self.try_handle(&request).await {
            Ok(response) => self.encode(&message, response),
            Err(HandleError::Closed) => {
                tracing::warn!("subsystem closed while handling the request");
                let mut response = DnsPacket::response_from(&request);
                response.header.response_code = ResponseCode::ServerFailure;
                self.encode(&message, response)
            }
        }
    }
}
