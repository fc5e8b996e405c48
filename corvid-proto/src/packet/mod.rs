pub mod header;
pub mod question;
pub mod record;

use crate::buffer::reader::ReaderError;
use crate::buffer::writer::WriterError;
use crate::buffer::{BytePacketBuffer, MAX_MESSAGE_SIZE};

#[derive(PartialEq, Eq, Debug, Clone, Hash, Copy)]
#[allow(clippy::upper_case_acronyms)]
pub enum QueryType {
    Unknown(u16),
    /// matches every type of a stored name; never written to the wire
    Any, // 0
    /// a host address
    A, // 1
    /// an authoritative name server
    NS, // 2
    /// the canonical name for an alias
    CNAME, // 5
    /// marks the start of a zone of authority
    SOA, // 6
    /// a domain name pointer
    PTR, // 12
    /// mail exchange
    MX, // 15
    /// text strings
    TXT, // 16
    AAAA, // 28
}

impl QueryType {
    pub fn into_num(self) -> u16 {
        match self {
            QueryType::Unknown(x) => x,
            QueryType::Any => 0,
            QueryType::A => 1,
            QueryType::NS => 2,
            QueryType::CNAME => 5,
            QueryType::SOA => 6,
            QueryType::PTR => 12,
            QueryType::MX => 15,
            QueryType::TXT => 16,
            QueryType::AAAA => 28,
        }
    }

    pub fn from_num(num: u16) -> QueryType {
        match num {
            0 => QueryType::Any,
            1 => QueryType::A,
            2 => QueryType::NS,
            5 => QueryType::CNAME,
            6 => QueryType::SOA,
            12 => QueryType::PTR,
            15 => QueryType::MX,
            16 => QueryType::TXT,
            28 => QueryType::AAAA,
            _ => QueryType::Unknown(num),
        }
    }

    /// The mnemonic, used by the configuration and the management surface.
    pub fn as_name(&self) -> &'static str {
        match self {
            QueryType::Unknown(_) => "UNKNOWN",
            QueryType::Any => "ANY",
            QueryType::A => "A",
            QueryType::NS => "NS",
            QueryType::CNAME => "CNAME",
            QueryType::SOA => "SOA",
            QueryType::PTR => "PTR",
            QueryType::MX => "MX",
            QueryType::TXT => "TXT",
            QueryType::AAAA => "AAAA",
        }
    }

    pub fn from_name(name: &str) -> Option<QueryType> {
        match name.to_ascii_uppercase().as_str() {
            "ANY" => Some(QueryType::Any),
            "A" => Some(QueryType::A),
            "NS" => Some(QueryType::NS),
            "CNAME" => Some(QueryType::CNAME),
            "SOA" => Some(QueryType::SOA),
            "PTR" => Some(QueryType::PTR),
            "MX" => Some(QueryType::MX),
            "TXT" => Some(QueryType::TXT),
            "AAAA" => Some(QueryType::AAAA),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DnsPacket {
    pub header: header::Header,
    pub questions: Vec<question::Question>,
    pub answers: Vec<record::Record>,
    pub authorities: Vec<record::Record>,
    pub resources: Vec<record::Record>,
}

impl DnsPacket {
    pub fn new(header: header::Header) -> Self {
        Self {
            header,
            ..Default::default()
        }
    }

    /// An empty response echoing the request the way `PrepareResponseFlags`
    /// demands: QR set, OPCODE and RD copied, reserved bits echoed, RCODE
    /// primed from the opcode.
    pub fn response_from(request: &Self) -> Self {
        Self {
            header: header::Header::response_from(&request.header),
            questions: request.questions.clone(),
            ..Default::default()
        }
    }

    pub fn with_question(mut self, question: question::Question) -> Self {
        self.questions.push(question);
        self
    }

    pub fn with_answer(mut self, record: record::Record) -> Self {
        self.answers.push(record);
        self
    }

    pub fn with_answers(mut self, records: Vec<record::Record>) -> Self {
        self.answers.extend(records);
        self
    }

    pub fn with_authority(mut self, record: record::Record) -> Self {
        self.authorities.push(record);
        self
    }

    pub fn with_resource(mut self, record: record::Record) -> Self {
        self.resources.push(record);
        self
    }
}

impl TryFrom<BytePacketBuffer> for DnsPacket {
    type Error = ReaderError;

    fn try_from(mut buffer: BytePacketBuffer) -> Result<Self, Self::Error> {
        let header = header::Header::read(&mut buffer)?;

        let question_count = buffer.read_u16()? as usize;
        let answer_count = buffer.read_u16()? as usize;
        let authority_count = buffer.read_u16()? as usize;
        let resource_count = buffer.read_u16()? as usize;

        let mut questions = Vec::with_capacity(question_count);
        for _ in 0..question_count {
            questions.push(question::Question::read(&mut buffer)?);
        }

        let mut answers = Vec::with_capacity(answer_count);
        for _ in 0..answer_count {
            answers.push(record::Record::read(&mut buffer)?);
        }

        let mut authorities = Vec::with_capacity(authority_count);
        for _ in 0..authority_count {
            authorities.push(record::Record::read(&mut buffer)?);
        }

        let mut resources = Vec::with_capacity(resource_count);
        for _ in 0..resource_count {
            resources.push(record::Record::read(&mut buffer)?);
        }

        Ok(DnsPacket {
            header,
            questions,
            answers,
            authorities,
            resources,
        })
    }
}

impl DnsPacket {
    /// Serializes the packet into a fresh buffer bounded by `limit`,
    /// fixing the section counts beforehand.
    pub fn create_buffer_with_limit(
        &mut self,
        limit: usize,
    ) -> Result<BytePacketBuffer, WriterError> {
        let mut buffer = BytePacketBuffer::with_limit(limit);

        self.header.write(&mut buffer)?;
        buffer.write_u16(self.questions.len() as u16)?;
        buffer.write_u16(self.answers.len() as u16)?;
        buffer.write_u16(self.authorities.len() as u16)?;
        buffer.write_u16(self.resources.len() as u16)?;

        for question in &self.questions {
            question.write(&mut buffer)?;
        }
        for rec in &self.answers {
            rec.write(&mut buffer)?;
        }
        for rec in &self.authorities {
            rec.write(&mut buffer)?;
        }
        for rec in &self.resources {
            rec.write(&mut buffer)?;
        }

        Ok(buffer)
    }

    pub fn create_buffer(&mut self) -> Result<BytePacketBuffer, WriterError> {
        self.create_buffer_with_limit(MAX_MESSAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::question::Question;
    use super::record::Record;
    use super::{header::Header, DnsPacket, QueryType};
    use crate::buffer::BytePacketBuffer;
    use std::net::Ipv4Addr;

    #[test]
    fn querytype_should_roundtrip_numbers() {
        for num in [0u16, 1, 2, 5, 6, 12, 15, 16, 28, 99] {
            assert_eq!(QueryType::from_num(num).into_num(), num);
        }
    }

    #[test]
    fn querytype_should_parse_names() {
        assert_eq!(QueryType::from_name("aaaa"), Some(QueryType::AAAA));
        assert_eq!(QueryType::from_name("Mx"), Some(QueryType::MX));
        assert_eq!(QueryType::from_name("SPF"), None);
    }

    #[test]
    fn should_compress_shared_suffixes_across_sections() {
        let mut packet = DnsPacket::new(Header::question(1))
            .with_question(Question::new("a.example.com".parse().unwrap(), QueryType::A))
            .with_question(Question::new("b.example.com".parse().unwrap(), QueryType::A))
            .with_question(Question::new("c.example.com".parse().unwrap(), QueryType::A));
        let compressed = packet.create_buffer().unwrap();

        // an uncompressed rendition writes each name in full
        let uncompressed_len = 12
            + 3 * ("a.example.com".len() + 2 + 4);
        assert!(compressed.pos < uncompressed_len);

        let parsed =
            DnsPacket::try_from(BytePacketBuffer::from_bytes(compressed.buf[..compressed.pos].to_vec()))
                .unwrap();
        assert_eq!(parsed.questions, packet.questions);
    }

    #[test]
    fn should_decode_own_encoding_with_rdata_names_compressed() {
        let mut packet = DnsPacket::new(Header::response(5))
            .with_question(Question::new(
                "www.example.com".parse().unwrap(),
                QueryType::CNAME,
            ))
            .with_answer(Record::CNAME {
                domain: "www.example.com".parse().unwrap(),
                host: "host.example.com".parse().unwrap(),
                ttl: 60,
            })
            .with_answer(Record::A {
                domain: "host.example.com".parse().unwrap(),
                addr: Ipv4Addr::new(192, 0, 2, 7),
                ttl: 60,
            });
        let buffer = packet.create_buffer().unwrap();
        let parsed =
            DnsPacket::try_from(BytePacketBuffer::from_bytes(buffer.buf[..buffer.pos].to_vec()))
                .unwrap();
        assert_eq!(parsed.answers, packet.answers);
    }

    #[test]
    fn counts_should_match_sections() {
        let mut packet = DnsPacket::new(Header::response(3)).with_answer(Record::A {
            domain: "x.example.com".parse().unwrap(),
            addr: Ipv4Addr::new(127, 0, 0, 1),
            ttl: 1,
        });
        let buffer = packet.create_buffer().unwrap();
        // qdcount 0, ancount 1
        assert_eq!(buffer.buf[4], 0);
        assert_eq!(buffer.buf[5], 0);
        assert_eq!(buffer.buf[6], 0);
        assert_eq!(buffer.buf[7], 1);
    }
}
