use super::QueryType;
use crate::buffer::reader::ReaderError;
use crate::buffer::writer::WriterError;
use crate::buffer::BytePacketBuffer;
use crate::name::DomainName;
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Record {
    /// A record type this server does not interpret. The rdata bytes are
    /// carried as-is and re-encoded verbatim.
    Unknown {
        domain: DomainName,
        qtype: u16,
        data: Vec<u8>,
        ttl: u32,
    }, // 0
    A {
        domain: DomainName,
        addr: Ipv4Addr,
        ttl: u32,
    }, // 1
    NS {
        domain: DomainName,
        host: DomainName,
        ttl: u32,
    }, // 2
    SOA {
        domain: DomainName,
        primary_ns: DomainName,
        mailbox: DomainName,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
        ttl: u32,
    }, // 6
    CNAME {
        domain: DomainName,
        host: DomainName,
        ttl: u32,
    }, // 5
    PTR {
        domain: DomainName,
        host: DomainName,
        ttl: u32,
    }, // 12
    MX {
        domain: DomainName,
        priority: u16,
        host: DomainName,
        ttl: u32,
    }, // 15
    TXT {
        domain: DomainName,
        content: Vec<String>,
        ttl: u32,
    }, // 16
    AAAA {
        domain: DomainName,
        addr: Ipv6Addr,
        ttl: u32,
    }, // 28
}

impl Record {
    pub fn domain(&self) -> &DomainName {
        match self {
            Self::Unknown { domain, .. }
            | Self::A { domain, .. }
            | Self::NS { domain, .. }
            | Self::SOA { domain, .. }
            | Self::CNAME { domain, .. }
            | Self::PTR { domain, .. }
            | Self::MX { domain, .. }
            | Self::TXT { domain, .. }
            | Self::AAAA { domain, .. } => domain,
        }
    }

    pub fn qtype(&self) -> QueryType {
        match self {
            Self::Unknown { qtype, .. } => QueryType::from_num(*qtype),
            Self::A { .. } => QueryType::A,
            Self::NS { .. } => QueryType::NS,
            Self::SOA { .. } => QueryType::SOA,
            Self::CNAME { .. } => QueryType::CNAME,
            Self::PTR { .. } => QueryType::PTR,
            Self::MX { .. } => QueryType::MX,
            Self::TXT { .. } => QueryType::TXT,
            Self::AAAA { .. } => QueryType::AAAA,
        }
    }

    pub fn ttl(&self) -> u32 {
        match self {
            Self::Unknown { ttl, .. }
            | Self::A { ttl, .. }
            | Self::NS { ttl, .. }
            | Self::SOA { ttl, .. }
            | Self::CNAME { ttl, .. }
            | Self::PTR { ttl, .. }
            | Self::MX { ttl, .. }
            | Self::TXT { ttl, .. }
            | Self::AAAA { ttl, .. } => *ttl,
        }
    }

    /// The same record with another time to live, used when serving
    /// cached answers.
    pub fn delayed_ttl(&self, ttl: u32) -> Self {
        let mut record = self.clone();
        match &mut record {
            Self::Unknown { ttl: value, .. }
            | Self::A { ttl: value, .. }
            | Self::NS { ttl: value, .. }
            | Self::SOA { ttl: value, .. }
            | Self::CNAME { ttl: value, .. }
            | Self::PTR { ttl: value, .. }
            | Self::MX { ttl: value, .. }
            | Self::TXT { ttl: value, .. }
            | Self::AAAA { ttl: value, .. } => *value = ttl,
        }
        record
    }

    /// Whether both records carry the same (name, type, rdata) triple,
    /// the time to live aside.
    pub fn same_data(&self, other: &Self) -> bool {
        self.delayed_ttl(0) == other.delayed_ttl(0)
    }

    /// The same record owned by another name, used when normalizing
    /// before storage.
    pub fn with_domain(&self, domain: DomainName) -> Self {
        let mut record = self.clone();
        match &mut record {
            Self::Unknown { domain: value, .. }
            | Self::A { domain: value, .. }
            | Self::NS { domain: value, .. }
            | Self::SOA { domain: value, .. }
            | Self::CNAME { domain: value, .. }
            | Self::PTR { domain: value, .. }
            | Self::MX { domain: value, .. }
            | Self::TXT { domain: value, .. }
            | Self::AAAA { domain: value, .. } => *value = domain,
        }
        record
    }

    fn class_name(&self) -> &'static str {
        "IN"
    }

    pub fn read(buffer: &mut BytePacketBuffer) -> Result<Record, ReaderError> {
        // NAME a domain name to which this resource record pertains.
        let domain = buffer.read_qname()?;

        // TYPE two octets containing one of the RR type codes.
        // This field specifies the meaning of the data in the RDATA field.
        let qtype_num = buffer.read_u16()?;
        let qtype = QueryType::from_num(qtype_num);

        // CLASS two octets which specify the class of the data in the RDATA field.
        let _qclass = buffer.read_u16()?;

        // TTL a 32 bit unsigned integer that specifies the time interval (in seconds)
        // that the resource record may be cached before it should be discarded.
        let ttl = buffer.read_u32()?;

        // RDLENGTH an unsigned 16 bit integer that specifies the length in octets of the RDATA field.
        let data_len = buffer.read_u16()?;
        let rdata_start = buffer.pos();

        let record = match qtype {
            QueryType::A => {
                let raw_addr = buffer.read_u32()?;
                let addr = Ipv4Addr::from(raw_addr);

                Record::A { domain, addr, ttl }
            }
            QueryType::AAAA => {
                let mut octets = [0u8; 16];
                for chunk in octets.chunks_exact_mut(4) {
                    chunk.copy_from_slice(&buffer.read_u32()?.to_be_bytes());
                }

                Record::AAAA {
                    domain,
                    addr: Ipv6Addr::from(octets),
                    ttl,
                }
            }
            QueryType::NS => {
                let host = buffer.read_qname()?;

                Record::NS { domain, host, ttl }
            }
            QueryType::CNAME => {
                let host = buffer.read_qname()?;

                Record::CNAME { domain, host, ttl }
            }
            QueryType::PTR => {
                let host = buffer.read_qname()?;

                Record::PTR { domain, host, ttl }
            }
            QueryType::MX => {
                let priority = buffer.read_u16()?;
                let host = buffer.read_qname()?;

                Record::MX {
                    domain,
                    priority,
                    host,
                    ttl,
                }
            }
            QueryType::TXT => {
                let mut content = Vec::new();
                while buffer.pos() < rdata_start + data_len as usize {
                    let length = buffer.read()? as usize;
                    let bytes = buffer.read_bytes(length)?;
                    content.push(String::from_utf8_lossy(&bytes).into_owned());
                }

                Record::TXT {
                    domain,
                    content,
                    ttl,
                }
            }
            QueryType::SOA => {
                let primary_ns = buffer.read_qname()?;
                let mailbox = buffer.read_qname()?;
                let serial = buffer.read_u32()?;
                let refresh = buffer.read_u32()?;
                let retry = buffer.read_u32()?;
                let expire = buffer.read_u32()?;
                let minimum = buffer.read_u32()?;

                Record::SOA {
                    domain,
                    primary_ns,
                    mailbox,
                    serial,
                    refresh,
                    retry,
                    expire,
                    minimum,
                    ttl,
                }
            }
            QueryType::Any | QueryType::Unknown(_) => {
                let data = buffer.read_bytes(data_len as usize)?;

                Record::Unknown {
                    domain,
                    qtype: qtype_num,
                    data,
                    ttl,
                }
            }
        };

        // The rdata of a compressed name may consume fewer bytes than
        // advertised; consuming more means the lengths are lying.
        let consumed = buffer.pos() - rdata_start;
        if consumed > data_len as usize {
            return Err(ReaderError::RdataOverrun {
                expected: data_len,
                consumed,
            });
        }
        buffer.seek(rdata_start + data_len as usize)?;

        Ok(record)
    }

    pub fn write(&self, buffer: &mut BytePacketBuffer) -> Result<usize, WriterError> {
        let start_pos = buffer.pos();

        match *self {
            Record::A {
                ref domain,
                ref addr,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::A.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;
                buffer.write_u16(4)?;

                buffer.write_bytes(&addr.octets())?;
            }
            Record::NS {
                ref domain,
                ref host,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::NS.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;

                let pos = buffer.pos();
                buffer.write_u16(0)?;

                buffer.write_qname(host)?;

                let size = buffer.pos() - (pos + 2);
                buffer.set_u16(pos, size as u16)?;
            }
            Record::CNAME {
                ref domain,
                ref host,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::CNAME.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;

                let pos = buffer.pos();
                buffer.write_u16(0)?;

                buffer.write_qname(host)?;

                let size = buffer.pos() - (pos + 2);
                buffer.set_u16(pos, size as u16)?;
            }
            Record::PTR {
                ref domain,
                ref host,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::PTR.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;

                let pos = buffer.pos();
                buffer.write_u16(0)?;

                buffer.write_qname(host)?;

                let size = buffer.pos() - (pos + 2);
                buffer.set_u16(pos, size as u16)?;
            }
            Record::MX {
                ref domain,
                priority,
                ref host,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::MX.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;

                let pos = buffer.pos();
                buffer.write_u16(0)?;

                buffer.write_u16(priority)?;
                buffer.write_qname(host)?;

                let size = buffer.pos() - (pos + 2);
                buffer.set_u16(pos, size as u16)?;
            }
            Record::TXT {
                ref domain,
                ref content,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::TXT.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;

                let pos = buffer.pos();
                buffer.write_u16(0)?;

                for segment in content {
                    let length = segment.len();
                    if length > 255 {
                        return Err(WriterError::LabelTooLong(length));
                    }
                    buffer.write_u8(length as u8)?;
                    buffer.write_bytes(segment.as_bytes())?;
                }

                let size = buffer.pos() - (pos + 2);
                buffer.set_u16(pos, size as u16)?;
            }
            Record::SOA {
                ref domain,
                ref primary_ns,
                ref mailbox,
                serial,
                refresh,
                retry,
                expire,
                minimum,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::SOA.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;

                let pos = buffer.pos();
                buffer.write_u16(0)?;

                buffer.write_qname(primary_ns)?;
                buffer.write_qname(mailbox)?;
                buffer.write_u32(serial)?;
                buffer.write_u32(refresh)?;
                buffer.write_u32(retry)?;
                buffer.write_u32(expire)?;
                buffer.write_u32(minimum)?;

                let size = buffer.pos() - (pos + 2);
                buffer.set_u16(pos, size as u16)?;
            }
            Record::AAAA {
                ref domain,
                ref addr,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::AAAA.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;
                buffer.write_u16(16)?;

                buffer.write_bytes(&addr.octets())?;
            }
            Record::Unknown {
                ref domain,
                qtype,
                ref data,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(qtype)?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;
                buffer.write_u16(data.len() as u16)?;
                buffer.write_bytes(data)?;
            }
        }

        Ok(buffer.pos() - start_pos)
    }
}

/// Zone-file flavoured rendition, used by the query tool output.
impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let class = self.class_name();
        match self {
            Self::A { domain, addr, ttl } => write!(f, "{domain} {ttl} {class} A {addr}"),
            Self::AAAA { domain, addr, ttl } => write!(f, "{domain} {ttl} {class} AAAA {addr}"),
            Self::NS { domain, host, ttl } => write!(f, "{domain} {ttl} {class} NS {host}"),
            Self::CNAME { domain, host, ttl } => {
                write!(f, "{domain} {ttl} {class} CNAME {host}")
            }
            Self::PTR { domain, host, ttl } => write!(f, "{domain} {ttl} {class} PTR {host}"),
            Self::MX {
                domain,
                priority,
                host,
                ttl,
            } => write!(f, "{domain} {ttl} {class} MX {priority} {host}"),
            Self::TXT {
                domain,
                content,
                ttl,
            } => {
                write!(f, "{domain} {ttl} {class} TXT")?;
                for segment in content {
                    write!(f, " {segment:?}")?;
                }
                Ok(())
            }
            Self::SOA {
                domain,
                primary_ns,
                mailbox,
                serial,
                refresh,
                retry,
                expire,
                minimum,
                ttl,
            } => write!(
                f,
                "{domain} {ttl} {class} SOA {primary_ns} {mailbox} {serial} {refresh} {retry} {expire} {minimum}"
            ),
            Self::Unknown {
                domain,
                qtype,
                data,
                ttl,
            } => write!(f, "{domain} {ttl} {class} TYPE{qtype} \\# {}", data.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Record;
    use crate::buffer::BytePacketBuffer;
    use crate::name::DomainName;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn name(value: &str) -> DomainName {
        value.parse().unwrap()
    }

    fn roundtrip(record: Record) -> Record {
        let mut buffer = BytePacketBuffer::default();
        record.write(&mut buffer).unwrap();
        let mut buffer = BytePacketBuffer::from_bytes(buffer.buf);
        Record::read(&mut buffer).unwrap()
    }

    #[test]
    fn should_roundtrip_a_record() {
        let record = Record::A {
            domain: name("www.example.com"),
            addr: Ipv4Addr::new(192, 0, 2, 1),
            ttl: 300,
        };
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_aaaa_record() {
        let record = Record::AAAA {
            domain: name("www.example.com"),
            addr: "2001:db8::1".parse::<Ipv6Addr>().unwrap(),
            ttl: 60,
        };
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_mx_record() {
        let record = Record::MX {
            domain: name("example.com"),
            priority: 10,
            host: name("mail.example.com"),
            ttl: 3600,
        };
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_ptr_record() {
        let record = Record::PTR {
            domain: name("1.2.0.192.in-addr.arpa"),
            host: name("www.example.com"),
            ttl: 120,
        };
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_txt_record() {
        let record = Record::TXT {
            domain: name("example.com"),
            content: vec!["v=spf1 -all".to_string(), "second".to_string()],
            ttl: 30,
        };
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_soa_record() {
        let record = Record::SOA {
            domain: name("example.com"),
            primary_ns: name("ns1.example.com"),
            mailbox: name("hostmaster.example.com"),
            serial: 2024010101,
            refresh: 7200,
            retry: 900,
            expire: 1209600,
            minimum: 300,
            ttl: 3600,
        };
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_carry_unknown_rdata_verbatim() {
        let record = Record::Unknown {
            domain: name("example.com"),
            qtype: 99,
            data: vec![1, 2, 3, 4, 5],
            ttl: 60,
        };
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_reject_txt_segment_over_255_bytes() {
        let record = Record::TXT {
            domain: name("example.com"),
            content: vec!["x".repeat(256)],
            ttl: 30,
        };
        let mut buffer = BytePacketBuffer::default();
        assert!(record.write(&mut buffer).is_err());
    }

    #[test]
    fn same_data_should_ignore_ttl() {
        let left = Record::A {
            domain: name("a.example.com"),
            addr: Ipv4Addr::new(10, 0, 0, 1),
            ttl: 60,
        };
        let right = left.delayed_ttl(3600);
        assert!(left.same_data(&right));
        let other = Record::A {
            domain: name("a.example.com"),
            addr: Ipv4Addr::new(10, 0, 0, 2),
            ttl: 60,
        };
        assert!(!left.same_data(&other));
    }

    #[test]
    fn display_should_render_zone_file_flavour() {
        let record = Record::MX {
            domain: name("example.com"),
            priority: 10,
            host: name("mail.example.com"),
            ttl: 3600,
        };
        assert_eq!(record.to_string(), "example.com. 3600 IN MX 10 mail.example.com.");
        let record = Record::TXT {
            domain: name("example.com"),
            content: vec!["v=spf1 -all".to_string()],
            ttl: 30,
        };
        assert_eq!(
            record.to_string(),
            "example.com. 30 IN TXT \"v=spf1 -all\""
        );
    }

    #[test]
    fn should_fail_on_lying_rdata_length() {
        let record = Record::A {
            domain: name("a.example.com"),
            addr: Ipv4Addr::new(10, 0, 0, 1),
            ttl: 60,
        };
        let mut buffer = BytePacketBuffer::default();
        record.write(&mut buffer).unwrap();
        // shrink the advertised rdata length below the 4 address bytes
        let len_pos = buffer.pos - 6;
        buffer.set_u16(len_pos, 2).unwrap();
        let mut buffer = BytePacketBuffer::from_bytes(buffer.buf);
        assert!(Record::read(&mut buffer).is_err());
    }
}
