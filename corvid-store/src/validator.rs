use crate::StoreError;
use corvid_proto::name::DomainName;
use corvid_proto::packet::record::Record;
use corvid_proto::packet::QueryType;
use std::collections::HashSet;

/// Longest dotted name the store accepts, trailing dot excluded.
const MAX_NAME_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;
const MAX_TXT_SEGMENT: usize = 255;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub allow_underscore: bool,
    #[serde(default = "Config::default_min_ttl")]
    pub min_ttl: u32,
    #[serde(default = "Config::default_max_ttl")]
    pub max_ttl: u32,
    /// Record type mnemonics the store accepts; empty means every type.
    #[serde(default)]
    pub allowed_types: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allow_underscore: false,
            min_ttl: Self::default_min_ttl(),
            max_ttl: Self::default_max_ttl(),
            allowed_types: Vec::new(),
        }
    }
}

impl Config {
    pub fn default_enabled() -> bool {
        true
    }

    pub fn default_min_ttl() -> u32 {
        0
    }

    /// a week
    pub fn default_max_ttl() -> u32 {
        604_800
    }
}

impl Config {
    pub fn build(self) -> RecordValidator {
        RecordValidator {
            enabled: self.enabled,
            allow_underscore: self.allow_underscore,
            min_ttl: self.min_ttl,
            max_ttl: self.max_ttl,
            allowed_types: if self.allowed_types.is_empty() {
                None
            } else {
                Some(
                    self.allowed_types
                        .iter()
                        .filter_map(|name| QueryType::from_name(name))
                        .map(QueryType::into_num)
                        .collect(),
                )
            },
        }
    }
}

/// Syntactic validation of names, time to live values and record
/// specific data, applied on every store write.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    enabled: bool,
    allow_underscore: bool,
    min_ttl: u32,
    max_ttl: u32,
    allowed_types: Option<HashSet<u16>>,
}

impl Default for RecordValidator {
    fn default() -> Self {
        Config::default().build()
    }
}

impl RecordValidator {
    /// A validator accepting anything that can be normalized.
    pub fn disabled() -> Self {
        Config {
            enabled: false,
            ..Default::default()
        }
        .build()
    }

    fn is_letter_digit(byte: u8) -> bool {
        byte.is_ascii_alphanumeric()
    }

    fn is_label_byte(&self, byte: u8) -> bool {
        Self::is_letter_digit(byte) || byte == b'-' || (self.allow_underscore && byte == b'_')
    }

    fn is_valid_label(&self, label: &str) -> bool {
        // a wildcard is only allowed as a whole label
        if label == "*" {
            return true;
        }
        if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
            return false;
        }
        let bytes = label.as_bytes();
        if bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-' {
            return false;
        }
        bytes.iter().copied().all(|byte| self.is_label_byte(byte))
    }

    pub fn validate_name(&self, name: &DomainName) -> Result<(), StoreError> {
        let value = name.as_str();
        if value.len() > MAX_NAME_LENGTH {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        if !name.labels().all(|label| self.is_valid_label(label)) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    fn validate_ttl(&self, ttl: u32) -> Result<(), StoreError> {
        if ttl < self.min_ttl || ttl > self.max_ttl {
            return Err(StoreError::InvalidTtl {
                ttl,
                min: self.min_ttl,
                max: self.max_ttl,
            });
        }
        Ok(())
    }

    pub fn validate(&self, record: &Record) -> Result<(), StoreError> {
        if !self.enabled {
            return Ok(());
        }

        if let Some(allowed) = &self.allowed_types {
            let qtype = record.qtype().into_num();
            if !allowed.contains(&qtype) {
                return Err(StoreError::InvalidRecord(format!(
                    "record type {} is not allowed",
                    record.qtype().as_name()
                )));
            }
        }

        self.validate_name(record.domain())?;
        self.validate_ttl(record.ttl())?;

        match record {
            Record::A { .. } | Record::AAAA { .. } => {
                // the address shape is enforced by the type
            }
            Record::NS { host, .. } | Record::CNAME { host, .. } | Record::PTR { host, .. } => {
                self.validate_name(host)?;
            }
            Record::MX { host, .. } => {
                self.validate_name(host)?;
            }
            Record::SOA {
                primary_ns,
                mailbox,
                serial,
                ..
            } => {
                self.validate_name(primary_ns)?;
                if mailbox.label_count() < 2 {
                    return Err(StoreError::InvalidRecord(
                        "soa responsible mailbox must contain a dot".into(),
                    ));
                }
                if *serial == 0 {
                    return Err(StoreError::InvalidRecord("soa serial must be positive".into()));
                }
            }
            Record::TXT { content, .. } => {
                if let Some(segment) = content.iter().find(|item| item.len() > MAX_TXT_SEGMENT) {
                    return Err(StoreError::InvalidRecord(format!(
                        "txt segment of {} bytes too long",
                        segment.len()
                    )));
                }
            }
            Record::Unknown { .. } => {
                // opaque rdata is carried as-is
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, RecordValidator};
    use crate::StoreError;
    use corvid_proto::name::DomainName;
    use corvid_proto::packet::record::Record;
    use std::net::Ipv4Addr;

    fn name(value: &str) -> DomainName {
        value.parse().unwrap()
    }

    fn a_record(domain: &str, ttl: u32) -> Record {
        Record::A {
            domain: name(domain),
            addr: Ipv4Addr::new(192, 0, 2, 1),
            ttl,
        }
    }

    #[test]
    fn should_accept_plain_record() {
        let validator = RecordValidator::default();
        assert!(validator.validate(&a_record("www.example.com", 300)).is_ok());
    }

    #[test]
    fn should_accept_63_byte_label_and_reject_64() {
        let validator = RecordValidator::default();
        let good = format!("{}.example.com", "a".repeat(63));
        assert!(validator.validate(&a_record(&good, 300)).is_ok());
        let bad = format!("{}.example.com", "a".repeat(64));
        assert!(matches!(
            validator.validate(&a_record(&bad, 300)),
            Err(StoreError::InvalidName(_))
        ));
    }

    #[test]
    fn should_accept_253_byte_name_and_reject_254() {
        let validator = RecordValidator::default();
        // 4 x 62 + 3 dots = 251, adding ".x" lands on 253
        let good = format!(
            "{}.{}.{}.{}.x",
            "a".repeat(62),
            "b".repeat(62),
            "c".repeat(62),
            "d".repeat(62)
        );
        assert_eq!(good.len(), 253);
        assert!(validator.validate(&a_record(&good, 300)).is_ok());
        let bad = format!(
            "{}.{}.{}.{}.xy",
            "a".repeat(62),
            "b".repeat(62),
            "c".repeat(62),
            "d".repeat(62)
        );
        assert_eq!(bad.len(), 254);
        assert!(validator.validate(&a_record(&bad, 300)).is_err());
    }

    #[test]
    fn should_reject_leading_or_trailing_hyphen() {
        let validator = RecordValidator::default();
        assert!(validator.validate(&a_record("-www.example.com", 300)).is_err());
        assert!(validator.validate(&a_record("www-.example.com", 300)).is_err());
        assert!(validator.validate(&a_record("w-w.example.com", 300)).is_ok());
    }

    #[test]
    fn should_gate_underscore_behind_config() {
        let strict = RecordValidator::default();
        assert!(strict.validate(&a_record("_sip.example.com", 300)).is_err());
        let relaxed = Config {
            allow_underscore: true,
            ..Default::default()
        }
        .build();
        assert!(relaxed.validate(&a_record("_sip.example.com", 300)).is_ok());
    }

    #[test]
    fn should_accept_wildcard_only_as_whole_label() {
        let validator = RecordValidator::default();
        assert!(validator.validate(&a_record("*.example.com", 300)).is_ok());
        assert!(validator.validate(&a_record("w*w.example.com", 300)).is_err());
    }

    #[test]
    fn should_enforce_ttl_bounds() {
        let validator = Config {
            min_ttl: 60,
            max_ttl: 3600,
            ..Default::default()
        }
        .build();
        assert!(validator.validate(&a_record("www.example.com", 59)).is_err());
        assert!(validator.validate(&a_record("www.example.com", 60)).is_ok());
        assert!(validator.validate(&a_record("www.example.com", 3600)).is_ok());
        assert!(validator.validate(&a_record("www.example.com", 3601)).is_err());
    }

    #[test]
    fn should_validate_soa_specifics() {
        let validator = RecordValidator::default();
        let soa = Record::SOA {
            domain: name("example.com"),
            primary_ns: name("ns1.example.com"),
            mailbox: name("hostmaster.example.com"),
            serial: 1,
            refresh: 7200,
            retry: 900,
            expire: 1209600,
            minimum: 300,
            ttl: 3600,
        };
        assert!(validator.validate(&soa).is_ok());

        let bad_serial = match soa.clone() {
            Record::SOA {
                domain,
                primary_ns,
                mailbox,
                refresh,
                retry,
                expire,
                minimum,
                ttl,
                ..
            } => Record::SOA {
                domain,
                primary_ns,
                mailbox,
                serial: 0,
                refresh,
                retry,
                expire,
                minimum,
                ttl,
            },
            _ => unreachable!(),
        };
        assert!(validator.validate(&bad_serial).is_err());

        let bad_mailbox = match soa {
            Record::SOA {
                domain,
                primary_ns,
                serial,
                refresh,
                retry,
                expire,
                minimum,
                ttl,
                ..
            } => Record::SOA {
                domain,
                primary_ns,
                mailbox: name("hostmaster"),
                serial,
                refresh,
                retry,
                expire,
                minimum,
                ttl,
            },
            _ => unreachable!(),
        };
        assert!(validator.validate(&bad_mailbox).is_err());
    }

    #[test]
    fn should_reject_oversized_txt_segment() {
        let validator = RecordValidator::default();
        let record = Record::TXT {
            domain: name("example.com"),
            content: vec!["x".repeat(256)],
            ttl: 60,
        };
        assert!(validator.validate(&record).is_err());
    }

    #[test]
    fn should_gate_types_when_configured() {
        let validator = Config {
            allowed_types: vec!["A".into(), "AAAA".into()],
            ..Default::default()
        }
        .build();
        assert!(validator.validate(&a_record("www.example.com", 300)).is_ok());
        let mx = Record::MX {
            domain: name("example.com"),
            priority: 10,
            host: name("mail.example.com"),
            ttl: 300,
        };
        assert!(matches!(
            validator.validate(&mx),
            Err(StoreError::InvalidRecord(_))
        ));
    }

    #[test]
    fn disabled_validator_should_accept_anything() {
        let validator = RecordValidator::disabled();
        assert!(validator.validate(&a_record("w*w.-bad-.example.com", 999_999_999)).is_ok());
    }
}
