use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

#[derive(Debug, PartialEq, Eq)]
pub enum NameError {
    EmptyLabel,
    NotAscii,
}

impl Display for NameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLabel => write!(f, "domain name contains an empty label"),
            Self::NotAscii => write!(f, "domain name contains non-ascii bytes"),
        }
    }
}

impl std::error::Error for NameError {}

/// A domain name as an ordered sequence of labels.
///
/// Stored in dotted form without the trailing dot, keeping the original
/// case; the root is the empty sequence. Comparison, ordering and hashing
/// are ASCII-case-insensitive ([RFC 1035](https://datatracker.ietf.org/doc/html/rfc1035#section-2.3.3)),
/// the original case is preserved on output.
#[derive(Debug, Clone, Default)]
pub struct DomainName(String);

impl DomainName {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The labels of the name, left to right; empty for the root.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|label| !label.is_empty())
    }

    pub fn label_count(&self) -> usize {
        self.labels().count()
    }

    /// Dotted form without the trailing dot, original case; empty for the root.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical form: lowercase ascii, trailing dot; `.` for the root.
    pub fn canonical(&self) -> String {
        if self.0.is_empty() {
            String::from(".")
        } else {
            let mut value = self.0.to_ascii_lowercase();
            value.push('.');
            value
        }
    }

    /// Builds a name from an already joined label sequence coming off the
    /// wire. The labels keep their original case.
    pub(crate) fn from_dotted(value: String) -> Self {
        Self(value)
    }
}

impl FromStr for DomainName {
    type Err = NameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if !value.is_ascii() {
            return Err(NameError::NotAscii);
        }
        let trimmed = value.strip_suffix('.').unwrap_or(value);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        if trimmed.split('.').any(|label| label.is_empty()) {
            return Err(NameError::EmptyLabel);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl Display for DomainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, ".")
        } else {
            write!(f, "{}.", self.0)
        }
    }
}

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for DomainName {}

impl PartialEq<str> for DomainName {
    fn eq(&self, other: &str) -> bool {
        let other = other.strip_suffix('.').unwrap_or(other);
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for DomainName {
    fn eq(&self, other: &&str) -> bool {
        self.eq(*other)
    }
}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.as_bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl PartialOrd for DomainName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DomainName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let left = self.0.bytes().map(|b| b.to_ascii_lowercase());
        let right = other.0.bytes().map(|b| b.to_ascii_lowercase());
        left.cmp(right)
    }
}
