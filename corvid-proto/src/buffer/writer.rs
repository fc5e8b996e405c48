use std::fmt::Display;

use super::{BytePacketBuffer, MAX_POINTER_OFFSET};
use crate::name::DomainName;

#[derive(Debug, PartialEq, Eq)]
pub enum WriterError {
    EndOfBuffer,
    LabelTooLong(usize),
}

impl Display for WriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndOfBuffer => write!(f, "writing out of buffer"),
            Self::LabelTooLong(size) => write!(f, "single label of {size} bytes too long"),
        }
    }
}

impl std::error::Error for WriterError {}

impl From<WriterError> for std::io::Error {
    fn from(value: WriterError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, value.to_string())
    }
}

impl BytePacketBuffer {
    fn set(&mut self, pos: usize, val: u8) -> Result<(), WriterError> {
        if pos >= self.buf.len() {
            return Err(WriterError::EndOfBuffer);
        }
        self.buf[pos] = val;

        Ok(())
    }

    pub fn set_u16(&mut self, pos: usize, val: u16) -> Result<(), WriterError> {
        self.set(pos, (val >> 8) as u8)?;
        self.set(pos + 1, (val & 0xFF) as u8)?;

        Ok(())
    }

    fn write(&mut self, val: u8) -> Result<(), WriterError> {
        if self.pos >= self.limit {
            return Err(WriterError::EndOfBuffer);
        }
        if self.pos == self.buf.len() {
            self.buf.push(val);
        } else {
            self.buf[self.pos] = val;
        }
        self.pos += 1;
        Ok(())
    }

    pub fn write_u8(&mut self, val: u8) -> Result<(), WriterError> {
        self.write(val)?;

        Ok(())
    }

    pub fn write_u16(&mut self, val: u16) -> Result<(), WriterError> {
        self.write((val >> 8) as u8)?;
        self.write((val & 0xFF) as u8)?;

        Ok(())
    }

    pub fn write_u32(&mut self, val: u32) -> Result<(), WriterError> {
        self.write(((val >> 24) & 0xFF) as u8)?;
        self.write(((val >> 16) & 0xFF) as u8)?;
        self.write(((val >> 8) & 0xFF) as u8)?;
        self.write((val & 0xFF) as u8)?;

        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), WriterError> {
        for byte in bytes {
            self.write(*byte)?;
        }
        Ok(())
    }

    fn write_label(&mut self, label: &str) -> Result<(), WriterError> {
        let len = label.len();
        if len > 0x3f {
            return Err(WriterError::LabelTooLong(len));
        }
        self.write_u8(len as u8)?;
        for b in label.as_bytes() {
            self.write_u8(*b)?;
        }
        Ok(())
    }

    fn recursive_write_labels(&mut self, labels: &[&str]) -> Result<bool, WriterError> {
        if labels.is_empty() {
            return Ok(false);
        }
        let key = labels.join(".").to_ascii_lowercase();
        if let Some(offset) = self.writing_labels.get(&key) {
            self.write_u16(0xC000 | (*offset as u16))?;
            Ok(true)
        } else {
            // Suffixes past the pointer range are written literally and
            // never referred to.
            if self.pos() <= MAX_POINTER_OFFSET {
                self.writing_labels.insert(key, self.pos());
            }
            self.write_label(labels[0])?;
            self.recursive_write_labels(&labels[1..])
        }
    }

    /// Write a qname, compressing any suffix that was already written
    /// earlier in the same message into a 14 bit pointer.
    pub fn write_qname(&mut self, qname: &DomainName) -> Result<(), WriterError> {
        let labels: Vec<&str> = qname.labels().collect();
        if !self.recursive_write_labels(&labels)? {
            self.write_u8(0)?;
        }

        Ok(())
    }
}
