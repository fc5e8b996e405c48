use crate::buffer::reader::ReaderError;
use crate::buffer::writer::WriterError;
use crate::buffer::BytePacketBuffer;

/// OPCODE values for a standard query, an inverse query and a server
/// status request. Everything else is reserved.
pub const OPCODE_STANDARD: u8 = 0;
pub const OPCODE_INVERSE: u8 = 1;
pub const OPCODE_STATUS: u8 = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseCode {
    /// No error condition
    NoError = 0,
    /// Format error - The name server was unable to interpret the query.
    FormatError = 1,
    /// Server failure - The name server was unable to process this query due to a problem with the name server.
    ServerFailure = 2,
    /// Name Error - Meaningful only for responses from an authoritative name server,
    /// this code signifies that the domain name referenced in the query does not exist.
    /// Previously named NXDOMAIN
    NameError = 3,
    /// Not Implemented - The name server does not support the requested kind of query.
    NotImplemented = 4,
    /// Refused - The name server refuses to perform the specified operation for policy reasons.
    Refused = 5,
}

impl TryFrom<u8> for ResponseCode {
    type Error = ReaderError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResponseCode::NoError),
            1 => Ok(ResponseCode::FormatError),
            2 => Ok(ResponseCode::ServerFailure),
            3 => Ok(ResponseCode::NameError),
            4 => Ok(ResponseCode::NotImplemented),
            5 => Ok(ResponseCode::Refused),
            other => Err(ReaderError::InvalidResponseCode(other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// A 16 bit identifier assigned by the program that
    /// generates any kind of query.  This identifier is copied
    /// the corresponding reply and can be used by the requester
    /// to match up replies to outstanding queries.
    pub id: u16, // 16 bits

    /// RD Recursion Desired - this bit may be set in a query and is copied into the response.
    /// If RD is set, it directs the name server to pursue the query recursively.
    /// Recursive query support is optional.
    pub recursion_desired: bool, // 1 bit
    /// TC TrunCation - specifies that this message was truncated due to length greater
    /// than that permitted on the transmission channel.
    pub truncated_message: bool, // 1 bit
    /// AA Authoritative Answer - this bit is valid in responses,
    /// and specifies that the responding name server is an authority
    /// for the domain name in question section.
    pub authoritative_answer: bool, // 1 bit
    /// OPCODE A four bit field that specifies kind of query in this message.
    /// This value is set by the originator of a query and copied into the response.
    /// The values are:
    ///   0               a standard query (QUERY)
    ///   1               an inverse query (IQUERY)
    ///   2               a server status request (STATUS)
    ///   3-15            reserved for future use
    pub opcode: u8, // 4 bits
    /// QR A one bit field that specifies whether this message is a query (0), or a response (1).
    pub response: bool, // 1 bit

    /// Response code - this 4 bit field is set as part of responses.
    /// Assigning it replaces the whole field, the low four bits of the
    /// flags word are never OR-ed into a previous value.
    pub response_code: ResponseCode, // 4 bits
    pub checking_disabled: bool, // 1 bit
    pub authed_data: bool,       // 1 bit
    /// Z Reserved for future use. Echoed into responses together with the
    /// two bits above it.
    pub z: bool, // 1 bit
    /// RA Recursion Available - this bit is set or cleared in a response,
    /// and denotes whether recursive query support is available in the name server.
    pub recursion_available: bool, // 1 bit
}

impl Header {
    pub fn question(id: u16) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn response(id: u16) -> Self {
        Self {
            id,
            response: true,
            ..Default::default()
        }
    }

    /// Response header for a request: QR set, OPCODE and RD copied, the
    /// reserved bits echoed, RCODE primed from the opcode.
    pub fn response_from(request: &Self) -> Self {
        Self {
            id: request.id,
            recursion_desired: request.recursion_desired,
            truncated_message: false,
            authoritative_answer: false,
            opcode: request.opcode,
            response: true,
            response_code: if request.opcode == OPCODE_STANDARD {
                ResponseCode::NoError
            } else {
                ResponseCode::NotImplemented
            },
            checking_disabled: request.checking_disabled,
            authed_data: request.authed_data,
            z: request.z,
            recursion_available: false,
        }
    }

    pub fn with_response_code(mut self, value: ResponseCode) -> Self {
        self.response_code = value;
        self
    }
}

impl Default for Header {
    fn default() -> Self {
        Self {
            id: 0,

            recursion_desired: false,
            truncated_message: false,
            authoritative_answer: false,
            opcode: 0,
            response: false,

            response_code: ResponseCode::NoError,
            checking_disabled: false,
            authed_data: false,
            z: false,
            recursion_available: false,
        }
    }
}

impl Header {
    /// Reads the first 4 bytes
    pub fn read(buffer: &mut BytePacketBuffer) -> Result<Self, ReaderError> {
        let id = buffer.read_u16()?;

        let head = buffer.read()?;
        let tail = buffer.read()?;

        Ok(Self {
            id,
            recursion_desired: (head & (1 << 0)) > 0,
            truncated_message: (head & (1 << 1)) > 0,
            authoritative_answer: (head & (1 << 2)) > 0,
            opcode: (head >> 3) & 0x0F,
            response: (head & (1 << 7)) > 0,
            response_code: ResponseCode::try_from(tail & 0x0F)?,
            checking_disabled: (tail & (1 << 4)) > 0,
            authed_data: (tail & (1 << 5)) > 0,
            z: (tail & (1 << 6)) > 0,
            recursion_available: (tail & (1 << 7)) > 0,
        })
    }

    pub fn write(&self, buffer: &mut BytePacketBuffer) -> Result<(), WriterError> {
        buffer.write_u16(self.id)?;

        buffer.write_u8(
            (self.recursion_desired as u8)
                | ((self.truncated_message as u8) << 1)
                | ((self.authoritative_answer as u8) << 2)
                | (self.opcode << 3)
                | ((self.response as u8) << 7),
        )?;

        buffer.write_u8(
            (self.response_code as u8)
                | ((self.checking_disabled as u8) << 4)
                | ((self.authed_data as u8) << 5)
                | ((self.z as u8) << 6)
                | ((self.recursion_available as u8) << 7),
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Header, ResponseCode, OPCODE_INVERSE};
    use crate::buffer::BytePacketBuffer;

    #[test]
    fn should_roundtrip_header_flags() {
        let header = Header {
            id: 4660,
            recursion_desired: true,
            truncated_message: false,
            authoritative_answer: true,
            opcode: 2,
            response: true,
            response_code: ResponseCode::Refused,
            checking_disabled: true,
            authed_data: false,
            z: true,
            recursion_available: true,
        };
        let mut buffer = BytePacketBuffer::default();
        header.write(&mut buffer).unwrap();
        let mut buffer = BytePacketBuffer::from_bytes(buffer.buf);
        let read = Header::read(&mut buffer).unwrap();
        assert_eq!(read, header);
    }

    #[test]
    fn response_from_should_echo_request_bits() {
        let mut request = Header::question(99);
        request.recursion_desired = true;
        request.z = true;
        request.checking_disabled = true;
        let response = Header::response_from(&request);
        assert!(response.response);
        assert!(response.recursion_desired);
        assert!(response.z);
        assert!(response.checking_disabled);
        assert_eq!(response.response_code, ResponseCode::NoError);
    }

    #[test]
    fn response_from_should_flag_unsupported_opcode() {
        let mut request = Header::question(7);
        request.opcode = OPCODE_INVERSE;
        let response = Header::response_from(&request);
        assert_eq!(response.opcode, OPCODE_INVERSE);
        assert_eq!(response.response_code, ResponseCode::NotImplemented);
    }

    #[test]
    fn setting_response_code_should_replace_previous_value() {
        // a dirty RCODE must be replaced, not OR-ed into
        let header = Header::response(1)
            .with_response_code(ResponseCode::Refused)
            .with_response_code(ResponseCode::NameError);
        assert_eq!(header.response_code, ResponseCode::NameError);
        let mut buffer = BytePacketBuffer::default();
        header.write(&mut buffer).unwrap();
        assert_eq!(buffer.buf[3] & 0x0F, 3);
    }
}
