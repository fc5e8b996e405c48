#![no_main]

use corvid_proto::buffer::BytePacketBuffer;
use corvid_proto::packet::DnsPacket;

libfuzzer_sys::fuzz_target!(|data: &[u8]| {
    let _ = DnsPacket::try_from(BytePacketBuffer::from_bytes(data.to_vec()));
});
