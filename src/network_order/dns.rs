//! Wire codec for the DNS structures. Decoding handles name compression;
//! encoding always emits uncompressed names.
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Result};

use crate::error::{DnsError, ProbeResult};
use crate::network_order::{FromNetworkOrder, ToNetworkOrder};
use crate::rfc1035::{
    DnsHeader, DnsMessage, DnsQuestion, DnsResourceRecord, DomainName, MAX_DOMAIN_NAME_LENGTH,
};
use crate::util::is_pointer;

// ceiling on chained compression pointers; the backward-only rule already
// guarantees termination, this bounds pathological but legal chains
const MAX_POINTER_JUMPS: u32 = 127;

// bytes left between the cursor position and the end of the buffer
fn remaining(buffer: &Cursor<&[u8]>) -> usize {
    let len = buffer.get_ref().len();
    len.saturating_sub(buffer.position() as usize)
}

impl ToNetworkOrder for DnsHeader {
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        buffer.write_u16::<BigEndian>(self.id)?;
        buffer.write_u16::<BigEndian>(self.flags)?;
        buffer.write_u16::<BigEndian>(self.qd_count)?;
        buffer.write_u16::<BigEndian>(self.an_count)?;
        buffer.write_u16::<BigEndian>(self.ns_count)?;
        buffer.write_u16::<BigEndian>(self.ar_count)?;
        Ok(12)
    }
}

impl FromNetworkOrder for DnsHeader {
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&[u8]>) -> ProbeResult<()> {
        if remaining(buffer) < 12 {
            return Err(DnsError::Truncated.into());
        }

        self.id = buffer.read_u16::<BigEndian>()?;
        self.flags = buffer.read_u16::<BigEndian>()?;
        self.qd_count = buffer.read_u16::<BigEndian>()?;
        self.an_count = buffer.read_u16::<BigEndian>()?;
        self.ns_count = buffer.read_u16::<BigEndian>()?;
        self.ar_count = buffer.read_u16::<BigEndian>()?;
        Ok(())
    }
}

impl ToNetworkOrder for DomainName {
    /// ```
    /// use probelib::rfc1035::DomainName;
    /// use probelib::network_order::ToNetworkOrder;
    ///
    /// let dn = DomainName::try_from("www.google.ie").unwrap();
    /// let mut buffer: Vec<u8> = Vec::new();
    ///
    /// assert_eq!(dn.to_network_bytes(&mut buffer).unwrap(), 15);
    /// assert_eq!(&buffer, &[
    ///     0x03, 0x77, 0x77, 0x77, 0x06, 0x67, 0x6f, 0x6f, 0x67, 0x6c, 0x65, 0x02, 0x69, 0x65, 0x00,
    /// ]);
    /// ```
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let mut length = 0usize;

        for label in &self.0 {
            // one wire byte per char
            let raw: Vec<u8> = label.chars().map(|c| c as u8).collect();

            // write length first, then the label bytes
            buffer.write_u8(raw.len() as u8)?;
            buffer.extend_from_slice(&raw);

            length += raw.len() + 1;
        }

        // add sentinel 0x00
        buffer.write_u8(0)?;

        Ok(length + 1)
    }
}

impl FromNetworkOrder for DomainName {
    /// Decode a name starting at the cursor position.
    ///
    /// From RFC1035, a domain name in a message is either a sequence of labels
    /// ending in a zero octet, a pointer, or a sequence of labels ending with a
    /// pointer. The pointer takes the form of a two octet sequence:
    ///
    /// ```text
    /// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    /// | 1  1|                OFFSET                   |
    /// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    /// ```
    ///
    /// The OFFSET field specifies an offset from the start of the message.
    /// Only backward offsets are accepted here, which makes pointer cycles
    /// impossible.
    ///
    /// On return the cursor has advanced past the wire bytes the name occupies
    /// at its original position, not past any pointer targets.
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&[u8]>) -> ProbeResult<()> {
        let bytes: &[u8] = *buffer.get_ref();
        let n = bytes.len();
        let mut cursor = buffer.position() as usize;

        // frozen on the first jump: the outer advance only covers the bytes
        // consumed at the original position
        let mut advance_cursor = 0usize;
        let mut advanced = false;
        let mut jumps = 0u32;
        let mut dotted_len = 0usize;

        self.0.clear();

        loop {
            if cursor >= n {
                return Err(DnsError::Truncated.into());
            }

            let length = bytes[cursor];

            // we reached the sentinel
            if length == 0 {
                let end = if advanced { advance_cursor } else { cursor + 1 };
                buffer.set_position(end as u64);
                return Ok(());
            }

            // we reached a pointer
            if is_pointer(length) {
                if cursor + 2 > n {
                    return Err(DnsError::Truncated.into());
                }
                let target = ((length as usize & 0x3F) << 8) | bytes[cursor + 1] as usize;

                // backward only
                if target >= cursor {
                    return Err(DnsError::MalformedName.into());
                }

                if !advanced {
                    advance_cursor = cursor + 2;
                    advanced = true;
                }

                jumps += 1;
                if jumps > MAX_POINTER_JUMPS {
                    return Err(DnsError::MalformedName.into());
                }

                cursor = target;
                continue;
            }

            // the 01 and 10 label types are reserved for future use
            if length & 0b1100_0000 != 0 {
                return Err(DnsError::Reserved.into());
            }

            // otherwise, regular processing: the first byte is the label length
            let size = length as usize;
            if cursor + 1 + size > n {
                return Err(DnsError::Truncated.into());
            }

            dotted_len += if self.0.is_empty() { size } else { size + 1 };
            if dotted_len > MAX_DOMAIN_NAME_LENGTH {
                return Err(DnsError::MalformedName.into());
            }

            // labels are opaque bytes; widen each one so nothing is lost
            let label: String = bytes[cursor + 1..cursor + 1 + size]
                .iter()
                .map(|&b| b as char)
                .collect();
            self.0.push(label);

            // adjust index
            cursor += 1 + size;
        }
    }
}

impl ToNetworkOrder for DnsQuestion {
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let mut length = self.name.to_network_bytes(buffer)?;
        buffer.write_u16::<BigEndian>(self.qtype)?;
        buffer.write_u16::<BigEndian>(self.qclass)?;
        length += 4;
        Ok(length)
    }
}

impl FromNetworkOrder for DnsQuestion {
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&[u8]>) -> ProbeResult<()> {
        self.name.from_network_bytes(buffer)?;

        if remaining(buffer) < 4 {
            return Err(DnsError::Truncated.into());
        }
        self.qtype = buffer.read_u16::<BigEndian>()?;
        self.qclass = buffer.read_u16::<BigEndian>()?;
        Ok(())
    }
}

impl ToNetworkOrder for DnsResourceRecord {
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let mut length = self.name.to_network_bytes(buffer)?;
        buffer.write_u16::<BigEndian>(self.r#type)?;
        buffer.write_u16::<BigEndian>(self.class)?;
        buffer.write_u32::<BigEndian>(self.ttl)?;
        buffer.write_u16::<BigEndian>(self.rd_length())?;
        buffer.extend_from_slice(&self.rdata);
        length += 10 + self.rdata.len();
        Ok(length)
    }
}

impl FromNetworkOrder for DnsResourceRecord {
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&[u8]>) -> ProbeResult<()> {
        self.name.from_network_bytes(buffer)?;

        // fixed part: type, class, ttl, rdlength
        if remaining(buffer) < 10 {
            return Err(DnsError::Truncated.into());
        }
        self.r#type = buffer.read_u16::<BigEndian>()?;
        self.class = buffer.read_u16::<BigEndian>()?;
        self.ttl = buffer.read_u32::<BigEndian>()?;
        let rd_length = buffer.read_u16::<BigEndian>()? as usize;

        // then exactly rdlength bytes of opaque rdata
        if remaining(buffer) < rd_length {
            return Err(DnsError::Truncated.into());
        }
        let mut rdata = vec![0u8; rd_length];
        buffer.read_exact(&mut rdata)?;
        self.rdata = rdata;

        Ok(())
    }
}

impl ToNetworkOrder for DnsMessage {
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let mut length = self.header.to_network_bytes(buffer)?;
        for question in &self.questions {
            length += question.to_network_bytes(buffer)?;
        }
        for rr in self
            .answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.additionals)
        {
            length += rr.to_network_bytes(buffer)?;
        }
        Ok(length)
    }
}

impl FromNetworkOrder for DnsMessage {
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&[u8]>) -> ProbeResult<()> {
        self.header.from_network_bytes(buffer)?;

        self.questions = Vec::with_capacity(self.header.qd_count as usize);
        for _ in 0..self.header.qd_count {
            let mut question = DnsQuestion::default();
            question.from_network_bytes(buffer)?;
            self.questions.push(question);
        }

        // answer, authority and additional records follow in that order
        for (count, section) in [
            (self.header.an_count, &mut self.answers),
            (self.header.ns_count, &mut self.authorities),
            (self.header.ar_count, &mut self.additionals),
        ] {
            section.clear();
            for _ in 0..count {
                let mut rr = DnsResourceRecord::default();
                rr.from_network_bytes(buffer)?;
                section.push(rr);
            }
        }

        // trailing bytes after the last record are not an error: some
        // transports pad
        Ok(())
    }
}

impl DnsMessage {
    /// Decode a single UDP/TCP payload. Pure: no I/O, no shared state.
    pub fn from_bytes(bytes: &[u8]) -> ProbeResult<DnsMessage> {
        let mut buffer = Cursor::new(bytes);
        let mut message = DnsMessage::default();
        message.from_network_bytes(&mut buffer)?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::util::get_sample_slice;
    use crate::{test_from_network, test_to_network};

    // header only: id 0x1234, flags 0x8180, all counts zero
    const HEADER_ONLY: &str = r#"
0000   12 34 81 80 00 00 00 00 00 00 00 00
"#;

    // A query + compressed answer for example.com
    const A_RESPONSE: &str = r#"
0000   00 01 81 80 00 01 00 01 00 00 00 00                  ; header: qd=1 an=1
000c   07 65 78 61 6d 70 6c 65 03 63 6f 6d 00 00 01 00 01   ; question: example.com A IN
001d   c0 0c 00 01 00 01 00 00 00 3c 00 04 5d b8 d8 22      ; answer: ptr to 12, TTL 60, 93.184.216.34
"#;

    // sample taken from real data using wireshark; both answer names point
    // back at the question name
    const POINTER_CHAIN: &str = r#"
0000   76 86 81 a0 00 01 00 02 00 00 00 00 02 68 6b 00
0010   00 02 00 01 c0 0c 00 02 00 01 00 00 54 60 00 0e
0020   01 7a 05 68 6b 69 72 63 03 6e 65 74 c0 0c c0 0c
0030   00 02 00 01 00 00 54 60 00 04 01 64 c0 22
"#;

    fn decode_message(sample: &str) -> DnsMessage {
        let bytes = get_sample_slice(sample);
        DnsMessage::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn header_only_message() {
        let message = decode_message(HEADER_ONLY);

        assert_eq!(message.header.id, 0x1234);
        assert_eq!(message.header.flags, 0x8180);
        assert_eq!(message.header.qd_count, 0);
        assert_eq!(message.header.an_count, 0);
        assert_eq!(message.header.ns_count, 0);
        assert_eq!(message.header.ar_count, 0);
        assert!(message.questions.is_empty());
        assert!(message.answers.is_empty());
        assert!(message.authorities.is_empty());
        assert!(message.additionals.is_empty());
    }

    #[test]
    fn header_too_short() {
        let bytes = get_sample_slice(HEADER_ONLY);
        let err = DnsMessage::from_bytes(&bytes[..11]).unwrap_err();
        assert!(matches!(err, ProbeError::Dns(DnsError::Truncated)));
    }

    #[test]
    fn a_record_with_compression() {
        let message = decode_message(A_RESPONSE);

        assert_eq!(message.questions.len(), 1);
        let question = &message.questions[0];
        assert_eq!(question.name.to_string(), "example.com");
        assert_eq!(question.qtype, 1);
        assert_eq!(question.qclass, 1);

        assert_eq!(message.answers.len(), 1);
        let answer = &message.answers[0];
        assert_eq!(answer.name.to_string(), "example.com");
        assert_eq!(answer.r#type, 1);
        assert_eq!(answer.class, 1);
        assert_eq!(answer.ttl, 60);
        assert_eq!(answer.rdata, &[0x5D, 0xB8, 0xD8, 0x22]);
        assert_eq!(answer.rd_length(), 4);
    }

    #[test]
    fn pointer_chains_resolve_backwards() {
        let message = decode_message(POINTER_CHAIN);

        assert_eq!(message.questions[0].name.to_string(), "hk");
        assert_eq!(message.answers.len(), 2);
        assert_eq!(message.answers[0].name.to_string(), "hk");
        // pointers inside rdata stay opaque at this layer
        assert_eq!(message.answers[1].name.to_string(), "hk");
        assert_eq!(message.answers[1].rdata, &[0x01, 0x64, 0xC0, 0x22]);
    }

    #[test]
    fn name_advance_freezes_on_first_jump() {
        let bytes = get_sample_slice(A_RESPONSE);
        let mut buffer = Cursor::new(bytes.as_slice());
        buffer.set_position(0x1d);

        let mut dn = DomainName::default();
        dn.from_network_bytes(&mut buffer).unwrap();

        assert_eq!(dn.to_string(), "example.com");
        // a compressed name occupies exactly 2 wire bytes at its position
        assert_eq!(buffer.position(), 0x1f);
    }

    #[test]
    fn uncompressed_name_advances_past_sentinel() {
        let bytes = get_sample_slice(A_RESPONSE);
        let mut buffer = Cursor::new(bytes.as_slice());
        buffer.set_position(12);

        let mut dn = DomainName::default();
        dn.from_network_bytes(&mut buffer).unwrap();

        assert_eq!(dn.0, &["example", "com"]);
        assert_eq!(buffer.position(), 25);
    }

    #[test]
    fn forward_pointer_is_malformed() {
        // first name is a pointer at offset 12 targeting offset 16 (forward)
        let sample = r#"
0000   00 01 01 80 00 01 00 00 00 00 00 00
000c   c0 10 00 01 00 01
"#;
        let bytes = get_sample_slice(sample);
        let err = DnsMessage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ProbeError::Dns(DnsError::MalformedName)));
    }

    #[test]
    fn self_pointer_is_malformed() {
        let sample = r#"
0000   00 01 01 80 00 01 00 00 00 00 00 00
000c   c0 0c 00 01 00 01
"#;
        let bytes = get_sample_slice(sample);
        let err = DnsMessage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ProbeError::Dns(DnsError::MalformedName)));
    }

    #[test]
    fn reserved_label_type_is_rejected() {
        // 0b0100_0000 is neither a label, a sentinel nor a pointer
        let sample = r#"
0000   00 01 01 80 00 01 00 00 00 00 00 00
000c   40 61 00 00 01 00 01
"#;
        let bytes = get_sample_slice(sample);
        let err = DnsMessage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ProbeError::Dns(DnsError::Reserved)));
    }

    #[test]
    fn truncated_label_is_detected() {
        // label claims 7 bytes but the buffer ends after 3
        let sample = r#"
0000   00 01 01 80 00 01 00 00 00 00 00 00
000c   07 65 78 61
"#;
        let bytes = get_sample_slice(sample);
        let err = DnsMessage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ProbeError::Dns(DnsError::Truncated)));
    }

    #[test]
    fn truncated_rdata_is_detected() {
        // rdlength announces 4 bytes, only 2 are present
        let sample = r#"
0000   00 01 81 80 00 00 00 01 00 00 00 00
000c   00 00 01 00 01 00 00 00 3c 00 04 5d b8
"#;
        let bytes = get_sample_slice(sample);
        let err = DnsMessage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ProbeError::Dns(DnsError::Truncated)));
    }

    #[test]
    fn missing_record_is_truncated() {
        // header promises one answer, none follows
        let sample = r#"
0000   00 01 81 80 00 00 00 01 00 00 00 00
"#;
        let bytes = get_sample_slice(sample);
        let err = DnsMessage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ProbeError::Dns(DnsError::Truncated)));
    }

    #[test]
    fn trailing_bytes_are_tolerated() {
        let mut bytes = get_sample_slice(A_RESPONSE);
        bytes.extend_from_slice(&[0x00, 0x00, 0x00]);

        let message = DnsMessage::from_bytes(&bytes).unwrap();
        assert_eq!(message.answers.len(), 1);
    }

    #[test]
    fn root_name_decodes_empty() {
        let sample = r#"
0000   00 01 01 80 00 01 00 00 00 00 00 00
000c   00 00 01 00 01
"#;
        let message = decode_message(sample);
        assert!(message.questions[0].name.is_root());
        assert_eq!(message.questions[0].name.to_string(), "");
    }

    // chain `count` pointers, each targeting the previous one, over a root
    // name at offset 0; returns the offset of the last pointer
    fn pointer_chain_buffer(count: usize) -> (Vec<u8>, u64) {
        let mut bytes = vec![0u8];
        let mut prev = 0u16;
        for _ in 0..count {
            let here = bytes.len() as u16;
            bytes.push(0xC0 | (prev >> 8) as u8);
            bytes.push((prev & 0xFF) as u8);
            prev = here;
        }
        (bytes, prev as u64)
    }

    #[test]
    fn jump_ceiling_is_enforced() {
        let (bytes, start) = pointer_chain_buffer(128);
        let mut buffer = Cursor::new(bytes.as_slice());
        buffer.set_position(start);

        let mut dn = DomainName::default();
        let err = dn.from_network_bytes(&mut buffer).unwrap_err();
        assert!(matches!(err, ProbeError::Dns(DnsError::MalformedName)));
    }

    #[test]
    fn long_backward_chains_below_the_ceiling_decode() {
        let (bytes, start) = pointer_chain_buffer(127);
        let mut buffer = Cursor::new(bytes.as_slice());
        buffer.set_position(start);

        let mut dn = DomainName::default();
        dn.from_network_bytes(&mut buffer).unwrap();
        assert!(dn.is_root());
        // the outer advance stays at the first pointer's 2 bytes
        assert_eq!(buffer.position(), start + 2);
    }

    #[test]
    fn oversized_name_is_malformed() {
        // five labels of 63 bytes each exceed the 255-byte dotted limit
        let mut bytes = get_sample_slice(
            r#"
0000   00 01 01 80 00 01 00 00 00 00 00 00
"#,
        );
        for _ in 0..5 {
            bytes.push(63);
            bytes.extend_from_slice(&[0x61; 63]);
        }
        bytes.push(0);
        bytes.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);

        let err = DnsMessage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ProbeError::Dns(DnsError::MalformedName)));
    }

    #[test]
    fn decode_encode_round_trip() {
        // re-encoding (compression disabled) must decode to the same structure
        let message = decode_message(A_RESPONSE);

        let (buffer, _) = test_to_network!(message);
        let again = DnsMessage::from_bytes(&buffer).unwrap();

        assert_eq!(again, message);
    }

    #[test]
    fn header_round_trip() {
        let header = test_from_network!(HEADER_ONLY, DnsHeader);
        assert_eq!(header.id, 0x1234);
        assert!(header.is_response());
        assert!(header.recursion_desired());
        assert!(header.recursion_available());

        let (buffer, written) = test_to_network!(header);
        assert_eq!(written, 12);
        assert_eq!(buffer, get_sample_slice(HEADER_ONLY));
    }
}
