use cyclone_dns_domain::{RecordClass, RecordType};

use super::header::{PacketHeader, HEADER_LEN};
use super::{WireError, MAX_UDP_PAYLOAD};

/// Assembles an outgoing packet: a caller-filled header plus appended
/// question and record entries.
///
/// Appends copy pre-encoded bytes and do no validation; in particular the
/// header counts are never auto-incremented, the caller keeps `qdcount`
/// and friends consistent with what it appends.
#[derive(Debug)]
pub struct PacketWriter {
    pub header: PacketHeader,
    body: Vec<u8>,
    max_len: usize,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::with_max_len(MAX_UDP_PAYLOAD)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            header: PacketHeader::default(),
            body: Vec::new(),
            max_len,
        }
    }

    pub fn append_question(&mut self, entry: &[u8]) -> Result<(), WireError> {
        self.append(entry)
    }

    pub fn append_record(&mut self, entry: &[u8]) -> Result<(), WireError> {
        self.append(entry)
    }

    fn append(&mut self, entry: &[u8]) -> Result<(), WireError> {
        if HEADER_LEN + self.body.len() + entry.len() > self.max_len {
            return Err(WireError::BufferTooSmall);
        }
        self.body.extend_from_slice(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        HEADER_LEN + self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.body.len());
        out.extend_from_slice(&self.header.encode());
        out.extend_from_slice(&self.body);
        out
    }
}

impl Default for PacketWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends `name` as a label sequence with a zero terminator. Accepts the
/// root as `""` or `"."`.
pub fn encode_name(name: &str, out: &mut Vec<u8>) -> Result<(), WireError> {
    let trimmed = name.trim_end_matches('.');
    if !trimmed.is_empty() {
        for label in trimmed.split('.') {
            if label.is_empty() || label.len() > 63 {
                return Err(WireError::Malformed("label length out of range"));
            }
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
    }
    out.push(0);
    Ok(())
}

/// Encodes one question entry.
pub fn encode_question(
    name: &str,
    rtype: RecordType,
    rclass: RecordClass,
) -> Result<Vec<u8>, WireError> {
    let mut out = Vec::new();
    encode_name(name, &mut out)?;
    out.extend_from_slice(&rtype.to_u16().to_be_bytes());
    out.extend_from_slice(&rclass.to_u16().to_be_bytes());
    Ok(out)
}

/// Encodes one resource record entry with pre-encoded data bytes.
pub fn encode_record(
    name: &str,
    rtype: RecordType,
    rclass: RecordClass,
    ttl: u32,
    data: &[u8],
) -> Result<Vec<u8>, WireError> {
    if data.len() > u16::MAX as usize {
        return Err(WireError::Malformed("record data longer than 65535"));
    }
    let mut out = Vec::new();
    encode_name(name, &mut out)?;
    out.extend_from_slice(&rtype.to_u16().to_be_bytes());
    out.extend_from_slice(&rclass.to_u16().to_be_bytes());
    out.extend_from_slice(&ttl.to_be_bytes());
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(data);
    Ok(out)
}
