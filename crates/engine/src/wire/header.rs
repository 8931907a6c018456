use cyclone_dns_domain::{Opcode, ResponseCode};

use super::WireError;

pub const HEADER_LEN: usize = 12;

// Flag word layout (bit 15 is the MSB of bytes 2..3):
//   15    QR
//   11-14 OPCODE
//   10    AA
//   9     TC
//   8     RD
//   7     RA
//   4-6   Z (reserved)
//   0-3   RCODE

/// Decoded 12-byte DNS header.
///
/// `opcode` and `rcode` stay raw 4-bit values so every wire value survives a
/// round trip; the typed accessors map the assigned ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    pub id: u16,
    pub response: bool,
    pub opcode: u8,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub reserved: u8,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl PacketHeader {
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_LEN {
            return Err(WireError::Malformed("packet shorter than header"));
        }
        let flags = u16::from_be_bytes([buf[2], buf[3]]);
        Ok(Self {
            id: u16::from_be_bytes([buf[0], buf[1]]),
            response: flags & 0x8000 != 0,
            opcode: ((flags >> 11) & 0x0F) as u8,
            authoritative: flags & 0x0400 != 0,
            truncated: flags & 0x0200 != 0,
            recursion_desired: flags & 0x0100 != 0,
            recursion_available: flags & 0x0080 != 0,
            reserved: ((flags >> 4) & 0x07) as u8,
            rcode: (flags & 0x000F) as u8,
            qdcount: u16::from_be_bytes([buf[4], buf[5]]),
            ancount: u16::from_be_bytes([buf[6], buf[7]]),
            nscount: u16::from_be_bytes([buf[8], buf[9]]),
            arcount: u16::from_be_bytes([buf[10], buf[11]]),
        })
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut flags: u16 = 0;
        if self.response {
            flags |= 0x8000;
        }
        flags |= ((self.opcode & 0x0F) as u16) << 11;
        if self.authoritative {
            flags |= 0x0400;
        }
        if self.truncated {
            flags |= 0x0200;
        }
        if self.recursion_desired {
            flags |= 0x0100;
        }
        if self.recursion_available {
            flags |= 0x0080;
        }
        flags |= ((self.reserved & 0x07) as u16) << 4;
        flags |= (self.rcode & 0x0F) as u16;

        let mut out = [0u8; HEADER_LEN];
        out[0..2].copy_from_slice(&self.id.to_be_bytes());
        out[2..4].copy_from_slice(&flags.to_be_bytes());
        out[4..6].copy_from_slice(&self.qdcount.to_be_bytes());
        out[6..8].copy_from_slice(&self.ancount.to_be_bytes());
        out[8..10].copy_from_slice(&self.nscount.to_be_bytes());
        out[10..12].copy_from_slice(&self.arcount.to_be_bytes());
        out
    }

    /// Typed opcode, `None` for unassigned 4-bit values.
    pub fn opcode_kind(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }

    /// Typed response code, `None` for unassigned 4-bit values.
    pub fn response_code(&self) -> Option<ResponseCode> {
        ResponseCode::from_u8(self.rcode)
    }
}
