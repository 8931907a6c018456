//! Opaque 64-bit identifier for one in-flight exchange.

use std::fmt;

/// Identifies one exchange (an inbound cycle or an outgoing upstream query)
/// for as long as it is live.
///
/// Callers treat the value as opaque. Internally it packs a channel tag, the
/// 16-bit wire id, and the owning slot index, so the same value serves both
/// as the DNS header id on the wire and as a reverse map to the slot. The
/// wire id space is only 16 bits; folding the slot index in keeps ids unique
/// across the whole tracked set even when wire ids collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

/// Which side of the engine the id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    Inbound = 0,
    Outgoing = 1,
}

impl RequestId {
    pub(crate) fn pack(channel: Channel, wire_id: u16, slot: u32) -> Self {
        Self((channel as u64) << 48 | (wire_id as u64) << 32 | slot as u64)
    }

    /// The 16-bit id carried in the DNS header.
    pub fn wire_id(self) -> u16 {
        (self.0 >> 32) as u16
    }

    pub(crate) fn slot(self) -> u32 {
        self.0 as u32
    }

    pub(crate) fn channel(self) -> Channel {
        if self.0 >> 48 & 1 == 0 {
            Channel::Inbound
        } else {
            Channel::Outgoing
        }
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn from_u64(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_round_trips_all_fields() {
        let id = RequestId::pack(Channel::Outgoing, 0xBEEF, 1234);
        assert_eq!(id.wire_id(), 0xBEEF);
        assert_eq!(id.slot(), 1234);
        assert_eq!(id.channel(), Channel::Outgoing);
        assert_eq!(RequestId::from_u64(id.as_u64()), id);
    }

    #[test]
    fn same_wire_id_different_slots_are_distinct() {
        let a = RequestId::pack(Channel::Outgoing, 0x1234, 0);
        let b = RequestId::pack(Channel::Outgoing, 0x1234, 1);
        assert_ne!(a, b);
        assert_eq!(a.wire_id(), b.wire_id());
    }

    #[test]
    fn extreme_values_survive() {
        let id = RequestId::pack(Channel::Inbound, u16::MAX, u32::MAX);
        assert_eq!(id.wire_id(), u16::MAX);
        assert_eq!(id.slot(), u32::MAX);
        assert_eq!(id.channel(), Channel::Inbound);
    }
}
