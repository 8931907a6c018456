//! DNS wire codec.
//!
//! Read side turns a received datagram into typed header, question, and
//! record views over the owned bytes. Write side assembles a header plus
//! pre-encoded question/record entries into an outgoing datagram. All
//! multi-byte fields cross the boundary in network byte order and the
//! header flags are packed with explicit shifts and masks.

mod header;
mod read;
mod write;

pub use header::{PacketHeader, HEADER_LEN};
pub use read::{skip_name, PacketView, QuestionView, RecordView};
pub use write::{encode_name, encode_question, encode_record, PacketWriter};

use cyclone_dns_domain::EngineError;
use thiserror::Error;

/// Largest datagram this engine will emit without EDNS negotiation.
pub const MAX_UDP_PAYLOAD: usize = 512;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("malformed packet: {0}")]
    Malformed(&'static str),

    #[error("output buffer too small")]
    BufferTooSmall,
}

impl From<WireError> for EngineError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Malformed(msg) => EngineError::MalformedPacket(msg.to_string()),
            WireError::BufferTooSmall => EngineError::BufferTooSmall,
        }
    }
}
