use thiserror::Error;

/// Engine-level error surface.
///
/// Every entry point collapses to one of these variants; callers branch on
/// the variant (or its numeric [`code`](EngineError::code)), not on the
/// message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Out of memory")]
    OutOfMemory,

    #[error("TCP transport is not supported")]
    TcpUnsupported,

    #[error("Invalid thread configuration: {0}")]
    InvalidThreads(String),

    #[error("HTTP transport is not supported")]
    HttpUnsupported,

    #[error("Socket failure: {0}")]
    SocketFailure(String),

    #[error("No handler registered")]
    NoHandler,

    #[error("Already listening")]
    AlreadyListening,

    #[error("Invalid handler")]
    InvalidHandler,

    #[error("Invalid pause")]
    InvalidPause,

    #[error("Upstream request failed: resend budget exhausted")]
    UpstreamExhausted,

    #[error("Request pool exhausted")]
    PoolExhausted,

    #[error("Malformed DNS packet: {0}")]
    MalformedPacket(String),

    #[error("Response buffer too small")]
    BufferTooSmall,

    #[error("Mutation not allowed while listening")]
    MutationWhileListening,
}

/// Human-readable lookup strings, indexed by error code. Code 0 is reserved
/// for "no error" so the table has one more entry than there are variants.
const DESCRIPTIONS: [&str; EngineError::CODE_COUNT as usize + 1] = [
    "no error",
    "out of memory",
    "tcp transport unsupported",
    "invalid thread configuration",
    "http transport unsupported",
    "socket failure",
    "no handler registered",
    "already listening",
    "invalid handler",
    "invalid pause",
    "upstream resend budget exhausted",
    "request pool exhausted",
    "malformed dns packet",
    "response buffer too small",
    "mutation while listening",
];

impl EngineError {
    /// Number of distinct error codes (excluding the reserved 0).
    pub const CODE_COUNT: u16 = 14;

    /// Stable numeric code for this error.
    pub fn code(&self) -> u16 {
        match self {
            EngineError::OutOfMemory => 1,
            EngineError::TcpUnsupported => 2,
            EngineError::InvalidThreads(_) => 3,
            EngineError::HttpUnsupported => 4,
            EngineError::SocketFailure(_) => 5,
            EngineError::NoHandler => 6,
            EngineError::AlreadyListening => 7,
            EngineError::InvalidHandler => 8,
            EngineError::InvalidPause => 9,
            EngineError::UpstreamExhausted => 10,
            EngineError::PoolExhausted => 11,
            EngineError::MalformedPacket(_) => 12,
            EngineError::BufferTooSmall => 13,
            EngineError::MutationWhileListening => 14,
        }
    }

    /// Diagnostic string for a numeric code.
    pub fn describe(code: u16) -> &'static str {
        debug_assert_eq!(DESCRIPTIONS.len(), Self::CODE_COUNT as usize + 1);
        DESCRIPTIONS
            .get(code as usize)
            .copied()
            .unwrap_or("unknown error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<EngineError> {
        vec![
            EngineError::OutOfMemory,
            EngineError::TcpUnsupported,
            EngineError::InvalidThreads("max_threads = 0".into()),
            EngineError::HttpUnsupported,
            EngineError::SocketFailure("EBADF".into()),
            EngineError::NoHandler,
            EngineError::AlreadyListening,
            EngineError::InvalidHandler,
            EngineError::InvalidPause,
            EngineError::UpstreamExhausted,
            EngineError::PoolExhausted,
            EngineError::MalformedPacket("short header".into()),
            EngineError::BufferTooSmall,
            EngineError::MutationWhileListening,
        ]
    }

    #[test]
    fn every_variant_has_a_description() {
        for err in all_variants() {
            let text = EngineError::describe(err.code());
            assert_ne!(text, "unknown error", "missing entry for {:?}", err);
            assert!(!text.is_empty());
        }
    }

    #[test]
    fn codes_are_unique_and_dense() {
        let mut codes: Vec<u16> = all_variants().iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), EngineError::CODE_COUNT as usize);
        assert_eq!(*codes.first().unwrap(), 1);
        assert_eq!(*codes.last().unwrap(), EngineError::CODE_COUNT);
    }

    #[test]
    fn unknown_code_is_reported_as_such() {
        assert_eq!(EngineError::describe(200), "unknown error");
        assert_eq!(EngineError::describe(0), "no error");
    }
}
