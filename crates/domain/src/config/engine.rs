use serde::{Deserialize, Serialize};

/// Cycle engine sizing and retry policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Worker tasks started per listener when the server begins listening.
    #[serde(default = "default_initial_threads")]
    pub initial_threads: u32,

    /// Upper bound on workers; sizes the cycle and tracking pools. The
    /// worker count never grows past `initial_threads` in this design
    /// generation.
    #[serde(default = "default_max_threads")]
    pub max_threads: u32,

    /// Concurrent inbound cycles per worker.
    #[serde(default = "default_thread_requests")]
    pub thread_requests: u32,

    /// Concurrent outgoing upstream queries per worker.
    #[serde(default = "default_thread_outgoing_requests")]
    pub thread_outgoing_requests: u32,

    /// Delay before retransmitting an unanswered outgoing query.
    #[serde(default = "default_resend_delay_ms")]
    pub resend_delay_ms: u64,

    /// Retransmissions before an outgoing query is reported exhausted.
    #[serde(default = "default_max_resend_count")]
    pub max_resend_count: u32,
}

impl EngineConfig {
    /// Total inbound cycle slots across all workers.
    pub fn cycle_capacity(&self) -> usize {
        self.thread_requests as usize * self.max_threads as usize
    }

    /// Total outgoing tracking slots across all workers.
    pub fn outgoing_capacity(&self) -> usize {
        self.thread_outgoing_requests as usize * self.max_threads as usize
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_threads: default_initial_threads(),
            max_threads: default_max_threads(),
            thread_requests: default_thread_requests(),
            thread_outgoing_requests: default_thread_outgoing_requests(),
            resend_delay_ms: default_resend_delay_ms(),
            max_resend_count: default_max_resend_count(),
        }
    }
}

fn default_initial_threads() -> u32 {
    1
}

fn default_max_threads() -> u32 {
    1
}

fn default_thread_requests() -> u32 {
    256
}

fn default_thread_outgoing_requests() -> u32 {
    64
}

fn default_resend_delay_ms() -> u64 {
    1000
}

fn default_max_resend_count() -> u32 {
    10
}
