//! The boundary the cycle engine exposes to user code.

use crate::cycle::CycleContext;
use crate::request_id::RequestId;

/// Unrecoverable handler failure. The engine abandons the cycle without
/// transmitting a response.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of one handler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// The response is written; the cycle is finished.
    Returned,
    /// Resume this cycle no earlier than the given number of milliseconds
    /// from now.
    WaitMs(u64),
    /// Suspend until the named outgoing query resolves. The query must have
    /// been created through
    /// [`CycleContext::send_upstream`](crate::cycle::CycleContext::send_upstream)
    /// during this cycle.
    Poll(RequestId),
}

/// Drives one inbound exchange across possibly many non-blocking ticks.
///
/// A tick must not block; anything asynchronous is expressed through the
/// returned [`CycleStatus`] and performed by the engine. The scratch buffer
/// is [`scratch_size`](Self::scratch_size) bytes, zeroed before the first
/// tick and preserved verbatim between ticks of the same cycle. `first` is
/// true only on the cycle's first tick.
pub trait DnsHandler: Send + Sync + 'static {
    /// Per-cycle scratch buffer size in bytes.
    fn scratch_size(&self) -> usize {
        0
    }

    fn tick(
        &self,
        ctx: &mut CycleContext<'_>,
        scratch: &mut [u8],
        first: bool,
    ) -> Result<CycleStatus, HandlerError>;
}
