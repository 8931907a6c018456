//! The request/response cycle engine.
//!
//! Pure state machine over the slot pool, tracker, and codec: it consumes
//! inbound and upstream datagrams plus timer events, drives handler ticks,
//! and emits [`Transmit`] actions for the listener layer to perform. No
//! sockets are touched here, which keeps every state transition testable
//! without I/O.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use cyclone_dns_domain::{Destination, EngineError};

use crate::handler::{CycleStatus, DnsHandler};
use crate::pool::SlotPool;
use crate::request_id::{Channel, RequestId};
use crate::tracker::OutgoingTracker;
use crate::wire::{PacketView, PacketWriter};

/// An I/O action the engine wants performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transmit {
    /// Send a finished response back to the querying client.
    Response {
        listener: usize,
        peer: SocketAddr,
        packet: Vec<u8>,
    },
    /// Send (or resend) an upstream query.
    Upstream {
        destination: Destination,
        packet: Vec<u8>,
    },
    /// Schedule [`CycleEngine::on_timer`] for this cycle after the delay.
    Timer { cycle: RequestId, delay: Duration },
}

/// Where a suspended cycle is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclePhase {
    Running,
    AwaitingReply(RequestId),
    AwaitingTimer,
}

/// Everything one in-flight inbound exchange owns.
struct CycleState {
    request: PacketView,
    listener: usize,
    peer: SocketAddr,
    /// The inbound header id, echoed on the eventual response.
    client_id: u16,
    scratch: Vec<u8>,
    phase: CyclePhase,
    /// Upstream reply made visible to the next resumption tick.
    reply: Option<PacketView>,
    /// Failure made visible to the next resumption tick.
    failure: Option<EngineError>,
}

/// Handler-facing view of one cycle during a tick.
///
/// Gives read access to the inbound packet and any pending reply or
/// failure, and collects the outgoing queries and the response the handler
/// produces.
pub struct CycleContext<'a> {
    tracker: &'a OutgoingTracker,
    slot: u32,
    now: Instant,
    request: &'a PacketView,
    reply: Option<&'a PacketView>,
    failure: Option<&'a EngineError>,
    response: Option<PacketWriter>,
    outgoing: Vec<Transmit>,
}

impl CycleContext<'_> {
    /// The inbound packet that started this cycle.
    pub fn request(&self) -> &PacketView {
        self.request
    }

    /// The reply that resolved the awaited outgoing query, if this tick was
    /// triggered by one.
    pub fn reply(&self) -> Option<&PacketView> {
        self.reply
    }

    /// The failure that triggered this resumption tick, if any. Currently
    /// always [`EngineError::UpstreamExhausted`].
    pub fn failure(&self) -> Option<&EngineError> {
        self.failure
    }

    /// Creates and sends an outgoing upstream query.
    ///
    /// The datagram's wire id is assigned by the tracker; whatever id the
    /// writer's header carries is overwritten. Returns the id to pass back
    /// in [`CycleStatus::Poll`].
    pub fn send_upstream(
        &mut self,
        destination: Destination,
        writer: PacketWriter,
    ) -> Result<RequestId, EngineError> {
        let (id, packet) =
            self.tracker
                .register(destination, writer.finish(), self.slot, self.now)?;
        self.outgoing.push(Transmit::Upstream {
            destination,
            packet,
        });
        Ok(id)
    }

    /// The response writer for this cycle. The engine overwrites the header
    /// id with the original client id when the cycle returns.
    pub fn response(&mut self) -> &mut PacketWriter {
        self.response.get_or_insert_with(PacketWriter::new)
    }
}

/// The engine proper: a cycle-state pool, an outgoing tracker, and the
/// handler, sequenced so no cycle is ever ticked concurrently with itself.
pub struct CycleEngine {
    handler: Arc<dyn DnsHandler>,
    cycles: Mutex<SlotPool<Arc<Mutex<CycleState>>>>,
    tracker: OutgoingTracker,
    scratch_size: usize,
}

impl CycleEngine {
    pub fn new(
        handler: Arc<dyn DnsHandler>,
        cycle_capacity: usize,
        outgoing_capacity: usize,
        resend_delay: Duration,
        max_resend_count: u32,
    ) -> Self {
        let scratch_size = handler.scratch_size();
        Self {
            handler,
            cycles: Mutex::new(SlotPool::new(cycle_capacity)),
            tracker: OutgoingTracker::new(outgoing_capacity, resend_delay, max_resend_count),
            scratch_size,
        }
    }

    /// Starts a cycle for an inbound datagram and runs its first tick.
    ///
    /// `MalformedPacket` means the header itself was unreadable; the caller
    /// drops the datagram. A readable header with a defective body still
    /// starts a cycle, with the defect visible through the request view so
    /// the handler can answer FORMERR. `PoolExhausted` is backpressure and
    /// leaves every in-flight cycle untouched.
    pub fn begin_cycle(
        &self,
        listener: usize,
        peer: SocketAddr,
        datagram: Vec<u8>,
        now: Instant,
    ) -> Result<Vec<Transmit>, EngineError> {
        let request = PacketView::parse_lenient(datagram).map_err(EngineError::from)?;
        let client_id = request.header().id;

        let state = Arc::new(Mutex::new(CycleState {
            request,
            listener,
            peer,
            client_id,
            scratch: vec![0u8; self.scratch_size],
            phase: CyclePhase::Running,
            reply: None,
            failure: None,
        }));

        let slot = {
            let mut cycles = self.cycles.lock().unwrap_or_else(|e| e.into_inner());
            cycles.acquire(state).map_err(|_| EngineError::PoolExhausted)?
        };
        trace!(slot, %peer, id = client_id, "cycle started");

        let mut out = Vec::new();
        self.run_tick(slot, true, now, &mut out);
        Ok(out)
    }

    /// Feeds a datagram received from an upstream server into the engine.
    ///
    /// Unmatched, duplicate, and malformed datagrams are discarded; a
    /// malformed one leaves its tracking entry in place, so the miss counts
    /// against the resend budget like any lost reply.
    pub fn on_upstream_datagram(&self, datagram: Vec<u8>, now: Instant) -> Vec<Transmit> {
        let mut out = Vec::new();
        let view = match PacketView::parse_lenient(datagram) {
            Ok(view) => view,
            Err(err) => {
                debug!(error = %err, "dropping unreadable upstream datagram");
                return out;
            }
        };
        if let Some(err) = view.body_error() {
            debug!(error = %err, id = view.header().id, "dropping malformed upstream reply");
            return out;
        }

        let Some(completed) = self.tracker.complete(view.header().id) else {
            trace!(id = view.header().id, "stale or unsolicited upstream reply");
            return out;
        };

        if let Some(state) = self.awaiting_reply(completed.owner, completed.id) {
            {
                let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
                guard.reply = Some(view);
                guard.phase = CyclePhase::Running;
            }
            self.run_tick(completed.owner, false, now, &mut out);
        }
        out
    }

    /// Resumes a cycle whose `WaitMs` delay has elapsed. Stale timers for
    /// released or reused slots are ignored.
    pub fn on_timer(&self, cycle: RequestId, now: Instant) -> Vec<Transmit> {
        let mut out = Vec::new();
        if cycle.channel() != Channel::Inbound {
            return out;
        }
        let Some(state) = self.cycle_state(cycle.slot()) else {
            return out;
        };
        {
            let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
            if guard.client_id != cycle.wire_id() || guard.phase != CyclePhase::AwaitingTimer {
                return out;
            }
            guard.phase = CyclePhase::Running;
        }
        self.run_tick(cycle.slot(), false, now, &mut out);
        out
    }

    /// Advances the resend clock: emits retransmissions and resumes every
    /// cycle whose awaited query exhausted its budget.
    pub fn on_resend_tick(&self, now: Instant) -> Vec<Transmit> {
        let (resends, exhausted) = self.tracker.tick(now);
        let mut out = Vec::new();
        for resend in resends {
            trace!(id = %resend.id, "retransmitting upstream query");
            out.push(Transmit::Upstream {
                destination: resend.destination,
                packet: resend.packet,
            });
        }
        for failure in exhausted {
            if let Some(state) = self.awaiting_reply(failure.owner, failure.id) {
                {
                    let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
                    guard.failure = Some(EngineError::UpstreamExhausted);
                    guard.phase = CyclePhase::Running;
                }
                self.run_tick(failure.owner, false, now, &mut out);
            }
        }
        out
    }

    /// Discards every in-flight cycle and tracked outgoing query. Nothing
    /// is drained or answered.
    pub fn abandon_all(&self) {
        let discarded = {
            let mut cycles = self.cycles.lock().unwrap_or_else(|e| e.into_inner());
            cycles.drain_held().len()
        };
        self.tracker.drain();
        if discarded > 0 {
            debug!(discarded, "abandoned in-flight cycles");
        }
    }

    pub fn active_cycles(&self) -> usize {
        self.cycles.lock().unwrap_or_else(|e| e.into_inner()).held()
    }

    pub fn tracked_outgoing(&self) -> usize {
        self.tracker.tracked()
    }

    fn cycle_state(&self, slot: u32) -> Option<Arc<Mutex<CycleState>>> {
        let cycles = self.cycles.lock().unwrap_or_else(|e| e.into_inner());
        cycles.get(slot).cloned()
    }

    /// Fetches the cycle only if it is still waiting on this exact query,
    /// guarding against slot reuse between removal and resumption.
    fn awaiting_reply(&self, slot: u32, id: RequestId) -> Option<Arc<Mutex<CycleState>>> {
        let state = self.cycle_state(slot)?;
        let waiting = {
            let guard = state.lock().unwrap_or_else(|e| e.into_inner());
            guard.phase == CyclePhase::AwaitingReply(id)
        };
        waiting.then_some(state)
    }

    /// Runs one handler tick for a cycle and applies its outcome. The state
    /// mutex is held for the whole tick, which is what guarantees a cycle
    /// is never ticked concurrently with itself.
    fn run_tick(&self, slot: u32, first: bool, now: Instant, out: &mut Vec<Transmit>) {
        let Some(state) = self.cycle_state(slot) else {
            return;
        };
        let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
        let state = &mut *guard;

        let mut ctx = CycleContext {
            tracker: &self.tracker,
            slot,
            now,
            request: &state.request,
            reply: state.reply.as_ref(),
            failure: state.failure.as_ref(),
            response: None,
            outgoing: Vec::new(),
        };
        let status = self.handler.tick(&mut ctx, &mut state.scratch, first);
        let response = ctx.response.take();
        out.append(&mut ctx.outgoing);
        drop(ctx);

        state.reply = None;
        state.failure = None;

        match status {
            Ok(CycleStatus::Returned) => {
                if let Some(writer) = response {
                    let mut packet = writer.finish();
                    // The response always echoes the inbound id, never any
                    // internal tracking id.
                    packet[0..2].copy_from_slice(&state.client_id.to_be_bytes());
                    out.push(Transmit::Response {
                        listener: state.listener,
                        peer: state.peer,
                        packet,
                    });
                } else {
                    debug!(slot, "cycle returned without a response; dropping");
                }
                drop(guard);
                self.release_cycle(slot);
            }
            Ok(CycleStatus::WaitMs(ms)) => {
                state.phase = CyclePhase::AwaitingTimer;
                out.push(Transmit::Timer {
                    cycle: RequestId::pack(Channel::Inbound, state.client_id, slot),
                    delay: Duration::from_millis(ms),
                });
            }
            Ok(CycleStatus::Poll(id)) => {
                if self.tracker.contains(id.wire_id()) {
                    state.phase = CyclePhase::AwaitingReply(id);
                } else {
                    // Polling an id the handler never sent (or one already
                    // resolved) cannot make progress. Fail closed.
                    warn!(slot, id = %id, "cycle polls an untracked request; abandoning");
                    drop(guard);
                    self.release_cycle(slot);
                }
            }
            Err(err) => {
                // Fail closed: no response is better than a corrupt one.
                warn!(slot, error = %err, "handler failed; abandoning cycle");
                drop(guard);
                self.release_cycle(slot);
            }
        }
    }

    fn release_cycle(&self, slot: u32) {
        let mut cycles = self.cycles.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(err) = cycles.release(slot) {
            warn!(slot, error = %err, "cycle slot release failed");
        }
        trace!(slot, "cycle finished");
    }
}
