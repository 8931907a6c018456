//! Tracking and resend policy for engine-initiated upstream queries.
//!
//! Each outgoing query gets a tracking slot, a fresh wire id that is unique
//! among all currently tracked queries, and a fixed-delay resend schedule.
//! Replies are matched by wire id at most once; exhausting the resend budget
//! removes the entry and reports the owning cycle so it can be resumed with
//! a failure, never silently starved.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::trace;

use cyclone_dns_domain::{Destination, EngineError};

use crate::pool::SlotPool;
use crate::request_id::{Channel, RequestId};

/// One outstanding upstream query.
#[derive(Debug)]
struct TrackingEntry {
    id: RequestId,
    destination: Destination,
    /// The datagram as sent, wire id already patched in. Kept for resends.
    packet: Vec<u8>,
    /// Resends performed so far (the initial send is not counted).
    attempts: u32,
    deadline: Instant,
    /// Cycle slot waiting on this query.
    owner: u32,
}

/// A retransmission the caller must perform after a timer tick.
#[derive(Debug)]
pub struct Resend {
    pub id: RequestId,
    pub destination: Destination,
    pub packet: Vec<u8>,
}

/// A query whose resend budget ran out; its owner cycle must be resumed
/// with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted {
    pub id: RequestId,
    pub owner: u32,
}

/// A tracked query resolved by a matching reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completed {
    pub id: RequestId,
    pub owner: u32,
}

pub struct OutgoingTracker {
    slots: Mutex<SlotPool<TrackingEntry>>,
    /// Wire id of every tracked entry, for collision-free id assignment and
    /// O(1) reply matching.
    by_wire_id: DashMap<u16, u32>,
    resend_delay: Duration,
    max_resend_count: u32,
}

impl OutgoingTracker {
    pub fn new(capacity: usize, resend_delay: Duration, max_resend_count: u32) -> Self {
        Self {
            slots: Mutex::new(SlotPool::new(capacity)),
            by_wire_id: DashMap::new(),
            resend_delay,
            max_resend_count,
        }
    }

    /// Registers a new upstream query and returns its id plus the datagram
    /// to transmit (the input packet with the assigned wire id patched into
    /// its header).
    ///
    /// `PoolExhausted` is backpressure; the caller rejects the work without
    /// touching existing entries.
    pub fn register(
        &self,
        destination: Destination,
        mut packet: Vec<u8>,
        owner: u32,
        now: Instant,
    ) -> Result<(RequestId, Vec<u8>), EngineError> {
        if packet.len() < crate::wire::HEADER_LEN {
            return Err(EngineError::MalformedPacket(
                "outgoing packet shorter than header".to_string(),
            ));
        }

        // Id selection and index insertion both happen under the slots lock.
        // Concurrent registers serialize here, so a candidate checked free
        // cannot be claimed by another worker before it is inserted.
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let wire_id = self.fresh_wire_id();
        packet[0..2].copy_from_slice(&wire_id.to_be_bytes());

        let slot = slots
            .acquire(TrackingEntry {
                id: RequestId::pack(Channel::Outgoing, wire_id, 0),
                destination,
                packet: packet.clone(),
                attempts: 0,
                deadline: now + self.resend_delay,
                owner,
            })
            .map_err(|_| EngineError::PoolExhausted)?;

        let id = RequestId::pack(Channel::Outgoing, wire_id, slot);
        if let Some(entry) = slots.get_mut(slot) {
            entry.id = id;
        }
        self.by_wire_id.insert(wire_id, slot);
        drop(slots);

        trace!(id = %id, destination = %destination, "tracking outgoing query");
        Ok((id, packet))
    }

    /// Picks a wire id that no tracked entry currently uses, so a reply's
    /// header id maps to at most one entry. Callers hold the slots lock;
    /// every insertion into the index happens under that lock too.
    fn fresh_wire_id(&self) -> u16 {
        loop {
            let candidate = fastrand::u16(..);
            if !self.by_wire_id.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Resolves the tracked entry matching a reply's wire id.
    ///
    /// Returns `None` for a stale, duplicate, or unsolicited id; that is a
    /// discard, not an error. A second call with the same id is a no-op.
    pub fn complete(&self, wire_id: u16) -> Option<Completed> {
        let (_, slot) = self.by_wire_id.remove(&wire_id)?;
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let entry = slots.release(slot).ok()?;
        debug_assert_eq!(entry.id.wire_id(), wire_id);
        Some(Completed {
            id: entry.id,
            owner: entry.owner,
        })
    }

    /// Advances the resend clock. Entries past their deadline are either
    /// queued for retransmission or, once `max_resend_count` resends have
    /// been made, removed and reported exhausted.
    pub fn tick(&self, now: Instant) -> (Vec<Resend>, Vec<Exhausted>) {
        let mut resends = Vec::new();
        let mut exhausted = Vec::new();
        let mut expired_slots = Vec::new();

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        for (slot, entry) in slots.iter_held_mut() {
            if entry.deadline > now {
                continue;
            }
            if entry.attempts < self.max_resend_count {
                entry.attempts += 1;
                entry.deadline = now + self.resend_delay;
                resends.push(Resend {
                    id: entry.id,
                    destination: entry.destination,
                    packet: entry.packet.clone(),
                });
            } else {
                expired_slots.push(slot);
            }
        }
        for slot in expired_slots {
            if let Ok(entry) = slots.release(slot) {
                self.by_wire_id.remove(&entry.id.wire_id());
                trace!(id = %entry.id, "resend budget exhausted");
                exhausted.push(Exhausted {
                    id: entry.id,
                    owner: entry.owner,
                });
            }
        }
        (resends, exhausted)
    }

    pub fn contains(&self, wire_id: u16) -> bool {
        self.by_wire_id.contains_key(&wire_id)
    }

    pub fn tracked(&self) -> usize {
        self.by_wire_id.len()
    }

    /// Discards every tracked entry. Used on pause; owners are not resumed.
    pub fn drain(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.drain_held();
        self.by_wire_id.clear();
    }
}
