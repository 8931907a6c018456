//! Fixed-capacity slot pool with FIFO index reuse.
//!
//! Every in-flight exchange (inbound cycle or tracked outgoing query) lives
//! in a pool slot so steady-state traffic never allocates per packet. Freed
//! indices go to the back of a ring and come out the front, so slots age
//! evenly instead of the most recent one being hammered.

use std::collections::VecDeque;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// No free slot available. Recoverable backpressure, not a fault.
    #[error("pool exhausted ({capacity} slots all held)")]
    Exhausted { capacity: usize },

    /// Released an index that is not currently held. Caller contract
    /// violation, reported loudly instead of silently ignored.
    #[error("slot {index} is not held")]
    ReleaseUnheld { index: u32 },

    /// Index beyond the pool's capacity.
    #[error("slot {index} out of bounds (capacity {capacity})")]
    OutOfBounds { index: u32, capacity: usize },
}

/// Arena of `T` values addressed by stable `u32` indices.
///
/// A slot is either held (occupied, absent from the free ring) or free
/// (vacant, present exactly once in the ring). `held() + free() == capacity`
/// at all times. Capacity can grow but never shrinks.
pub struct SlotPool<T> {
    slots: Vec<Option<T>>,
    free: VecDeque<u32>,
}

impl<T> SlotPool<T> {
    pub fn new(capacity: usize) -> Self {
        let mut free = VecDeque::with_capacity(capacity);
        free.extend(0..capacity as u32);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, free }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn held(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn free(&self) -> usize {
        self.free.len()
    }

    /// Takes the oldest free index and stores `value` in it.
    pub fn acquire(&mut self, value: T) -> Result<u32, PoolError> {
        let Some(index) = self.free.pop_front() else {
            return Err(PoolError::Exhausted {
                capacity: self.slots.len(),
            });
        };
        debug_assert!(self.slots[index as usize].is_none());
        self.slots[index as usize] = Some(value);
        Ok(index)
    }

    /// Vacates a held slot, returning its value. The index goes to the back
    /// of the free ring.
    pub fn release(&mut self, index: u32) -> Result<T, PoolError> {
        let capacity = self.slots.len();
        let slot = self
            .slots
            .get_mut(index as usize)
            .ok_or(PoolError::OutOfBounds { index, capacity })?;
        let value = slot.take().ok_or(PoolError::ReleaseUnheld { index })?;
        self.free.push_back(index);
        Ok(value)
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.slots.get(index as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slots.get_mut(index as usize)?.as_mut()
    }

    /// Grows the arena and free ring. Existing indices keep their contents
    /// and held/free status. A `new_capacity` at or below the current one is
    /// a no-op.
    pub fn grow(&mut self, new_capacity: usize) {
        let old = self.slots.len();
        if new_capacity <= old {
            return;
        }
        self.slots.resize_with(new_capacity, || None);
        self.free.extend(old as u32..new_capacity as u32);
    }

    /// Vacates every held slot, yielding the evicted values. Used when the
    /// engine pauses and discards in-flight work.
    pub fn drain_held(&mut self) -> Vec<(u32, T)> {
        let mut evicted = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.take() {
                self.free.push_back(i as u32);
                evicted.push((i as u32, value));
            }
        }
        evicted
    }

    pub fn iter_held(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|v| (i as u32, v)))
    }

    pub fn iter_held_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|v| (i as u32, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_plus_free_equals_capacity() {
        let mut pool: SlotPool<u64> = SlotPool::new(4);
        assert_eq!(pool.held() + pool.free(), 4);

        let a = pool.acquire(10).unwrap();
        let b = pool.acquire(20).unwrap();
        assert_eq!(pool.held() + pool.free(), 4);
        assert_eq!(pool.held(), 2);

        pool.release(a).unwrap();
        assert_eq!(pool.held() + pool.free(), 4);
        assert_eq!(pool.held(), 1);
        pool.release(b).unwrap();
        assert_eq!(pool.held(), 0);
    }

    #[test]
    fn reuse_order_is_fifo() {
        let mut pool: SlotPool<()> = SlotPool::new(3);
        let a = pool.acquire(()).unwrap();
        let b = pool.acquire(()).unwrap();
        let c = pool.acquire(()).unwrap();
        assert_eq!((a, b, c), (0, 1, 2));

        // Free in the order b, a; index 2 never freed.
        pool.release(b).unwrap();
        pool.release(a).unwrap();

        // b went to the back first, so it comes out first.
        assert_eq!(pool.acquire(()).unwrap(), b);
        assert_eq!(pool.acquire(()).unwrap(), a);
        assert!(matches!(
            pool.acquire(()),
            Err(PoolError::Exhausted { capacity: 3 })
        ));
    }

    #[test]
    fn no_two_live_acquires_alias() {
        let mut pool: SlotPool<u8> = SlotPool::new(8);
        let mut live = std::collections::HashSet::new();
        for _ in 0..8 {
            let idx = pool.acquire(0).unwrap();
            assert!(live.insert(idx), "index {idx} handed out twice");
        }
    }

    #[test]
    fn release_unheld_is_an_error() {
        let mut pool: SlotPool<u8> = SlotPool::new(2);
        assert_eq!(
            pool.release(0),
            Err(PoolError::ReleaseUnheld { index: 0 })
        );

        let a = pool.acquire(7).unwrap();
        assert_eq!(pool.release(a), Ok(7));
        // Double release of the same index.
        assert_eq!(pool.release(a), Err(PoolError::ReleaseUnheld { index: a }));

        assert_eq!(
            pool.release(99),
            Err(PoolError::OutOfBounds {
                index: 99,
                capacity: 2
            })
        );
    }

    #[test]
    fn grow_preserves_held_slots() {
        let mut pool: SlotPool<&str> = SlotPool::new(2);
        let a = pool.acquire("alpha").unwrap();
        let b = pool.acquire("beta").unwrap();
        assert!(pool.acquire("gamma").is_err());

        pool.grow(4);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.get(a), Some(&"alpha"));
        assert_eq!(pool.get(b), Some(&"beta"));

        let c = pool.acquire("gamma").unwrap();
        assert_eq!(c, 2);
    }

    #[test]
    fn drain_held_evicts_everything() {
        let mut pool: SlotPool<u32> = SlotPool::new(3);
        pool.acquire(1).unwrap();
        pool.acquire(2).unwrap();

        let mut evicted = pool.drain_held();
        evicted.sort();
        assert_eq!(evicted, vec![(0, 1), (1, 2)]);
        assert_eq!(pool.held(), 0);
        assert_eq!(pool.free(), 3);
    }
}
