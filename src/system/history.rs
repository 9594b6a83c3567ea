use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

pub const DEFAULT_CAPACITY: usize = 60;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub sequence_index: u64,
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

/// Fixed-capacity ring of CPU% / memory% points.
///
/// Slots are allocated once; `cursor` counts every push ever made and
/// `cursor % capacity` is the next slot to write.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    slots: Vec<HistoryPoint>,
    capacity: usize,
    cursor: u64,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    pub fn push(&mut self, cpu_percent: f32, memory_percent: f32) {
        let point = HistoryPoint {
            sequence_index: self.cursor,
            cpu_percent,
            memory_percent,
        };
        if self.slots.len() < self.capacity {
            self.slots.push(point);
        } else {
            let slot = (self.cursor % self.capacity as u64) as usize;
            self.slots[slot] = point;
        }
        self.cursor += 1;
    }

    /// Oldest to newest.
    pub fn points_in_order(&self) -> Vec<HistoryPoint> {
        let mut out = Vec::with_capacity(self.slots.len());
        if self.slots.len() < self.capacity {
            out.extend_from_slice(&self.slots);
        } else {
            let head = (self.cursor % self.capacity as u64) as usize;
            out.extend_from_slice(&self.slots[head..]);
            out.extend_from_slice(&self.slots[..head]);
        }
        out
    }

    pub fn latest(&self) -> Option<HistoryPoint> {
        if self.cursor == 0 {
            return None;
        }
        let slot = ((self.cursor - 1) % self.capacity as u64) as usize;
        self.slots.get(slot).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// [`HistoryBuffer`] behind a lock scoped to the buffer alone.
#[derive(Debug, Default)]
pub struct SharedHistory {
    inner: Mutex<HistoryBuffer>,
}

impl SharedHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HistoryBuffer::new(capacity)),
        }
    }

    pub fn push(&self, cpu_percent: f32, memory_percent: f32) {
        self.lock().push(cpu_percent, memory_percent);
    }

    pub fn points_in_order(&self) -> Vec<HistoryPoint> {
        self.lock().points_in_order()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    // Mutations are one slot store plus a cursor bump; a poisoned ring is still whole.
    fn lock(&self) -> MutexGuard<'_, HistoryBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
