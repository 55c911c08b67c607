//! Bounded per-peer receive cache
//!
//! Proximity drivers push payloads whenever the radio delivers them, with no
//! regard for whether a logical connection is ready on this side. The
//! [`RingBufferMap`] absorbs those payloads with bounded memory: order is
//! preserved per key, but once a key's queue is full the oldest entry is
//! discarded.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::debug;

// ----------------------------------------------------------------------------
// Ring Buffer Map
// ----------------------------------------------------------------------------

/// Per-key bounded FIFO of byte buffers
#[derive(Debug)]
pub struct RingBufferMap {
    capacity: usize,
    queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
}

impl RingBufferMap {
    /// Create a map whose queues hold at most `capacity` payloads each
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        Self {
            capacity,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Append a payload to the queue for `key`, evicting the oldest entry
    /// if the queue is full. The payload is copied; never blocks.
    pub fn add(&self, key: &str, payload: &[u8]) {
        let mut queues = self.queues.lock();
        let queue = queues.entry(key.to_string()).or_default();
        if queue.len() == self.capacity {
            queue.pop_front();
            debug!(key, "receive cache full, dropping oldest payload");
        }
        queue.push_back(payload.to_vec());
    }

    /// Return and remove all payloads cached for `key`, oldest first
    pub fn drain(&self, key: &str) -> SmallVec<[Vec<u8>; 8]> {
        match self.queues.lock().remove(key) {
            Some(queue) => queue.into_iter().collect(),
            None => SmallVec::new(),
        }
    }

    /// Drop the queue for `key`
    pub fn delete(&self, key: &str) {
        self.queues.lock().remove(key);
    }

    #[cfg(test)]
    fn len(&self, key: &str) -> usize {
        self.queues.lock().get(key).map(VecDeque::len).unwrap_or(0)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
