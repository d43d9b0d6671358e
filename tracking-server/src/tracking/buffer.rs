//! Trailing ping buffer for one tracked order
//!
//! A bounded ring of the most recent valid pings, ordered by
//! `captured_at`. Owned exclusively by the order's room; clients only
//! ever see its contents through replay-on-join or live pushes.

use std::collections::VecDeque;

use shared::LocationPing;

#[derive(Debug)]
pub struct TrackingBuffer {
    points: VecDeque<LocationPing>,
    capacity: usize,
}

impl TrackingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Insert a ping, keeping `captured_at` order and evicting the
    /// oldest entry once full.
    ///
    /// GPS fixes occasionally arrive slightly out of order; a short
    /// back-scan puts them where they belong instead of corrupting the
    /// window the speed estimate reads.
    pub fn push(&mut self, ping: LocationPing) {
        let idx = self
            .points
            .iter()
            .rposition(|p| p.captured_at <= ping.captured_at)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.points.insert(idx, ping);

        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    /// Oldest-first copy of the current contents.
    pub fn snapshot(&self) -> Vec<LocationPing> {
        self.points.iter().copied().collect()
    }

    /// The most recent `n` pings, oldest first (speed estimation window).
    pub fn recent(&self, n: usize) -> Vec<LocationPing> {
        self.points
            .iter()
            .skip(self.points.len().saturating_sub(n))
            .copied()
            .collect()
    }

    pub fn last(&self) -> Option<&LocationPing> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
