//! Measurement channel state

use std::collections::VecDeque;

use k6517_protocol::ChannelName;

/// One measurement function with its range and pending readings
#[derive(Debug, Clone)]
pub struct Channel {
    name: ChannelName,
    /// Upper clamp bound for readings
    range: f64,
    /// Readings waiting for a measurement trigger, oldest first
    pending: VecDeque<f64>,
}

impl Channel {
    /// Create a channel with range 0 and no pending readings
    pub fn new(name: ChannelName) -> Self {
        Self {
            name,
            range: 0.0,
            pending: VecDeque::new(),
        }
    }

    /// Get the channel name
    pub fn name(&self) -> ChannelName {
        self.name
    }

    /// Get the configured range
    pub fn range(&self) -> f64 {
        self.range
    }

    /// Set the range
    pub fn set_range(&mut self, range: f64) {
        self.range = range;
    }

    /// Queue a reading behind any already pending
    pub fn push_reading(&mut self, value: f64) {
        self.pending.push_back(value);
    }

    /// Take the oldest pending reading
    pub fn pop_reading(&mut self) -> Option<f64> {
        self.pending.pop_front()
    }

    /// Number of pending readings
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Pending readings, oldest first
    pub fn pending(&self) -> impl Iterator<Item = f64> + '_ {
        self.pending.iter().copied()
    }
}
