//! Bounded device error queue

use std::collections::VecDeque;

use tracing::warn;

use crate::error::codes;

/// Maximum number of pending error codes, including the overflow sentinel
pub const ERROR_QUEUE_DEPTH: usize = 10;

/// Outcome of recording an error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Code was queued
    Recorded,
    /// Code took the final slot and was replaced by [`codes::QUEUE_OVERFLOW`]
    Overflowed,
    /// Queue already full, code discarded
    Dropped,
}

/// FIFO of device error codes
///
/// The final slot is reserved for the overflow sentinel: the insertion that
/// would fill it stores [`codes::QUEUE_OVERFLOW`] instead, and later
/// insertions are discarded until something is popped or cleared.
#[derive(Debug, Clone, Default)]
pub struct ErrorQueue {
    codes: VecDeque<i32>,
}

impl ErrorQueue {
    /// Create an empty error queue
    pub fn new() -> Self {
        Self {
            codes: VecDeque::with_capacity(ERROR_QUEUE_DEPTH),
        }
    }

    /// Record an error code
    pub fn push(&mut self, code: i32) -> PushOutcome {
        match self.codes.len() {
            n if n + 1 < ERROR_QUEUE_DEPTH => {
                self.codes.push_back(code);
                PushOutcome::Recorded
            }
            n if n + 1 == ERROR_QUEUE_DEPTH => {
                warn!("Error queue overflow, dropping {}", code);
                self.codes.push_back(codes::QUEUE_OVERFLOW);
                PushOutcome::Overflowed
            }
            _ => PushOutcome::Dropped,
        }
    }

    /// Remove and return the oldest code, or [`codes::NO_ERROR`] when empty
    pub fn pop(&mut self) -> i32 {
        self.codes.pop_front().unwrap_or(codes::NO_ERROR)
    }

    /// Remove every pending code
    pub fn clear(&mut self) {
        self.codes.clear();
    }

    /// Number of pending codes
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Check if no codes are pending
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Pending codes, oldest first
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.codes.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = ErrorQueue::new();
        queue.push(2);
        queue.push(5);
        queue.push(10);

        assert_eq!(queue.pop(), 2);
        assert_eq!(queue.pop(), 5);
        assert_eq!(queue.pop(), 10);
        assert_eq!(queue.pop(), codes::NO_ERROR);
        assert_eq!(queue.pop(), codes::NO_ERROR);
    }

    #[test]
    fn test_overflow_sentinel_takes_last_slot() {
        let mut queue = ErrorQueue::new();
        for code in 1..ERROR_QUEUE_DEPTH as i32 {
            assert_eq!(queue.push(code), PushOutcome::Recorded);
        }
        assert_eq!(queue.push(100), PushOutcome::Overflowed);
        assert_eq!(queue.push(101), PushOutcome::Dropped);
        assert_eq!(queue.len(), ERROR_QUEUE_DEPTH);

        let drained: Vec<i32> = std::iter::from_fn(|| match queue.pop() {
            codes::NO_ERROR => None,
            code => Some(code),
        })
        .collect();
        assert_eq!(drained, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, codes::QUEUE_OVERFLOW]);
    }

    #[test]
    fn test_pop_reopens_capacity() {
        let mut queue = ErrorQueue::new();
        for code in 1..=12 {
            queue.push(code);
        }
        queue.pop();

        // One slot free again, and it is the final one
        assert_eq!(queue.push(42), PushOutcome::Overflowed);
    }

    #[test]
    fn test_clear() {
        let mut queue = ErrorQueue::new();
        queue.push(-222);
        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.pop(), codes::NO_ERROR);
    }
}
