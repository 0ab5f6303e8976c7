//! Scan cursor for tracking catch-up progress.
//!
//! Provides the pure block-range arithmetic behind the scheduler: given a
//! chain head and the persisted checkpoint, what range (if any) should be
//! fetched next. Keeping this free of I/O lets the state machine be driven
//! synchronously in tests.

use serde::{Deserialize, Serialize};

/// What the scheduler should do on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// The checkpoint has caught up with the head; sleep and re-poll.
    Idle,
    /// Fetch and persist `[from, to]` (inclusive), then advance to `to`.
    Fetch {
        /// First block of the batch.
        from: u64,
        /// Last block of the batch.
        to: u64,
    },
}

/// Pure transition function of the scan state machine.
///
/// Returns [`Plan::Idle`] when `head <= checkpoint`, otherwise the next
/// bounded batch `[checkpoint + 1, min(checkpoint + batch_size, head)]`.
#[must_use]
pub const fn plan_tick(head: u64, checkpoint: u64, batch_size: u64) -> Plan {
    if head <= checkpoint {
        return Plan::Idle;
    }
    let from = checkpoint + 1;
    let span_end = checkpoint.saturating_add(batch_size);
    let to = if span_end < head { span_end } else { head };
    Plan::Fetch { from, to }
}

/// Cursor for one catch-up run.
///
/// Tracks the observed head and the last committed block, and hands out
/// bounded batches until the two meet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanCursor {
    /// Chain head observed at the start of the tick.
    pub head: u64,

    /// Last block durably committed to the store.
    pub committed: u64,

    /// Maximum block span per batch.
    pub batch_size: u64,
}

impl ScanCursor {
    /// Creates a cursor for a catch-up from `committed` towards `head`.
    #[must_use]
    pub const fn new(head: u64, committed: u64, batch_size: u64) -> Self {
        Self {
            head,
            committed,
            batch_size,
        }
    }

    /// Returns the next batch plan.
    #[must_use]
    pub const fn next_batch(&self) -> Plan {
        plan_tick(self.head, self.committed, self.batch_size)
    }

    /// Marks a batch as durably committed.
    ///
    /// Only moves forward; a stale value is ignored.
    pub fn mark_committed(&mut self, to: u64) {
        if to > self.committed {
            self.committed = to;
        }
    }

    /// Returns the number of blocks still to process.
    #[must_use]
    pub const fn pending_blocks(&self) -> u64 {
        self.head.saturating_sub(self.committed)
    }

    /// Returns true if any blocks remain.
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.head > self.committed
    }

    /// Returns how many batches an error-free catch-up will take.
    #[must_use]
    pub const fn batches_remaining(&self) -> u64 {
        if self.batch_size == 0 {
            return 0;
        }
        self.pending_blocks().div_ceil(self.batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_when_caught_up() {
        assert_eq!(plan_tick(100, 100, 10), Plan::Idle);
        assert_eq!(plan_tick(99, 100, 10), Plan::Idle);
    }

    #[test]
    fn bounded_batch_when_behind() {
        assert_eq!(
            plan_tick(2500, 1000, 1000),
            Plan::Fetch {
                from: 1001,
                to: 2000
            }
        );
    }

    #[test]
    fn final_batch_clamps_to_head() {
        assert_eq!(
            plan_tick(2500, 2000, 1000),
            Plan::Fetch {
                from: 2001,
                to: 2500
            }
        );
    }

    #[test]
    fn single_block_gap() {
        assert_eq!(plan_tick(101, 100, 1000), Plan::Fetch { from: 101, to: 101 });
    }

    #[test]
    fn cursor_walks_ranges_to_head() {
        let mut cursor = ScanCursor::new(2500, 1000, 1000);
        let mut batches = Vec::new();

        while let Plan::Fetch { from, to } = cursor.next_batch() {
            batches.push((from, to));
            cursor.mark_committed(to);
        }

        assert_eq!(batches, vec![(1001, 2000), (2001, 2500)]);
        assert_eq!(cursor.committed, 2500);
        assert!(!cursor.has_pending());
    }

    #[test]
    fn cursor_batch_count_is_ceil() {
        let cursor = ScanCursor::new(2500, 1000, 1000);
        assert_eq!(cursor.batches_remaining(), 2);

        let exact = ScanCursor::new(2000, 1000, 1000);
        assert_eq!(exact.batches_remaining(), 1);

        let caught_up = ScanCursor::new(1000, 1000, 1000);
        assert_eq!(caught_up.batches_remaining(), 0);
    }

    #[test]
    fn mark_committed_never_goes_backwards() {
        let mut cursor = ScanCursor::new(2500, 1000, 1000);
        cursor.mark_committed(2000);
        cursor.mark_committed(1500);
        assert_eq!(cursor.committed, 2000);
    }

    #[test]
    fn cursor_pending_blocks() {
        let cursor = ScanCursor::new(150, 100, 25);
        assert_eq!(cursor.pending_blocks(), 50);
        assert!(cursor.has_pending());
    }
}
